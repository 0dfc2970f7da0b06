//! Fluent configuration of a [ParameterPolicy]
//!
//! A single builder type serves both the standalone case (the parameter type is given
//! explicitly) and the export-bound case (see [ExportParameterBuilder]).
//! Each setter overwrites the targeted attribute. Setters validating their argument
//! return a [Result] and leave the policy untouched when they fail.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::policy::{
    AnyValue, Fallback, FallbackError, LocateKey, ParameterPolicy, ParameterType,
};
use crate::resolve::{InjectionContext, StaticInjectionContext, WiringError};
use crate::scope::{CandidateMetadata, Scope};

/// Typed mutator over a borrowed [ParameterPolicy].
///
/// `T` is the parameter type, `O` the owner of the policy (`()` when standalone).
pub struct ParameterPolicyBuilder<'a, T, O = ()> {
    policy: &'a mut ParameterPolicy,
    _types: PhantomData<fn() -> (T, O)>,
}

/// Builder for a parameter of the constructor of the exported type `E`
pub type ExportParameterBuilder<'a, E, T> = ParameterPolicyBuilder<'a, T, E>;

impl ParameterPolicy {
    /// Obtain a builder for this policy, checking that `T` is the parameter type
    pub fn configure<T: Send + Sync + 'static>(
        &mut self,
    ) -> Result<ParameterPolicyBuilder<'_, T>, WiringError> {
        ParameterPolicyBuilder::new(self)
    }
}

impl<'a, T, O> ParameterPolicyBuilder<'a, T, O>
where
    T: Send + Sync + 'static,
{
    pub fn new(policy: &'a mut ParameterPolicy) -> Result<Self, WiringError> {
        let expected = ParameterType::of::<T>();
        if policy.parameter_type() != expected {
            return Err(WiringError::TypeMismatch {
                expected: policy.parameter_type().name(),
                found: expected.name(),
            });
        }
        Ok(Self {
            policy,
            _types: PhantomData,
        })
    }

    /// Bind the policy to the constructor parameter with this exact name
    pub fn named(self, name: impl Into<String>) -> Result<Self, WiringError> {
        let name = name.into();
        if name.is_empty() {
            return Err(WiringError::InvalidArgument {
                argument: "name",
                reason: "parameter name cannot be empty",
            });
        }
        self.policy.parameter_name = Some(name);
        Ok(self)
    }

    /// Only accept candidates matching the filter.
    ///
    /// The filter is called on every resolution, it must not rely on cached candidates.
    pub fn consider<F>(self, filter: F) -> Self
    where
        F: Fn(&CandidateMetadata) -> bool + Send + Sync + 'static,
    {
        self.policy.candidate_filter = Some(Arc::new(filter));
        self
    }

    /// Use a fixed value when no candidate is available
    pub fn default_value(self, value: T) -> Self {
        let value: AnyValue = Arc::new(value);
        self.policy.fallback = Some(Fallback::Literal(value));
        self
    }

    /// Compute the value when no candidate is available
    pub fn default_value_with<F>(self, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.try_default_value_with(move || Ok(compute()))
    }

    /// Fallible version of [Self::default_value_with]
    pub fn try_default_value_with<F>(self, compute: F) -> Self
    where
        F: Fn() -> Result<T, FallbackError> + Send + Sync + 'static,
    {
        let compute = move || compute().map(|value| Arc::new(value) as AnyValue);
        self.policy.fallback = Some(Fallback::Computed(Arc::new(compute)));
        self
    }

    /// Compute the value from the resolution context when no candidate is available
    pub fn default_value_from<F>(self, compute: F) -> Self
    where
        F: Fn(&Scope, &StaticInjectionContext, &InjectionContext) -> T + Send + Sync + 'static,
    {
        self.try_default_value_from(move |scope, target, context| {
            Ok(compute(scope, target, context))
        })
    }

    /// Fallible version of [Self::default_value_from]
    pub fn try_default_value_from<F>(self, compute: F) -> Self
    where
        F: Fn(&Scope, &StaticInjectionContext, &InjectionContext) -> Result<T, FallbackError>
            + Send
            + Sync
            + 'static,
    {
        let compute = move |scope: &Scope,
                            target: &StaticInjectionContext,
                            context: &InjectionContext| {
            compute(scope, target, context).map(|value| Arc::new(value) as AnyValue)
        };
        self.policy.fallback = Some(Fallback::ContextComputed(Arc::new(compute)));
        self
    }

    pub fn is_required(self, required: bool) -> Self {
        self.policy.is_required = required;
        self
    }

    /// Shorthand for `is_required(true)`
    pub fn required(self) -> Self {
        self.is_required(true)
    }

    /// Only accept candidates registered under this key
    pub fn locate_with_key(self, key: impl Into<LocateKey>) -> Result<Self, WiringError> {
        let key = key.into();
        if key.is_empty() {
            return Err(WiringError::InvalidArgument {
                argument: "key",
                reason: "locate key cannot be empty",
            });
        }
        self.policy.locate_key = Some(key);
        Ok(self)
    }

    pub fn is_dynamic(self, dynamic: bool) -> Self {
        self.policy.is_dynamic = dynamic;
        self
    }

    /// Shorthand for `is_dynamic(true)`
    pub fn dynamic(self) -> Self {
        self.is_dynamic(true)
    }

    /// Inspect the policy in its current state
    pub fn policy(&self) -> &ParameterPolicy {
        &*self.policy
    }
}
