//! Resolution of a parameter according to its policy
//!
//! For a parameter with a policy, the engine:
//!
//! * gathers the candidates of the parameter type visible from the active [Scope],
//!   keeping only those registered under the locate key if the policy has one,
//!   and only unkeyed candidates otherwise;
//! * keeps the first candidate accepted by the candidate filter, if any;
//! * falls back to the policy's [Fallback] when no candidate survives;
//! * fails with [WiringError::UnsatisfiedParameter] if the parameter is required,
//!   and reports a [Resolution::Default] otherwise.
//!
//! Dynamic parameters are not resolved once: a [Dynamic] handle runs the same steps
//! again against the scope active at each point of use.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::policy::{AnyValue, Fallback, FallbackError, ParameterPolicy, ParameterType};
use crate::scope::Scope;

/// Errors triggered during configuration and resolution of parameters
#[derive(Error, Debug)]
pub enum WiringError {
    #[error("Invalid configuration argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },
    #[error("Type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unsatisfied required parameter {parameter} of `{target}`")]
    UnsatisfiedParameter {
        target: &'static str,
        parameter: String,
    },
    #[error("No value and no default for optional parameter {parameter} of `{target}`")]
    NoDefaultValue {
        target: &'static str,
        parameter: String,
    },
    #[error("Parameter {parameter} of `{target}` is dynamic and must be injected as `Dynamic`")]
    DynamicParameter {
        target: &'static str,
        parameter: String,
    },
    #[error("Consistency error: the export has already been finalized")]
    AlreadyFinalized,
    #[error(transparent)]
    Fallback(FallbackError),
}

/// A parameter of the constructor of an injectable type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterInfo {
    position: usize,
    name: Option<&'static str>,
    parameter_type: ParameterType,
}

impl ParameterInfo {
    pub fn new(position: usize, name: Option<&'static str>, parameter_type: ParameterType) -> Self {
        Self {
            position,
            name,
            parameter_type,
        }
    }

    pub fn of<T: ?Sized + 'static>(position: usize, name: Option<&'static str>) -> Self {
        Self::new(position, name, ParameterType::of::<T>())
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }
}

impl fmt::Display for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "`{}` (#{})", name, self.position),
            None => write!(f, "#{}", self.position),
        }
    }
}

/// Plan-time information on the target being constructed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticInjectionContext {
    target_type: ParameterType,
    parameter: ParameterInfo,
}

impl StaticInjectionContext {
    pub fn new(target_type: ParameterType, parameter: ParameterInfo) -> Self {
        Self {
            target_type,
            parameter,
        }
    }

    pub fn target_type(&self) -> ParameterType {
        self.target_type
    }

    pub fn parameter(&self) -> &ParameterInfo {
        &self.parameter
    }
}

/// Per-resolution values supplied by the caller
#[derive(Clone, Default)]
pub struct InjectionContext {
    values: HashMap<String, AnyValue>,
}

impl InjectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.insert(key, value);
        self
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.values.get(key).cloned()?.downcast::<T>().ok()
    }
}

impl fmt::Debug for InjectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Outcome of the resolution of a parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<V = AnyValue> {
    /// A registered candidate satisfied the parameter
    Candidate(V),
    /// No candidate survived, the fallback was used
    Fallback(V),
    /// Optional parameter without candidate nor fallback
    Default,
}

impl<V> Resolution<V> {
    pub fn value(self) -> Option<V> {
        match self {
            Resolution::Candidate(v) | Resolution::Fallback(v) => Some(v),
            Resolution::Default => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Resolution::Default)
    }

    fn try_map<U, E>(self, f: impl FnOnce(V) -> Result<U, E>) -> Result<Resolution<U>, E> {
        Ok(match self {
            Resolution::Candidate(v) => Resolution::Candidate(f(v)?),
            Resolution::Fallback(v) => Resolution::Fallback(f(v)?),
            Resolution::Default => Resolution::Default,
        })
    }
}

impl<T: Default> Resolution<Arc<T>> {
    /// Obtain the resolved value, or the default value of the type
    pub fn into_value_or_default(self) -> Arc<T> {
        self.value().unwrap_or_default()
    }
}

/// Resolve a parameter in the given scope according to its policy.
pub fn resolve(
    policy: &ParameterPolicy,
    scope: &Scope,
    target: &StaticInjectionContext,
    context: &InjectionContext,
) -> Result<Resolution, WiringError> {
    let candidates = scope.candidates(policy.parameter_type());
    trace!(
        target_type = %target.target_type(),
        parameter = %target.parameter(),
        depth = scope.depth(),
        candidates = candidates.len(),
        "resolving parameter"
    );

    let selected = candidates.iter().find(|candidate| {
        let metadata = candidate.metadata();
        if metadata.key() != policy.locate_key() {
            return false;
        }
        policy.candidate_filter().map_or(true, |filter| filter(metadata))
    });
    if let Some(candidate) = selected {
        return Ok(Resolution::Candidate(candidate.provide()));
    }

    if let Some(fallback) = policy.fallback() {
        debug!(parameter = %target.parameter(), kind = ?fallback, "no candidate, using fallback");
        let value = match fallback {
            Fallback::Literal(value) => value.clone(),
            Fallback::Computed(compute) => compute().map_err(WiringError::Fallback)?,
            Fallback::ContextComputed(compute) => {
                compute(scope, target, context).map_err(WiringError::Fallback)?
            }
        };
        return Ok(Resolution::Fallback(value));
    }

    if policy.is_required() {
        debug!(parameter = %target.parameter(), "unsatisfied required parameter");
        return Err(WiringError::UnsatisfiedParameter {
            target: target.target_type().name(),
            parameter: target.parameter().to_string(),
        });
    }
    debug!(parameter = %target.parameter(), "optional parameter left to its default");
    Ok(Resolution::Default)
}

/// A finalized policy bound to a parameter of a target type
#[derive(Clone, Debug)]
pub struct Binding {
    policy: Arc<ParameterPolicy>,
    target: StaticInjectionContext,
}

impl Binding {
    pub fn new(policy: Arc<ParameterPolicy>, target: StaticInjectionContext) -> Self {
        Self { policy, target }
    }

    pub fn policy(&self) -> &ParameterPolicy {
        &self.policy
    }

    pub fn target(&self) -> &StaticInjectionContext {
        &self.target
    }

    pub fn resolve(
        &self,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Resolution, WiringError> {
        resolve(&self.policy, scope, &self.target, context)
    }

    /// Resolve and downcast the value to the parameter type
    pub fn resolve_as<T: Send + Sync + 'static>(
        &self,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Resolution<Arc<T>>, WiringError> {
        let expected = ParameterType::of::<T>();
        let found = self.policy.parameter_type();
        if expected != found {
            return Err(WiringError::TypeMismatch {
                expected: expected.name(),
                found: found.name(),
            });
        }
        self.resolve(scope, context)?.try_map(|value| {
            value.downcast::<T>().map_err(|_| WiringError::TypeMismatch {
                expected: expected.name(),
                found: found.name(),
            })
        })
    }

    pub(crate) fn unsatisfied_default(&self) -> WiringError {
        WiringError::NoDefaultValue {
            target: self.target.target_type().name(),
            parameter: self.target.parameter().to_string(),
        }
    }

    pub(crate) fn dynamic_mismatch(&self) -> WiringError {
        WiringError::DynamicParameter {
            target: self.target.target_type().name(),
            parameter: self.target.parameter().to_string(),
        }
    }
}

/// Parameter resolved at each point of use rather than at construction.
///
/// The key and the filter of the policy are applied again on every resolution.
pub struct Dynamic<T> {
    binding: Binding,
    _target: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Dynamic<T> {
    pub fn new(binding: Binding) -> Self {
        Self {
            binding,
            _target: PhantomData,
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Resolve the parameter in the given scope
    pub fn resolve(
        &self,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Resolution<Arc<T>>, WiringError> {
        self.binding.resolve_as::<T>(scope, context)
    }

    /// Resolve the parameter in the given scope, with an empty injection context
    pub fn get(&self, scope: &Scope) -> Result<Option<Arc<T>>, WiringError> {
        Ok(self.resolve(scope, &InjectionContext::new())?.value())
    }
}

impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            _target: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dynamic").field(&self.binding).finish()
    }
}
