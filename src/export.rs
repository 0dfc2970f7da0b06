//! Exports own the parameter policies of the constructor of a target type.
//!
//! Policies are mutable until the export is finalized. The resulting [ExportPlan]
//! holds a frozen snapshot shared by all resolutions.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::builder::{ExportParameterBuilder, ParameterPolicyBuilder};
use crate::inject::{Callable, Injectable};
use crate::policy::{ParameterPolicy, ParameterType};
use crate::resolve::{Binding, InjectionContext, ParameterInfo, StaticInjectionContext, WiringError};
use crate::scope::Scope;

/// Configuration of the constructor parameters of the exported type `E`
pub struct Export<E> {
    policies: BTreeMap<usize, ParameterPolicy>,
    plan: OnceCell<ExportPlan<E>>,
}

impl<E: 'static> Export<E> {
    pub fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
            plan: OnceCell::new(),
        }
    }

    /// Configure the constructor parameter at the given position.
    ///
    /// The policy is created on first use. Return an error if the export is finalized
    /// or if the parameter was already configured with another type.
    pub fn parameter<T: Send + Sync + 'static>(
        &mut self,
        position: usize,
    ) -> Result<ExportParameterBuilder<'_, E, T>, WiringError> {
        if self.plan.get().is_some() {
            return Err(WiringError::AlreadyFinalized);
        }
        let policy = self
            .policies
            .entry(position)
            .or_insert_with(ParameterPolicy::of::<T>);
        ParameterPolicyBuilder::new(policy)
    }

    pub fn policy(&self, position: usize) -> Option<&ParameterPolicy> {
        self.policies.get(&position)
    }

    pub fn is_finalized(&self) -> bool {
        self.plan.get().is_some()
    }

    /// Freeze the policies and obtain the construction plan.
    ///
    /// The first call takes the snapshot, later calls return the same plan.
    pub fn finalize(&self) -> &ExportPlan<E> {
        self.plan.get_or_init(|| {
            debug!(
                target_type = std::any::type_name::<E>(),
                parameters = self.policies.len(),
                "export finalized"
            );
            ExportPlan {
                policies: self
                    .policies
                    .iter()
                    .map(|(position, policy)| (*position, Arc::new(policy.clone())))
                    .collect(),
                _target: PhantomData,
            }
        })
    }
}

impl<E: 'static> Default for Export<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen parameter policies of an export
pub struct ExportPlan<E> {
    policies: Vec<(usize, Arc<ParameterPolicy>)>,
    _target: PhantomData<fn() -> E>,
}

impl<E: 'static> ExportPlan<E> {
    pub fn target_type(&self) -> ParameterType {
        ParameterType::of::<E>()
    }

    pub fn policies(&self) -> impl Iterator<Item = (usize, &ParameterPolicy)> {
        self.policies.iter().map(|(position, policy)| (*position, policy.as_ref()))
    }

    /// Find the policy applying to a constructor parameter.
    ///
    /// A policy named after the parameter wins over an unnamed policy at the same position.
    pub fn policy_for(
        &self,
        parameter: &ParameterInfo,
    ) -> Result<Option<&Arc<ParameterPolicy>>, WiringError> {
        let named = parameter.name().and_then(|name| {
            self.policies
                .iter()
                .find(|(_, policy)| policy.parameter_name() == Some(name))
        });
        let selected = named.or_else(|| {
            self.policies.iter().find(|(position, policy)| {
                *position == parameter.position() && policy.parameter_name().is_none()
            })
        });
        match selected {
            Some((_, policy)) if policy.parameter_type() != parameter.parameter_type() => {
                Err(WiringError::TypeMismatch {
                    expected: parameter.parameter_type().name(),
                    found: policy.parameter_type().name(),
                })
            }
            Some((_, policy)) => Ok(Some(policy)),
            None => Ok(None),
        }
    }

    /// Bind a constructor parameter to its policy, or to an optional policy if none was configured
    pub fn bind(&self, parameter: &ParameterInfo) -> Result<Binding, WiringError> {
        let policy = match self.policy_for(parameter)? {
            Some(policy) => policy.clone(),
            None => Arc::new(ParameterPolicy::new(parameter.parameter_type())),
        };
        let target = StaticInjectionContext::new(self.target_type(), *parameter);
        Ok(Binding::new(policy, target))
    }

    /// Build an instance of the target type by calling its constructor.
    ///
    /// The parameter names are matched by position with the constructor arguments,
    /// unnamed parameters are only matched by position.
    pub fn construct<A, F>(
        &self,
        scope: &Scope,
        context: &InjectionContext,
        names: &[&'static str],
        constructor: F,
    ) -> Result<E, WiringError>
    where
        A: Injectable,
        F: Callable<A, E>,
    {
        let arguments = A::inject(self, names, scope, context)?;
        Ok(constructor.call(arguments))
    }
}

impl<E> fmt::Debug for ExportPlan<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportPlan")
            .field("target", &std::any::type_name::<E>())
            .field("policies", &self.policies)
            .finish()
    }
}
