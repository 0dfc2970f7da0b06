use std::ops::Deref;
use std::sync::Arc;

use crate::export::ExportPlan;
use crate::policy::ParameterType;
use crate::resolve::{Binding, Dynamic, InjectionContext, ParameterInfo, WiringError};
use crate::scope::Scope;

/// A constructor argument which can be extracted from a [Binding]
///
/// * `Arc<T>` requires a value: an optional parameter without candidate nor fallback is an error
/// * `Option<Arc<T>>` uses `None` when the parameter is optional and has no value
/// * `Defaulted<T>` uses `T::default()` when the parameter is optional and has no value
/// * `Dynamic<T>` defers the resolution to each point of use
pub trait Argument: Sized {
    /// Declared type of the parameter
    fn parameter_type() -> ParameterType;

    fn extract(
        binding: Binding,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Self, WiringError>;
}

impl<T: Send + Sync + 'static> Argument for Arc<T> {
    fn parameter_type() -> ParameterType {
        ParameterType::of::<T>()
    }

    fn extract(
        binding: Binding,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Self, WiringError> {
        if binding.policy().is_dynamic() {
            return Err(binding.dynamic_mismatch());
        }
        binding
            .resolve_as::<T>(scope, context)?
            .value()
            .ok_or_else(|| binding.unsatisfied_default())
    }
}

impl<T: Send + Sync + 'static> Argument for Option<Arc<T>> {
    fn parameter_type() -> ParameterType {
        ParameterType::of::<T>()
    }

    fn extract(
        binding: Binding,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Self, WiringError> {
        if binding.policy().is_dynamic() {
            return Err(binding.dynamic_mismatch());
        }
        Ok(binding.resolve_as::<T>(scope, context)?.value())
    }
}

/// Argument falling back to the default value of its type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defaulted<T>(pub Arc<T>);

impl<T> Defaulted<T> {
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> Deref for Defaulted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Default + Send + Sync + 'static> Argument for Defaulted<T> {
    fn parameter_type() -> ParameterType {
        ParameterType::of::<T>()
    }

    fn extract(
        binding: Binding,
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Self, WiringError> {
        if binding.policy().is_dynamic() {
            return Err(binding.dynamic_mismatch());
        }
        let resolution = binding.resolve_as::<T>(scope, context)?;
        Ok(Defaulted(resolution.into_value_or_default()))
    }
}

impl<T: Send + Sync + 'static> Argument for Dynamic<T> {
    fn parameter_type() -> ParameterType {
        ParameterType::of::<T>()
    }

    fn extract(
        binding: Binding,
        _scope: &Scope,
        _context: &InjectionContext,
    ) -> Result<Self, WiringError> {
        Ok(Dynamic::new(binding))
    }
}

/*
 * The following is used to inject up to 10 parameters into any constructor
 * inspired by https://nickbryan.co.uk/software/using-a-type-map-for-dependency-injection-in-rust/
 */

/// A Callable has a ```call``` function with a single argument and a single return type.
///
/// This trait is implemented for all functions with up to 10 arguments, using a tuple to
/// wrap them all in a single type.
pub trait Callable<Args, Ret> {
    fn call(&self, args: Args) -> Ret;
}

/// Tuple of constructor arguments which can be injected together
pub trait Injectable: Sized {
    /// Resolve all arguments, the parameter names are given in order
    fn inject<Target: 'static>(
        plan: &ExportPlan<Target>,
        names: &[&'static str],
        scope: &Scope,
        context: &InjectionContext,
    ) -> Result<Self, WiringError>;
}

macro_rules! callable_tuple ({ $($param:ident)* } => {
    impl<Func, Ret, $($param,)*> Callable<($($param,)*), Ret> for Func
    where
        Func: Fn($($param),*) -> Ret,
    {
        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Ret {
            (self)($($param,)*)
        }
    }

    #[allow(clippy::unused_unit)]
    impl<$($param: Argument,)*> Injectable for ($($param,)*) {
        #[allow(unused_variables, unused_mut, unused_assignments)]
        fn inject<Target: 'static>(
            plan: &ExportPlan<Target>,
            names: &[&'static str],
            scope: &Scope,
            context: &InjectionContext,
        ) -> Result<Self, WiringError> {
            let mut position = 0;
            Ok(($(
                {
                    let parameter = ParameterInfo::new(
                        position,
                        names.get(position).copied(),
                        $param::parameter_type(),
                    );
                    position += 1;
                    $param::extract(plan.bind(&parameter)?, scope, context)?
                },
            )*))
        }
    }
});

callable_tuple! {}
callable_tuple! { A }
callable_tuple! { A B }
callable_tuple! { A B C }
callable_tuple! { A B C D }
callable_tuple! { A B C D E }
callable_tuple! { A B C D E F }
callable_tuple! { A B C D E F G }
callable_tuple! { A B C D E F G H }
callable_tuple! { A B C D E F G H I }
callable_tuple! { A B C D E F G H I J }
