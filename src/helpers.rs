use std::marker::PhantomData;
use std::sync::Arc;

use crate::policy::AnyValue;

/// Provide an instance of a given type
///
/// This trait allows to use a uniform API for both
/// shared candidates (the provider holds the value)
/// and on-demand instances (the provider is a factory).
pub trait Provide<T>: Send + Sync {
    fn provide(&self) -> T;
}

/// Shared trait object implementing [Provide]
pub type Provider<T> = Arc<dyn Provide<T>>;

/// Generic clone-based provider
pub struct SingletonProvider<T>(T);

impl<T> SingletonProvider<T> {
    pub fn build(data: T) -> Arc<Self> {
        Arc::new(SingletonProvider(data))
    }
}

impl<T: Clone + Send + Sync> Provide<T> for SingletonProvider<T> {
    fn provide(&self) -> T {
        self.0.clone()
    }
}

/// Provider calling a factory function for each instance
pub struct FactoryProvider<T, F> {
    factory: F,
    _target: PhantomData<fn() -> T>,
}

impl<T, F> FactoryProvider<T, F> {
    pub fn build(factory: F) -> Arc<Self> {
        Arc::new(Self {
            factory,
            _target: PhantomData,
        })
    }
}

impl<T, F> Provide<AnyValue> for FactoryProvider<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync,
{
    fn provide(&self) -> AnyValue {
        Arc::new((self.factory)())
    }
}
