//! Resolution scopes and the candidates registered in them

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::helpers::{FactoryProvider, Provider, SingletonProvider};
use crate::policy::{AnyValue, LocateKey, ParameterType};

/// Description of a registered candidate, as seen by candidate filters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateMetadata {
    key: Option<LocateKey>,
    name: Option<String>,
    tags: BTreeMap<String, String>,
    depth: usize,
}

impl CandidateMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<LocateKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), value.into());
        self
    }

    pub fn key(&self) -> Option<&LocateKey> {
        self.key.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// Depth of the scope in which the candidate was registered
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Clone)]
pub(crate) struct Candidate {
    provider: Provider<AnyValue>,
    metadata: CandidateMetadata,
}

impl Candidate {
    pub(crate) fn metadata(&self) -> &CandidateMetadata {
        &self.metadata
    }

    pub(crate) fn provide(&self) -> AnyValue {
        self.provider.provide()
    }
}

/// A resolution scope.
///
/// Scopes form a tree: a child sees its own candidates first, then those of its ancestors.
pub struct Scope {
    depth: usize,
    parent: Option<Arc<Scope>>,
    registry: RwLock<HashMap<TypeId, Vec<Candidate>>>,
}

impl Scope {
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            depth: 0,
            parent: None,
            registry: RwLock::default(),
        })
    }

    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            depth: self.depth + 1,
            parent: Some(self.clone()),
            registry: RwLock::default(),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Register a shared value as candidate for its type
    pub fn register<T: Send + Sync + 'static>(&self, value: T, metadata: CandidateMetadata) {
        let value: AnyValue = Arc::new(value);
        self.insert(ParameterType::of::<T>(), SingletonProvider::build(value), metadata);
    }

    /// Register a factory creating a new candidate value on each resolution
    pub fn register_factory<T, F>(&self, factory: F, metadata: CandidateMetadata)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(
            ParameterType::of::<T>(),
            FactoryProvider::<T, F>::build(factory),
            metadata,
        );
    }

    fn insert(
        &self,
        parameter_type: ParameterType,
        provider: Provider<AnyValue>,
        mut metadata: CandidateMetadata,
    ) {
        metadata.depth = self.depth;
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry
            .entry(parameter_type.id())
            .or_default()
            .push(Candidate { provider, metadata });
    }

    /// Collect the candidates visible from this scope.
    ///
    /// Nearest scope first, and latest registration first within a scope.
    pub(crate) fn candidates(&self, parameter_type: ParameterType) -> Vec<Candidate> {
        let mut found = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            let registry = scope.registry.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entries) = registry.get(&parameter_type.id()) {
                found.extend(entries.iter().rev().cloned());
            }
            current = scope.parent.as_deref();
        }
        found
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.depth)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
