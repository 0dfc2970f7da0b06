//! Resolution policy attached to a single constructor parameter.
//!
//! A [ParameterPolicy] is plain data: the builder writes it during configuration,
//! the resolution engine reads it once the owning export has been finalized.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::resolve::{InjectionContext, StaticInjectionContext};
use crate::scope::{CandidateMetadata, Scope};

/// Shared, type-erased value produced by a candidate or a fallback
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Error raised by a fallback callback, handed to the caller untouched
pub type FallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Predicate restricting the candidates allowed for a parameter
pub type CandidateFilter = Arc<dyn Fn(&CandidateMetadata) -> bool + Send + Sync>;

/// Zero-argument fallback computation
pub type ComputeFn = Arc<dyn Fn() -> Result<AnyValue, FallbackError> + Send + Sync>;

/// Fallback computation receiving the resolution context
pub type ContextComputeFn = Arc<
    dyn Fn(&Scope, &StaticInjectionContext, &InjectionContext) -> Result<AnyValue, FallbackError>
        + Send
        + Sync,
>;

/// Runtime identity of a parameter type
#[derive(Clone, Copy, Debug)]
pub struct ParameterType {
    id: TypeId,
    name: &'static str,
}

impl ParameterType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ParameterType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParameterType {}

impl Hash for ParameterType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Opaque key used for keyed lookup of candidates
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocateKey {
    Name(Arc<str>),
    Id(u64),
}

impl LocateKey {
    /// An empty name does not identify anything and is treated as an absent key
    pub fn is_empty(&self) -> bool {
        matches!(self, LocateKey::Name(name) if name.is_empty())
    }
}

impl From<&str> for LocateKey {
    fn from(name: &str) -> Self {
        LocateKey::Name(Arc::from(name))
    }
}

impl From<String> for LocateKey {
    fn from(name: String) -> Self {
        LocateKey::Name(Arc::from(name))
    }
}

impl From<u64> for LocateKey {
    fn from(id: u64) -> Self {
        LocateKey::Id(id)
    }
}

impl fmt::Display for LocateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateKey::Name(name) => f.write_str(name),
            LocateKey::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// Value used when no candidate satisfies the parameter.
///
/// Only one shape is active at a time: setting a new fallback replaces the previous one.
#[derive(Clone)]
pub enum Fallback {
    /// A fixed value, shared by every resolution
    Literal(AnyValue),
    /// Evaluated once per resolution
    Computed(ComputeFn),
    /// Evaluated once per resolution, with access to the active scope and contexts
    ContextComputed(ContextComputeFn),
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Literal(_) => f.write_str("Literal"),
            Fallback::Computed(_) => f.write_str("Computed"),
            Fallback::ContextComputed(_) => f.write_str("ContextComputed"),
        }
    }
}

/// Resolution options for one constructor parameter
#[derive(Clone)]
pub struct ParameterPolicy {
    parameter_type: ParameterType,
    pub(crate) parameter_name: Option<String>,
    pub(crate) candidate_filter: Option<CandidateFilter>,
    pub(crate) fallback: Option<Fallback>,
    pub(crate) is_required: bool,
    pub(crate) locate_key: Option<LocateKey>,
    pub(crate) is_dynamic: bool,
}

impl ParameterPolicy {
    pub fn new(parameter_type: ParameterType) -> Self {
        Self {
            parameter_type,
            parameter_name: None,
            candidate_filter: None,
            fallback: None,
            is_required: false,
            locate_key: None,
            is_dynamic: false,
        }
    }

    /// Create an empty policy for a parameter of type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ParameterType::of::<T>())
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter_name.as_deref()
    }

    pub fn candidate_filter(&self) -> Option<&CandidateFilter> {
        self.candidate_filter.as_ref()
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn locate_key(&self) -> Option<&LocateKey> {
        self.locate_key.as_ref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }
}

impl fmt::Debug for ParameterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterPolicy")
            .field("parameter_type", &self.parameter_type.name())
            .field("parameter_name", &self.parameter_name)
            .field("candidate_filter", &self.candidate_filter.is_some())
            .field("fallback", &self.fallback)
            .field("is_required", &self.is_required)
            .field("locate_key", &self.locate_key)
            .field("is_dynamic", &self.is_dynamic)
            .finish()
    }
}
