//! Per-parameter resolution policies for constructor injection.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use hanami_params::*;
//! struct Server {
//!     host: Arc<String>,
//!     port: Arc<u16>,
//! }
//!
//! impl Server {
//!     fn new(host: Arc<String>, port: Arc<u16>) -> Self {
//!         Self { host, port }
//!     }
//! }
//!
//! # fn main() -> Result<(), WiringError> {
//! // Attach a policy to each constructor parameter
//! let mut export = Export::<Server>::new();
//! export.parameter::<String>(0)?.locate_with_key("host")?.required();
//! export.parameter::<u16>(1)?.named("port")?.default_value(8080);
//!
//! // Register candidates in a resolution scope
//! let scope = Scope::root();
//! scope.register(String::from("localhost"), CandidateMetadata::new().with_key("host"));
//!
//! // Build an instance
//! let server = export
//!     .finalize()
//!     .construct(&scope, &InjectionContext::new(), &["host", "port"], Server::new)?;
//! assert_eq!(server.host.as_str(), "localhost");
//! assert_eq!(*server.port, 8080);
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! A [ParameterPolicy] holds the resolution options of a single constructor parameter:
//!
//! * a name binding the policy to the constructor parameter with the same name,
//! * a filter restricting the candidates which may satisfy the parameter,
//! * a [Fallback] used when no candidate is available: a literal value, a computation, or a
//!   computation taking the resolution context,
//! * a required flag: a required parameter without candidate nor fallback fails the construction,
//! * a [LocateKey] restricting the candidates to those registered under this key,
//! * a dynamic flag: the parameter is resolved again at each point of use, see [Dynamic].
//!
//! Policies are owned by an [Export] and configured through a [ParameterPolicyBuilder].
//! Once the export is finalized, the policies are frozen in an [ExportPlan] which drives the
//! resolution of the constructor arguments in a [Scope].

mod builder;
mod export;
mod helpers;
mod inject;
mod policy;
mod resolve;
mod scope;

pub use builder::{ExportParameterBuilder, ParameterPolicyBuilder};
pub use export::{Export, ExportPlan};
pub use helpers::{FactoryProvider, Provide, Provider, SingletonProvider};
pub use inject::{Argument, Callable, Defaulted, Injectable};
pub use policy::{
    AnyValue, CandidateFilter, ComputeFn, ContextComputeFn, Fallback, FallbackError, LocateKey,
    ParameterPolicy, ParameterType,
};
pub use resolve::{
    resolve, Binding, Dynamic, InjectionContext, ParameterInfo, Resolution,
    StaticInjectionContext, WiringError,
};
pub use scope::{CandidateMetadata, Scope};

#[cfg(test)]
mod tests;
