use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

struct Service;

fn target<T: 'static>() -> StaticInjectionContext {
    StaticInjectionContext::new(
        ParameterType::of::<Service>(),
        ParameterInfo::of::<T>(0, Some("value")),
    )
}

fn bind<T: 'static>(policy: ParameterPolicy) -> Binding {
    Binding::new(Arc::new(policy), target::<T>())
}

#[derive(Debug)]
struct Unavailable;

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("backend unavailable")
    }
}

impl std::error::Error for Unavailable {}

#[test]
fn named_parameter() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<u32>();
    policy.configure::<u32>()?.named("port")?;
    assert_eq!(policy.parameter_name(), Some("port"));

    let failed = policy.configure::<u32>()?.named("").err();
    assert!(matches!(
        failed,
        Some(WiringError::InvalidArgument { argument: "name", .. })
    ));
    assert_eq!(policy.parameter_name(), Some("port"));
    Ok(())
}

#[test]
fn builder_checks_parameter_type() {
    let mut policy = ParameterPolicy::of::<u32>();
    let failed = policy.configure::<String>().err();
    assert!(matches!(failed, Some(WiringError::TypeMismatch { .. })));
}

#[test]
fn flag_shorthands() -> Result<(), WiringError> {
    let mut explicit = ParameterPolicy::of::<u32>();
    explicit.configure::<u32>()?.is_required(true).is_dynamic(true);
    let mut short = ParameterPolicy::of::<u32>();
    short.configure::<u32>()?.required().dynamic();

    assert!(short.is_required() && short.is_dynamic());
    assert_eq!(explicit.is_required(), short.is_required());
    assert_eq!(explicit.is_dynamic(), short.is_dynamic());

    short.configure::<u32>()?.is_required(false).is_dynamic(false);
    assert!(!short.is_required());
    assert!(!short.is_dynamic());
    Ok(())
}

#[test]
fn last_fallback_wins() -> Result<(), WiringError> {
    let scope = Scope::root();
    let context = InjectionContext::new();

    let mut policy = ParameterPolicy::of::<u32>();
    policy
        .configure::<u32>()?
        .default_value(1)
        .default_value_from(|_, _, _| 2)
        .default_value_with(|| 3);
    assert!(matches!(policy.fallback(), Some(Fallback::Computed(_))));
    let resolved = bind::<u32>(policy.clone()).resolve_as::<u32>(&scope, &context)?;
    assert_eq!(resolved, Resolution::Fallback(Arc::new(3)));

    policy.configure::<u32>()?.default_value(4);
    assert!(matches!(policy.fallback(), Some(Fallback::Literal(_))));
    let resolved = bind::<u32>(policy).resolve_as::<u32>(&scope, &context)?;
    assert_eq!(resolved, Resolution::Fallback(Arc::new(4)));
    Ok(())
}

#[test]
fn filter_is_called_for_each_resolution() -> Result<(), WiringError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut policy = ParameterPolicy::of::<String>();
    policy.configure::<String>()?.consider(move |candidate| {
        counter.fetch_add(1, Ordering::SeqCst);
        candidate.tag("env") == Some("prod")
    });

    let scope = Scope::root();
    scope.register(
        String::from("prod-db"),
        CandidateMetadata::new().with_tag("env", "prod"),
    );
    scope.register(
        String::from("dev-db"),
        CandidateMetadata::new().with_tag("env", "dev"),
    );

    let binding = bind::<String>(policy);
    let context = InjectionContext::new();
    for _ in 0..2 {
        let resolved = binding.resolve_as::<String>(&scope, &context)?;
        assert_eq!(resolved, Resolution::Candidate(Arc::new(String::from("prod-db"))));
    }
    // the latest registration is checked first: dev, then prod
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let filter = binding.policy().candidate_filter().cloned();
    let filter = filter.expect("filter is set");
    assert!(filter(&CandidateMetadata::new().with_tag("env", "prod")));
    assert!(!filter(&CandidateMetadata::new().with_tag("env", "dev")));
    Ok(())
}

#[test]
fn filter_excluding_everything_uses_fallback() -> Result<(), WiringError> {
    let scope = Scope::root();
    scope.register(7u32, CandidateMetadata::new());

    let mut policy = ParameterPolicy::of::<u32>();
    policy
        .configure::<u32>()?
        .consider(|_| false)
        .default_value(42)
        .required();

    let resolved = bind::<u32>(policy).resolve_as::<u32>(&scope, &InjectionContext::new())?;
    assert_eq!(resolved, Resolution::Fallback(Arc::new(42)));
    Ok(())
}

#[test]
fn locate_key() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<String>();
    policy
        .configure::<String>()?
        .named("url")?
        .locate_with_key("replica")?
        .required();

    let failed = policy.configure::<String>()?.locate_with_key("").err();
    assert!(matches!(
        failed,
        Some(WiringError::InvalidArgument { argument: "key", .. })
    ));
    assert_eq!(policy.locate_key(), Some(&LocateKey::from("replica")));
    assert_eq!(policy.parameter_name(), Some("url"));
    assert!(policy.is_required());

    let scope = Scope::root();
    scope.register(String::from("primary"), CandidateMetadata::new().with_key("primary"));
    scope.register(String::from("replica"), CandidateMetadata::new().with_key("replica"));
    scope.register(String::from("unkeyed"), CandidateMetadata::new());

    let binding = bind::<String>(policy.clone());
    let resolved = binding.resolve_as::<String>(&scope, &InjectionContext::new())?;
    assert_eq!(resolved, Resolution::Candidate(Arc::new(String::from("replica"))));

    policy.configure::<String>()?.locate_with_key(12u64)?;
    let failed = bind::<String>(policy).resolve(&scope, &InjectionContext::new()).err();
    assert!(matches!(
        failed,
        Some(WiringError::UnsatisfiedParameter { .. })
    ));
    Ok(())
}

#[test]
fn required_without_candidate_fails() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<String>();
    policy.configure::<String>()?.required();

    let failed = resolve(&policy, &Scope::root(), &target::<String>(), &InjectionContext::new()).err();
    match failed {
        Some(WiringError::UnsatisfiedParameter { target, parameter }) => {
            assert_eq!(target, std::any::type_name::<Service>());
            assert_eq!(parameter, "`value` (#0)");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    Ok(())
}

#[test]
fn optional_without_candidate_uses_literal() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<u32>();
    policy.configure::<u32>()?.default_value(42);

    let resolved = bind::<u32>(policy).resolve_as::<u32>(&Scope::root(), &InjectionContext::new())?;
    assert_eq!(resolved.value().as_deref(), Some(&42));
    Ok(())
}

#[test]
fn optional_without_anything_is_default() -> Result<(), WiringError> {
    let binding = bind::<u32>(ParameterPolicy::of::<u32>());
    let resolved = binding.resolve_as::<u32>(&Scope::root(), &InjectionContext::new())?;
    assert!(resolved.is_default());
    assert_eq!(*resolved.into_value_or_default(), 0);
    Ok(())
}

#[test]
fn context_fallback_is_called_on_each_resolution() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<usize>();
    policy
        .configure::<usize>()?
        .default_value_from(|scope, _, _| scope.depth());

    let root = Scope::root();
    let first = root.child();
    let second = first.child();

    let binding = bind::<usize>(policy);
    let context = InjectionContext::new();
    assert_eq!(
        binding.resolve_as::<usize>(&first, &context)?,
        Resolution::Fallback(Arc::new(1))
    );
    assert_eq!(
        binding.resolve_as::<usize>(&second, &context)?,
        Resolution::Fallback(Arc::new(2))
    );
    Ok(())
}

#[test]
fn context_fallback_reads_contexts() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<String>();
    policy
        .configure::<String>()?
        .default_value_from(|_, target, context| {
            let tenant = context.get::<String>("tenant").map(|t| t.to_string());
            format!(
                "{}:{}",
                target.parameter().name().unwrap_or("?"),
                tenant.unwrap_or_default()
            )
        });

    let context = InjectionContext::new().with_value("tenant", String::from("acme"));
    let resolved = bind::<String>(policy).resolve_as::<String>(&Scope::root(), &context)?;
    assert_eq!(resolved, Resolution::Fallback(Arc::new(String::from("value:acme"))));
    Ok(())
}

#[test]
fn computed_fallback_runs_once_per_resolution() -> Result<(), WiringError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut policy = ParameterPolicy::of::<usize>();
    policy
        .configure::<usize>()?
        .default_value_with(move || counter.fetch_add(1, Ordering::SeqCst));

    let binding = bind::<usize>(policy);
    let scope = Scope::root();
    let context = InjectionContext::new();
    assert_eq!(binding.resolve_as::<usize>(&scope, &context)?.value().as_deref(), Some(&0));
    assert_eq!(binding.resolve_as::<usize>(&scope, &context)?.value().as_deref(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn fallback_error_is_forwarded() -> Result<(), WiringError> {
    let mut policy = ParameterPolicy::of::<u32>();
    policy
        .configure::<u32>()?
        .try_default_value_with(|| Err(Unavailable.into()));

    let failed = resolve(&policy, &Scope::root(), &target::<u32>(), &InjectionContext::new()).err();
    match failed {
        Some(WiringError::Fallback(source)) => {
            assert!(source.downcast_ref::<Unavailable>().is_some());
            assert_eq!(source.to_string(), "backend unavailable");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    policy
        .configure::<u32>()?
        .try_default_value_from(|_, _, _| Err(Unavailable.into()));
    let failed = resolve(&policy, &Scope::root(), &target::<u32>(), &InjectionContext::new()).err();
    assert_eq!(
        failed.map(|err| err.to_string()),
        Some(String::from("backend unavailable"))
    );
    Ok(())
}

#[test]
fn candidates_of_nearest_scope_win() -> Result<(), WiringError> {
    let root = Scope::root();
    root.register(String::from("root"), CandidateMetadata::new());
    let child = root.child();

    let binding = bind::<String>(ParameterPolicy::of::<String>());
    let context = InjectionContext::new();
    assert_eq!(
        binding.resolve_as::<String>(&child, &context)?.value().as_deref(),
        Some(&String::from("root"))
    );

    child.register(String::from("child"), CandidateMetadata::new().with_name("override"));
    assert_eq!(
        binding.resolve_as::<String>(&child, &context)?.value().as_deref(),
        Some(&String::from("child"))
    );
    assert_eq!(
        binding.resolve_as::<String>(&root, &context)?.value().as_deref(),
        Some(&String::from("root"))
    );
    Ok(())
}

#[test]
fn singleton_and_factory_candidates() -> Result<(), WiringError> {
    let scope = Scope::root();
    scope.register(String::from("shared"), CandidateMetadata::new());
    scope.register_factory(|| vec![1u8, 2, 3], CandidateMetadata::new());

    let context = InjectionContext::new();
    let shared = bind::<String>(ParameterPolicy::of::<String>());
    let (s1, s2) = (
        shared.resolve_as::<String>(&scope, &context)?.value(),
        shared.resolve_as::<String>(&scope, &context)?.value(),
    );
    assert!(matches!((s1, s2), (Some(a), Some(b)) if Arc::ptr_eq(&a, &b)));

    let fresh = bind::<Vec<u8>>(ParameterPolicy::of::<Vec<u8>>());
    let (f1, f2) = (
        fresh.resolve_as::<Vec<u8>>(&scope, &context)?.value(),
        fresh.resolve_as::<Vec<u8>>(&scope, &context)?.value(),
    );
    assert!(matches!((f1, f2), (Some(a), Some(b)) if !Arc::ptr_eq(&a, &b) && a == b));
    Ok(())
}

struct Session {
    user: Dynamic<String>,
}

impl Session {
    fn new(user: Dynamic<String>) -> Self {
        Self { user }
    }
}

#[test]
fn dynamic_parameter_follows_scope() -> Result<(), WiringError> {
    let mut export = Export::<Session>::new();
    export
        .parameter::<String>(0)?
        .dynamic()
        .default_value(String::from("X"));

    let scope_a = Scope::root();
    let session = export
        .finalize()
        .construct(&scope_a, &InjectionContext::new(), &["user"], Session::new)?;
    assert_eq!(session.user.get(&scope_a)?.as_deref().map(String::as_str), Some("X"));

    let scope_b = scope_a.child();
    scope_b.register(String::from("Y"), CandidateMetadata::new());
    assert_eq!(session.user.get(&scope_b)?.as_deref().map(String::as_str), Some("Y"));
    assert_eq!(session.user.get(&scope_a)?.as_deref().map(String::as_str), Some("X"));
    Ok(())
}

#[test]
fn dynamic_parameter_requires_deferred_argument() -> Result<(), WiringError> {
    struct Eager(Arc<String>);

    let mut export = Export::<Eager>::new();
    export.parameter::<String>(0)?.dynamic();

    let failed = export
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &[], Eager)
        .err();
    assert!(matches!(failed, Some(WiringError::DynamicParameter { .. })));
    Ok(())
}

struct Pair {
    left: Option<Arc<u32>>,
    right: Arc<u32>,
}

impl Pair {
    fn new(left: Option<Arc<u32>>, right: Arc<u32>) -> Self {
        Self { left, right }
    }
}

#[test]
fn named_policy_wins_over_position() -> Result<(), WiringError> {
    let mut export = Export::<Pair>::new();
    export.parameter::<u32>(0)?.named("right")?.default_value(2);
    export.parameter::<u32>(1)?.default_value(1);

    let pair = export
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &["left", "right"], Pair::new)?;
    assert_eq!(pair.left, None);
    assert_eq!(*pair.right, 2);

    // without names, policies only match by position
    let pair = export
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &[], Pair::new)?;
    assert_eq!(pair.left, None);
    assert_eq!(*pair.right, 1);
    Ok(())
}

#[test]
fn optional_argument_without_value() -> Result<(), WiringError> {
    struct Plain(Arc<u32>);

    let export = Export::<Plain>::new();
    let failed = export
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &["count"], Plain)
        .err();
    match failed {
        Some(WiringError::NoDefaultValue { parameter, .. }) => assert_eq!(parameter, "`count` (#0)"),
        other => panic!("unexpected outcome: {:?}", other.map(|err| err.to_string())),
    }
    Ok(())
}

#[test]
fn export_policy_lifecycle() -> Result<(), WiringError> {
    let mut export = Export::<Pair>::new();
    export.parameter::<u32>(0)?.required();
    export.parameter::<u32>(0)?.locate_with_key("left")?;

    let policy = export.policy(0).expect("policy is configured");
    assert!(policy.is_required());
    assert_eq!(policy.locate_key(), Some(&LocateKey::from("left")));

    let mismatch = export.parameter::<String>(0).err();
    assert!(matches!(mismatch, Some(WiringError::TypeMismatch { .. })));

    assert!(!export.is_finalized());
    let frozen = export.finalize().policies().count();
    assert_eq!(frozen, 1);
    assert!(export.is_finalized());

    let late = export.parameter::<u32>(1).err();
    assert!(matches!(late, Some(WiringError::AlreadyFinalized)));
    assert_eq!(export.finalize().policies().count(), 1);
    Ok(())
}

#[test]
fn plan_rejects_named_policy_of_other_type() -> Result<(), WiringError> {
    let mut export = Export::<Pair>::new();
    export.parameter::<String>(3)?.named("right")?;

    let parameter = ParameterInfo::of::<u32>(1, Some("right"));
    let failed = export.finalize().bind(&parameter).err();
    assert!(matches!(failed, Some(WiringError::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn frozen_plan_is_shared_across_threads() -> Result<(), WiringError> {
    let mut export = Export::<Pair>::new();
    export
        .parameter::<u32>(1)?
        .default_value_from(|scope, _, _| scope.depth() as u32);
    let export = Arc::new(export);
    let root = Scope::root();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let export = export.clone();
            let scope = root.child();
            std::thread::spawn(move || {
                export
                    .finalize()
                    .construct(&scope, &InjectionContext::new(), &[], Pair::new)
                    .map(|pair| *pair.right)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("resolution thread")?, 1);
    }
    Ok(())
}

#[test]
fn dynamic_parameter_reapplies_key_and_filter() -> Result<(), WiringError> {
    let mut export = Export::<Session>::new();
    export
        .parameter::<String>(0)?
        .dynamic()
        .locate_with_key("user")?
        .consider(|candidate| candidate.tag("active") == Some("yes"))
        .default_value(String::from("X"));

    let scope_a = Scope::root();
    let session = export
        .finalize()
        .construct(&scope_a, &InjectionContext::new(), &["user"], Session::new)?;

    let scope_b = scope_a.child();
    scope_b.register(
        String::from("unkeyed"),
        CandidateMetadata::new().with_tag("active", "yes"),
    );
    scope_b.register(
        String::from("inactive"),
        CandidateMetadata::new().with_key("user").with_tag("active", "no"),
    );
    assert_eq!(session.user.get(&scope_b)?.as_deref().map(String::as_str), Some("X"));

    scope_b.register(
        String::from("keyed"),
        CandidateMetadata::new().with_key("user").with_tag("active", "yes"),
    );
    assert_eq!(session.user.get(&scope_b)?.as_deref().map(String::as_str), Some("keyed"));
    assert_eq!(session.user.get(&scope_a)?.as_deref().map(String::as_str), Some("X"));
    Ok(())
}

#[test]
fn unkeyed_policy_ignores_keyed_candidates() -> Result<(), WiringError> {
    let scope = Scope::root();
    scope.register(String::from("keyed"), CandidateMetadata::new().with_key("primary"));

    let binding = bind::<String>(ParameterPolicy::of::<String>());
    let context = InjectionContext::new();
    assert!(binding.resolve_as::<String>(&scope, &context)?.is_default());

    scope.register(String::from("plain"), CandidateMetadata::new());
    assert_eq!(
        binding.resolve_as::<String>(&scope, &context)?,
        Resolution::Candidate(Arc::new(String::from("plain")))
    );
    Ok(())
}

struct Limits {
    retries: Defaulted<u32>,
    timeout: Defaulted<u64>,
}

impl Limits {
    fn new(retries: Defaulted<u32>, timeout: Defaulted<u64>) -> Self {
        Self { retries, timeout }
    }
}

#[test]
fn defaulted_argument_uses_type_default() -> Result<(), WiringError> {
    let mut export = Export::<Limits>::new();
    export.parameter::<u64>(1)?.default_value(30);

    let limits = export
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &[], Limits::new)?;
    assert_eq!(*limits.retries, 0);
    assert_eq!(*limits.timeout, 30);

    let mut strict = Export::<Limits>::new();
    strict.parameter::<u32>(0)?.required();
    let failed = strict
        .finalize()
        .construct(&Scope::root(), &InjectionContext::new(), &[], Limits::new)
        .err();
    assert!(matches!(failed, Some(WiringError::UnsatisfiedParameter { .. })));
    Ok(())
}
