//! Hook ordering, short-circuiting and hook failures through generated proxies

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use weave_core::{AspectFactory, HookPhase, InterceptError};
use weave_testkit::*;

fn probe_with(
    factory: &AspectFactory,
    real: &Arc<ParameterProbe>,
) -> Arc<dyn ParameterPassing> {
    factory
        .create::<dyn ParameterPassing>(real.clone())
        .unwrap()
}

#[test]
fn enter_ascends_and_exit_follows_exit_rank() {
    init_tracing();
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("A", &journal).with_priorities(1, 10),
    );
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("B", &journal).with_priorities(2, 5),
    );
    let real = Arc::new(ParameterProbe::default());
    let proxy = probe_with(&factory, &real);

    assert_eq!(proxy.describe("widget".to_string(), 3), "widget x3");

    assert_eq!(journal.entries(), ["AEnter", "BEnter", "BExit", "AExit"]);
    assert_eq!(real.descriptions(), ["widget x3"]);
}

#[test]
fn short_circuit_skips_real_call_and_later_enters_but_not_exits() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("A", &journal)
            .with_priorities(1, 1)
            .short_circuit("from cache".to_string()),
    );
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("B", &journal).with_priorities(2, 2),
    );
    let real = Arc::new(ParameterProbe::default());
    let proxy = probe_with(&factory, &real);

    assert_eq!(proxy.describe("widget".to_string(), 3), "from cache");
    assert_eq!(proxy.describe("gadget".to_string(), 1), "from cache");

    assert!(real.descriptions().is_empty());
    assert_eq!(
        journal.entries(),
        ["AEnter", "AExit", "BExit", "AEnter", "AExit", "BExit"]
    );
}

#[test]
fn two_aspects_on_one_method_both_fire() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn ParameterPassing>("ping", RecordingAspect::new("First", &journal));
    factory.attach::<dyn ParameterPassing>("ping", RecordingAspect::new("Second", &journal));
    let real = Arc::new(ParameterProbe::default());
    let proxy = probe_with(&factory, &real);

    proxy.ping();

    assert_eq!(journal.filtered("Enter"), ["FirstEnter", "SecondEnter"]);
    assert_eq!(journal.filtered("Exit"), ["FirstExit", "SecondExit"]);
    assert_eq!(real.pings(), 1);
}

#[test]
fn duplicate_globals_fire_independently() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    let global: Arc<dyn Aspect> = Arc::new(RecordingAspect::new("G", &journal));
    factory.register_shared_aspect(global.clone());
    factory.register_shared_aspect(global);
    let proxy = probe_with(&factory, &Arc::new(ParameterProbe::default()));

    assert_eq!(proxy.number(), NUMBER);

    assert_eq!(journal.entries(), ["GEnter", "GEnter", "GExit", "GExit"]);
}

#[test]
fn declared_then_attached_then_global_on_equal_ranks() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn UserRepository>("get_by_id", RecordingAspect::new("Attached", &journal));
    factory.register_global_aspect(RecordingAspect::new("Global", &journal));

    let weaving = factory.weaving::<dyn UserRepository>().unwrap();
    let chain = weaving.chain_for("get_by_id").unwrap();

    assert_eq!(chain.enter_sequence(), ["cache", "Attached", "Global"]);
    assert_eq!(chain.exit_sequence(), ["Attached", "Global", "cache"]);
    assert_eq!(
        weaving.chain_for("save").unwrap().enter_sequence(),
        ["Global"]
    );
}

#[test]
fn failing_enter_hook_aborts_the_call() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("Guard", &journal)
            .with_priorities(1, 1)
            .failing("denied"),
    );
    factory.attach::<dyn ParameterPassing>(
        "describe",
        RecordingAspect::new("Later", &journal).with_priorities(2, 2),
    );
    let real = Arc::new(ParameterProbe::default());
    let proxy = probe_with(&factory, &real);

    let payload = panic::catch_unwind(AssertUnwindSafe(|| {
        proxy.describe("widget".to_string(), 1)
    }))
    .unwrap_err();

    let err = payload.downcast::<InterceptError>().unwrap();
    let hook = err.as_hook().unwrap();
    assert_eq!(hook.aspect, "Guard");
    assert_eq!(hook.phase, HookPhase::Enter);
    assert_eq!(hook.method, "describe");
    assert_eq!(hook.source.message(), "denied");

    assert_eq!(journal.entries(), ["GuardEnter"]);
    assert!(real.descriptions().is_empty());
}

#[test]
fn short_circuit_with_wrong_type_is_reported() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn ParameterPassing>(
        "number",
        RecordingAspect::new("Wrong", &journal).short_circuit("not a number"),
    );
    let proxy = probe_with(&factory, &Arc::new(ParameterProbe::default()));

    let payload = panic::catch_unwind(AssertUnwindSafe(|| proxy.number())).unwrap_err();

    let err = payload.downcast::<InterceptError>().unwrap();
    assert!(matches!(*err, InterceptError::ResultType { ref expected, .. } if expected == "i32"));
    assert_eq!(journal.entries(), ["WrongEnter", "WrongExit"]);
}
