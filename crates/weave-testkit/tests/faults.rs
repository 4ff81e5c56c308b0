//! Real-method panics pass through fault hooks and reach the caller unchanged

use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use weave_core::{AspectFactory, FaultFilterAspect};
use weave_testkit::*;

fn payload_addr(payload: &(dyn Any + Send)) -> usize {
    payload as *const (dyn Any + Send) as *const () as usize
}

#[test]
fn handler_sees_the_fault_once_and_caller_gets_the_same_payload() {
    init_tracing();
    let observed: Arc<Mutex<Vec<(u32, usize)>>> = Arc::default();
    let sink = observed.clone();
    let filter = FaultFilterAspect::new().with_handler(move |report| {
        assert_eq!(report.method, "explode");
        assert_eq!(report.receiver_type, std::any::type_name::<ExplodingSource>());
        let code = report.fault.downcast_ref::<FixtureFault>().unwrap().code;
        sink.lock().push((code, report.fault.payload_addr()));
    });

    let factory = AspectFactory::new();
    factory.attach::<dyn FaultSource>("explode", filter);
    let real = Arc::new(ExplodingSource::new());
    let source = factory.create::<dyn FaultSource>(real.clone()).unwrap();

    let payload = panic::catch_unwind(AssertUnwindSafe(|| source.explode(17))).unwrap_err();

    let observed = observed.lock();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].0, 17);
    assert_eq!(observed[0].1, payload_addr(payload.as_ref()));
    assert_eq!(
        payload.downcast_ref::<FixtureFault>(),
        Some(&FixtureFault { code: 17 })
    );
    assert_eq!(real.attempts(), 1);
}

#[test]
fn fault_hooks_run_in_exit_order_and_exit_hooks_are_skipped() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn FaultSource>(
        "explode",
        RecordingAspect::new("Outer", &journal).with_priorities(1, 10),
    );
    factory.attach::<dyn FaultSource>(
        "explode",
        RecordingAspect::new("Inner", &journal).with_priorities(2, 5),
    );
    let source = factory
        .create::<dyn FaultSource>(Arc::new(ExplodingSource::new()))
        .unwrap();

    let payload = panic::catch_unwind(AssertUnwindSafe(|| source.explode(3))).unwrap_err();
    let addr = payload_addr(payload.as_ref());

    assert_eq!(
        journal.entries(),
        [
            "OuterEnter".to_string(),
            "InnerEnter".to_string(),
            format!("InnerFault@{addr:x}"),
            format!("OuterFault@{addr:x}"),
        ]
    );
}

#[test]
fn error_results_are_ordinary_values() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.attach::<dyn FaultSource>("checked", RecordingAspect::new("R", &journal));
    factory.attach::<dyn FaultSource>("checked", FaultFilterAspect::new());
    let source = factory
        .create::<dyn FaultSource>(Arc::new(ExplodingSource::new()))
        .unwrap();

    assert_eq!(source.checked(4), Ok(8));
    assert_eq!(source.checked(0), Err("code must be non-zero".to_string()));
    assert_eq!(journal.filtered("Exit").len(), 2);
    assert!(journal.filtered("Fault").is_empty());
}
