//! Argument capture, out-parameters and unit methods

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use weave_core::{AspectFactory, ParamMode};
use weave_testkit::*;

/// Copies every captured argument out of the context on enter
#[derive(Default)]
struct ArgumentTap {
    seen: Mutex<Vec<(String, ParamMode, String)>>,
    typed: Mutex<Option<ExpectedArguments>>,
}

impl Aspect for ArgumentTap {
    fn name(&self) -> &str {
        "tap"
    }

    fn on_enter(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let mut seen = self.seen.lock();
        for param in ctx.parameters() {
            seen.push((param.name().to_string(), param.mode(), param.canonical()));
        }

        if ctx.method_name() == "check_all" {
            let typed = ExpectedArguments {
                number: *argument::<i32>(ctx, "number")?,
                text: argument::<String>(ctx, "text")?.clone(),
                when: *argument::<DateTime<Utc>>(ctx, "when")?,
                big: *argument::<i64>(ctx, "big")?,
                flag: *argument::<bool>(ctx, "flag")?,
                values: argument::<Vec<i32>>(ctx, "values")?.clone(),
            };
            *self.typed.lock() = Some(typed);
        }
        Ok(())
    }
}

fn argument<'c, T: Any>(ctx: &'c MethodContext<'_>, name: &str) -> Result<&'c T, AspectError> {
    ctx.parameter(name)
        .and_then(|param| param.value::<T>())
        .ok_or_else(|| AspectError::new(format!("argument {name} missing or mistyped")))
}

fn tapped(factory: &AspectFactory) -> Arc<ArgumentTap> {
    let tap = Arc::new(ArgumentTap::default());
    factory.register_global_aspect(tap.clone());
    tap
}

#[test]
fn aspects_see_arguments_by_value_in_declaration_order() {
    init_tracing();
    let factory = AspectFactory::new();
    let tap = tapped(&factory);
    let expected = ExpectedArguments::default();
    let proxy = factory
        .create::<dyn ParameterPassing>(Arc::new(ParameterProbe::new(expected.clone())))
        .unwrap();

    let passed = proxy.check_all(
        expected.number,
        &expected.text,
        expected.when,
        expected.big,
        expected.flag,
        &expected.values,
    );

    assert!(passed);
    assert_eq!(tap.typed.lock().as_ref(), Some(&expected));

    let seen = tap.seen.lock();
    let names: Vec<_> = seen.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(names, ["number", "text", "when", "big", "flag", "values"]);
    assert_eq!(seen[1].1, ParamMode::Borrowed);
    assert_eq!(seen[1].2, "\"test\"");
    assert_eq!(seen[5].1, ParamMode::Borrowed);
    assert_eq!(seen[5].2, "[1, 2, 3]");
    assert_eq!(seen[3].1, ParamMode::Value);
}

#[test]
fn mismatched_arguments_still_reach_the_real_method() {
    let factory = AspectFactory::new();
    let _tap = tapped(&factory);
    let expected = ExpectedArguments::default();
    let proxy = factory
        .create::<dyn ParameterPassing>(Arc::new(ParameterProbe::new(expected.clone())))
        .unwrap();

    assert!(!proxy.check_all(
        expected.number + 1,
        &expected.text,
        expected.when,
        expected.big,
        expected.flag,
        &expected.values,
    ));
}

#[test]
fn out_parameters_are_written_through() {
    let factory = AspectFactory::new();
    let tap = tapped(&factory);
    let proxy = factory
        .create::<dyn ParameterPassing>(Arc::new(ParameterProbe::default()))
        .unwrap();

    let mut number = 0;
    let mut text = String::from("before");
    let mut when = DateTime::<Utc>::default();
    proxy.read_into(&mut number, &mut text, &mut when);

    assert_eq!(number, OUT_NUMBER);
    assert_eq!(text, OUT_TEXT);
    assert_eq!(when, out_when());

    let seen = tap.seen.lock();
    assert_eq!(seen[0], ("number".to_string(), ParamMode::Mutable, "0".to_string()));
    assert_eq!(seen[1].2, "\"before\"");
}

#[test]
fn unit_and_parameterless_methods_run_the_full_chain() {
    let journal = CallJournal::new();
    let factory = AspectFactory::new();
    factory.register_global_aspect(RecordingAspect::new("R", &journal));
    let real = Arc::new(ParameterProbe::default());
    let proxy = factory
        .create::<dyn ParameterPassing>(real.clone())
        .unwrap();

    proxy.ping();
    assert_eq!(proxy.number(), NUMBER);
    assert_eq!(proxy.text(), TEXT);

    assert_eq!(real.pings(), 1);
    assert_eq!(journal.filtered("Enter").len(), 3);
    assert_eq!(journal.filtered("Exit").len(), 3);
}
