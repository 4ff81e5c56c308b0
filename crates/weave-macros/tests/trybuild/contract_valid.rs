use std::sync::Arc;
use weave_core::{AspectFactory, TraceAspect};
use weave_macros::contract;

#[contract]
pub trait Greeter: Send + Sync {
    #[aspect(TraceAspect::default())]
    fn greet(&self, name: &str) -> String;

    fn wave(&self);
}

struct Polite;

impl Greeter for Polite {
    fn greet(&self, name: &str) -> String {
        format!("hello, {name}")
    }

    fn wave(&self) {}
}

fn main() {
    let factory = AspectFactory::new();
    let greeter = factory.create::<dyn Greeter>(Arc::new(Polite)).unwrap();
    assert_eq!(greeter.greet("weave"), "hello, weave");
    greeter.wave();
}
