//! Weave Testing Infrastructure
//!
//! Fixture contracts, real implementations with call counters, and a
//! recording aspect for asserting hook order. Integration tests for the
//! whole weaving pipeline live in this crate's `tests/` directory.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,ignore
//! use weave_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     init_tracing();
//!     let journal = CallJournal::new();
//!     let factory = AspectFactory::new();
//!     factory.attach::<dyn UserRepository>("get_by_id", RecordingAspect::new("A", &journal));
//!     let repo = factory.create::<dyn UserRepository>(seeded_repository(&sample_users(2))).unwrap();
//!     // ... test logic
//! }
//! ```

pub mod fixtures;
pub mod recording;

pub use fixtures::*;
pub use recording::*;

// Re-export the weaving surface for convenience
pub use weave_core::{
    Aspect, AspectError, AspectFactory, Fault, InterceptError, MethodContext, SynthesisError,
    WeaveConfig,
};
pub use weave_macros::contract;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process, honoring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
