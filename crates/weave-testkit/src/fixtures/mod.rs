//! Fixture contracts and their real implementations

pub mod faults;
pub mod parameters;
pub mod users;

pub use faults::*;
pub use parameters::*;
pub use users::*;
