//! Contract whose real methods fail

use std::sync::atomic::{AtomicUsize, Ordering};
use weave_macros::contract;

/// Panic payload raised by [`ExplodingSource::explode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFault {
    pub code: u32,
}

#[contract]
pub trait FaultSource: Send + Sync {
    /// Panics with a [`FixtureFault`] carrying `code`
    fn explode(&self, code: u32) -> u32;

    /// Fails through its return value when `code` is zero
    fn checked(&self, code: u32) -> Result<u32, String>;
}

/// Real implementation counting attempts
#[derive(Debug, Default)]
pub struct ExplodingSource {
    attempts: AtomicUsize,
}

impl ExplodingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl FaultSource for ExplodingSource {
    fn explode(&self, code: u32) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::panic::panic_any(FixtureFault { code })
    }

    fn checked(&self, code: u32) -> Result<u32, String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if code == 0 {
            Err("code must be non-zero".to_string())
        } else {
            Ok(code * 2)
        }
    }
}
