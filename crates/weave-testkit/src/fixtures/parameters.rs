//! Contract exercising every argument and return shape

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use weave_macros::contract;

/// Value written to the `number` out-parameter of `read_into`
pub const OUT_NUMBER: i32 = 42;

/// Value written to the `text` out-parameter of `read_into`
pub const OUT_TEXT: &str = "written by read_into";

/// Value returned by `number`
pub const NUMBER: i32 = 7;

/// Value returned by `text`
pub const TEXT: &str = "seven";

/// Instant written to the `when` out-parameter of `read_into`
pub fn out_when() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap()
}

#[contract]
pub trait ParameterPassing: Send + Sync {
    /// Whether every argument arrived exactly as sent
    fn check_all(
        &self,
        number: i32,
        text: &str,
        when: DateTime<Utc>,
        big: i64,
        flag: bool,
        values: &[i32],
    ) -> bool;

    fn describe(&self, label: String, count: i32) -> String;

    fn ping(&self);

    fn number(&self) -> i32;

    fn text(&self) -> String;

    fn read_into(&self, number: &mut i32, text: &mut String, when: &mut DateTime<Utc>);
}

/// Arguments `check_all` expects
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedArguments {
    pub number: i32,
    pub text: String,
    pub when: DateTime<Utc>,
    pub big: i64,
    pub flag: bool,
    pub values: Vec<i32>,
}

impl Default for ExpectedArguments {
    fn default() -> Self {
        Self {
            number: 5,
            text: "test".to_string(),
            when: Utc.with_ymd_and_hms(2023, 11, 14, 8, 0, 0).unwrap(),
            big: i64::MAX - 3,
            flag: true,
            values: vec![1, 2, 3],
        }
    }
}

/// Real implementation comparing arguments to an expectation
#[derive(Debug, Default)]
pub struct ParameterProbe {
    expected: ExpectedArguments,
    pings: AtomicUsize,
    descriptions: Mutex<Vec<String>>,
}

impl ParameterProbe {
    pub fn new(expected: ExpectedArguments) -> Self {
        Self {
            expected,
            ..Self::default()
        }
    }

    pub fn expected(&self) -> &ExpectedArguments {
        &self.expected
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Results of every real `describe` call
    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions.lock().clone()
    }
}

impl ParameterPassing for ParameterProbe {
    fn check_all(
        &self,
        number: i32,
        text: &str,
        when: DateTime<Utc>,
        big: i64,
        flag: bool,
        values: &[i32],
    ) -> bool {
        let expected = &self.expected;
        number == expected.number
            && text == expected.text
            && when == expected.when
            && big == expected.big
            && flag == expected.flag
            && values == expected.values.as_slice()
    }

    fn describe(&self, label: String, count: i32) -> String {
        let description = format!("{label} x{count}");
        self.descriptions.lock().push(description.clone());
        description
    }

    fn ping(&self) {
        self.pings.fetch_add(1, Ordering::SeqCst);
    }

    fn number(&self) -> i32 {
        NUMBER
    }

    fn text(&self) -> String {
        TEXT.to_string()
    }

    fn read_into(&self, number: &mut i32, text: &mut String, when: &mut DateTime<Utc>) {
        *number = OUT_NUMBER;
        *text = OUT_TEXT.to_string();
        *when = out_when();
    }
}
