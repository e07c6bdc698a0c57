//! Error types for the fallible construction paths of the crate.
//!
//! Runtime checks (the `check()` lifecycle step) are not represented here: they are
//! local, recoverable conditions reported through [`CheckReport`] rather than through
//! `Result`, per the error-handling design (propagation policy: recoverable conditions
//! never unwind through a backend).
use std::fmt;

/// Error returned when a builder (geometry, module wiring, model) is missing a
/// required field or was given an inconsistent combination of fields.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TryFromBuilderError(pub &'static str);

impl fmt::Display for TryFromBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for TryFromBuilderError {}

/// One configuration field that `check()` reverted to a safe default, with the reason.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CheckWarning {
    pub field: &'static str,
    pub reason: &'static str,
}

/// The outcome of a `check()` call: zero or more reverted fields, and whether the
/// structural state (population size, geometry, trait count) changed enough that a
/// `reset()` is required before `next()` may be called again.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CheckReport {
    pub warnings: Vec<CheckWarning>,
    pub needs_reset: bool,
}

impl CheckReport {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn revert(&mut self, field: &'static str, reason: &'static str) {
        log::warn!("check: reverting `{field}` ({reason})");
        self.warnings.push(CheckWarning { field, reason });
    }

    pub fn require_reset(&mut self) {
        self.needs_reset = true;
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && !self.needs_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_has_no_warnings() {
        let report = CheckReport::ok();
        assert!(report.is_clean());
    }

    #[test]
    fn revert_records_a_warning_and_stays_resettable_independently() {
        let mut report = CheckReport::ok();
        report.revert("adjusted_dynamics", "fitness <= 0");
        assert!(!report.is_clean());
        assert!(!report.needs_reset);
    }
}
