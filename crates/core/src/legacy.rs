//! Parsing for lock records exported by the previous document store.
//!
//! The old store kept both budgets as free text. This is the only place where
//! an unparseable value is replaced by the budget default instead of being
//! rejected; everywhere else durations are native numbers.

use crate::lock::{heal_remaining, Budget, Remaining};

/// Parse one legacy text budget, falling back to the budget default.
pub fn parse_or_default(raw: &str, budget: Budget) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) => heal_remaining(value, budget),
        Err(_) => budget.default_secs(),
    }
}

/// Normalize both legacy text budgets into native values.
pub fn normalize_remaining(browse_raw: &str, activity_raw: &str) -> Remaining {
    Remaining::new(
        parse_or_default(browse_raw, Budget::Browse),
        parse_or_default(activity_raw, Budget::Activity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_is_kept() {
        assert_eq!(parse_or_default("1800", Budget::Browse), 1800.0);
        assert_eq!(parse_or_default(" 0 ", Budget::Activity), 0.0);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        assert_eq!(parse_or_default("abc", Budget::Browse), 3600.0);
        assert_eq!(parse_or_default("", Budget::Activity), 1200.0);
    }

    #[test]
    fn negative_text_falls_back_to_default() {
        assert_eq!(parse_or_default("-20", Budget::Browse), 3600.0);
    }

    #[test]
    fn normalize_handles_each_budget_independently() {
        let remaining = normalize_remaining("undefined", "600");
        assert_eq!(remaining, Remaining::new(3600.0, 600.0));
    }
}
