//! Lock budgets, validation, and the pure decay state transitions.
//!
//! Every function here is synchronous and side-effect free. Decisions about
//! persistence are returned as [`LockEffect`] values inside a [`DecayPlan`];
//! executing them is the job of [`crate::engine::DecayEngine`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Browse budget assigned to a newly created lock (one hour).
pub const DEFAULT_BROWSE_SECS: f64 = 3600.0;

/// Activity budget assigned to a newly created lock (twenty minutes).
pub const DEFAULT_ACTIVITY_SECS: f64 = 1200.0;

// ---------------------------------------------------------------------------
// Budget selector
// ---------------------------------------------------------------------------

/// Which of the two remaining-time budgets a decay report applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    #[default]
    Browse,
    Activity,
}

impl Budget {
    /// The value a fresh lock starts with, also used to heal corrupt values.
    pub fn default_secs(self) -> f64 {
        match self {
            Self::Browse => DEFAULT_BROWSE_SECS,
            Self::Activity => DEFAULT_ACTIVITY_SECS,
        }
    }

    /// Field name as it appears in API payloads and error messages.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Browse => "browse_time_remaining",
            Self::Activity => "activity_time_remaining",
        }
    }
}

// ---------------------------------------------------------------------------
// Remaining time pair
// ---------------------------------------------------------------------------

/// The two remaining-time budgets of a lock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Remaining {
    pub browse: f64,
    pub activity: f64,
}

impl Remaining {
    pub fn new(browse: f64, activity: f64) -> Self {
        Self { browse, activity }
    }

    /// Budgets of a freshly created lock.
    pub fn defaults() -> Self {
        Self::new(DEFAULT_BROWSE_SECS, DEFAULT_ACTIVITY_SECS)
    }

    pub fn get(&self, budget: Budget) -> f64 {
        match budget {
            Budget::Browse => self.browse,
            Budget::Activity => self.activity,
        }
    }

    /// Copy with one budget replaced.
    pub fn with(self, budget: Budget, value: f64) -> Self {
        match budget {
            Budget::Browse => Self { browse: value, ..self },
            Budget::Activity => Self { activity: value, ..self },
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject lock types that are empty or whitespace-only.
pub fn validate_lock_type(lock_type: &str) -> Result<(), CoreError> {
    if lock_type.trim().is_empty() {
        return Err(CoreError::Validation(
            "Lock type must be at least one character long".to_string(),
        ));
    }
    Ok(())
}

/// Validate a caller-supplied remaining time: finite and not negative.
pub fn validate_remaining(value: f64, field: &str) -> Result<f64, CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!("{field} must be a number")));
    }
    if value < 0.0 {
        return Err(CoreError::Validation(format!(
            "{field} must not be negative"
        )));
    }
    Ok(value)
}

/// Parse a caller-supplied remaining time given as text.
///
/// Unlike the legacy import path this never substitutes a default: text that
/// is not a finite, non-negative number is a validation error.
pub fn parse_remaining(raw: &str, field: &str) -> Result<f64, CoreError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{field} must be a number")))?;
    validate_remaining(value, field)
}

/// Validate an elapsed-time observation from a client poller.
pub fn validate_elapsed(elapsed_secs: f64) -> Result<f64, CoreError> {
    if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
        return Err(CoreError::Validation(
            "elapsed_secs must be a non-negative number".to_string(),
        ));
    }
    Ok(elapsed_secs)
}

// ---------------------------------------------------------------------------
// State transitions
// ---------------------------------------------------------------------------

/// Move a budget toward zero by `elapsed_secs`. Zero is absorbing.
pub fn decay(remaining: f64, elapsed_secs: f64) -> f64 {
    (remaining - elapsed_secs).max(0.0)
}

/// Substitute the budget default for a stored value that is not usable.
///
/// NaN, infinities and negatives can only come from corrupt rows; they are
/// replaced rather than rejected so a bad row never wedges the decay loop.
pub fn heal_remaining(value: f64, budget: Budget) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        budget.default_secs()
    }
}

/// A lock is active once either budget has been exhausted.
pub fn is_locked(remaining: Remaining) -> bool {
    remaining.browse <= 0.0 || remaining.activity <= 0.0
}

/// Activation view of a lock, consumed by clients that gate navigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
}

impl From<Remaining> for LockStatus {
    fn from(remaining: Remaining) -> Self {
        Self {
            locked: is_locked(remaining),
            browse_time_remaining: remaining.browse,
            activity_time_remaining: remaining.activity,
        }
    }
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// An I/O action requested by a state transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockEffect {
    /// Write both budgets of `lock_id` to the store.
    Persist {
        lock_id: DbId,
        browse: f64,
        activity: f64,
    },
}

/// Result of planning one decay step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPlan {
    /// Budgets after the step, whether or not they get persisted.
    pub next: Remaining,
    /// `None` when the decayed budget did not change.
    pub effect: Option<LockEffect>,
}

/// Plan a decay of `budget` by `elapsed_secs` from the last observed values.
///
/// The other budget is carried through unchanged. A persist effect is
/// emitted when the decayed value differs from the observed one, or when
/// `unsaved` says the observed values themselves never reached the store.
pub fn plan_decay(
    lock_id: DbId,
    observed: Remaining,
    unsaved: bool,
    budget: Budget,
    elapsed_secs: f64,
) -> DecayPlan {
    let before = observed.get(budget);
    let after = decay(heal_remaining(before, budget), elapsed_secs);
    let next = observed.with(budget, after);

    // NaN never compares equal, so a healed value is always written back.
    let effect = (unsaved || after != before).then_some(LockEffect::Persist {
        lock_id,
        browse: next.browse,
        activity: next.activity,
    });

    DecayPlan { next, effect }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- decay --

    #[test]
    fn decay_subtracts_elapsed() {
        assert_eq!(decay(3600.0, 100.0), 3500.0);
    }

    #[test]
    fn decay_clamps_at_zero() {
        assert_eq!(decay(100.0, 5000.0), 0.0);
    }

    #[test]
    fn decay_zero_is_absorbing() {
        assert_eq!(decay(0.0, 10.0), 0.0);
        assert_eq!(decay(0.0, 0.0), 0.0);
    }

    #[test]
    fn decay_is_monotonic_across_steps() {
        let after_first = decay(1000.0, 30.0);
        let after_both = decay(after_first, 45.0);
        assert!(after_both <= after_first);
    }

    // -- heal_remaining --

    #[test]
    fn heal_keeps_valid_values() {
        assert_eq!(heal_remaining(12.5, Budget::Browse), 12.5);
        assert_eq!(heal_remaining(0.0, Budget::Activity), 0.0);
    }

    #[test]
    fn heal_replaces_nan_with_budget_default() {
        assert_eq!(heal_remaining(f64::NAN, Budget::Browse), 3600.0);
        assert_eq!(heal_remaining(f64::NAN, Budget::Activity), 1200.0);
    }

    #[test]
    fn heal_replaces_negative_and_infinite() {
        assert_eq!(heal_remaining(-1.0, Budget::Browse), 3600.0);
        assert_eq!(heal_remaining(f64::INFINITY, Budget::Browse), 3600.0);
    }

    // -- plan_decay --

    #[test]
    fn plan_emits_persist_when_value_changes() {
        let plan = plan_decay(7, Remaining::defaults(), false, Budget::Browse, 100.0);
        assert_eq!(plan.next, Remaining::new(3500.0, 1200.0));
        assert_eq!(
            plan.effect,
            Some(LockEffect::Persist {
                lock_id: 7,
                browse: 3500.0,
                activity: 1200.0,
            })
        );
    }

    #[test]
    fn plan_skips_write_for_zero_elapsed() {
        let plan = plan_decay(7, Remaining::new(3500.0, 1200.0), false, Budget::Browse, 0.0);
        assert_eq!(plan.next.browse, 3500.0);
        assert!(plan.effect.is_none());
    }

    #[test]
    fn plan_skips_write_at_floor() {
        let plan = plan_decay(7, Remaining::new(0.0, 1200.0), false, Budget::Browse, 10.0);
        assert_eq!(plan.next.browse, 0.0);
        assert!(plan.effect.is_none());
    }

    #[test]
    fn plan_retries_unsaved_value_at_floor() {
        let plan = plan_decay(7, Remaining::new(0.0, 1200.0), true, Budget::Browse, 10.0);
        assert_eq!(plan.next.browse, 0.0);
        assert_eq!(
            plan.effect,
            Some(LockEffect::Persist {
                lock_id: 7,
                browse: 0.0,
                activity: 1200.0,
            })
        );
    }

    #[test]
    fn plan_retries_unsaved_value_on_zero_elapsed() {
        let plan = plan_decay(7, Remaining::new(3500.0, 1200.0), true, Budget::Browse, 0.0);
        assert_matches!(plan.effect, Some(LockEffect::Persist { browse, .. }) if browse == 3500.0);
    }

    #[test]
    fn plan_heals_corrupt_browse_value() {
        let plan = plan_decay(7, Remaining::new(f64::NAN, 1200.0), false, Budget::Browse, 10.0);
        assert_eq!(plan.next.browse, 3590.0);
        assert!(plan.effect.is_some());
    }

    #[test]
    fn plan_activity_leaves_browse_untouched() {
        let plan = plan_decay(7, Remaining::new(50.0, 1200.0), false, Budget::Activity, 200.0);
        assert_eq!(plan.next, Remaining::new(50.0, 1000.0));
        assert_matches!(
            plan.effect,
            Some(LockEffect::Persist { browse, activity, .. }) if browse == 50.0 && activity == 1000.0
        );
    }

    // -- validation --

    #[test]
    fn lock_type_must_not_be_blank() {
        assert_matches!(validate_lock_type("   "), Err(CoreError::Validation(_)));
        assert_matches!(validate_lock_type(""), Err(CoreError::Validation(_)));
        assert!(validate_lock_type("screen").is_ok());
    }

    #[test]
    fn parse_remaining_accepts_numeric_text() {
        assert_eq!(parse_remaining(" 42.5 ", "browse_time_remaining").unwrap(), 42.5);
    }

    #[test]
    fn parse_remaining_rejects_non_numeric_text() {
        let err = parse_remaining("soon", "browse_time_remaining").unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("browse_time_remaining"));
    }

    #[test]
    fn parse_remaining_rejects_nan_text() {
        assert_matches!(
            parse_remaining("NaN", "activity_time_remaining"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn validate_remaining_rejects_negative() {
        assert_matches!(
            validate_remaining(-5.0, "browse_time_remaining"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn validate_elapsed_bounds() {
        assert!(validate_elapsed(0.0).is_ok());
        assert_matches!(validate_elapsed(-1.0), Err(CoreError::Validation(_)));
        assert_matches!(validate_elapsed(f64::NAN), Err(CoreError::Validation(_)));
    }

    // -- activation --

    #[test]
    fn locked_when_either_budget_exhausted() {
        assert!(!is_locked(Remaining::defaults()));
        assert!(is_locked(Remaining::new(0.0, 10.0)));
        assert!(is_locked(Remaining::new(10.0, 0.0)));
    }

    #[test]
    fn status_reflects_remaining() {
        let status = LockStatus::from(Remaining::new(0.0, 300.0));
        assert!(status.locked);
        assert_eq!(status.activity_time_remaining, 300.0);
    }
}
