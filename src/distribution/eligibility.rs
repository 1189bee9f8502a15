//! Eligibility filtering.
//!
//! Reduces the raw recipient list to the candidates that may receive a
//! transfer right now. Rules are checked in a fixed order and the first one a
//! recipient fails is the reason counted for diagnostics:
//! 1. self-transfer
//! 2. recipient-level disable flag
//! 3. account-level disable flag (settings source)
//! 4. zero declared capacity
//! 5. reserve below the minimum-reserve threshold
//! 6. current hour outside the effective time window

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;

use crate::domain::{Recipient, RecipientSettings};

/// Default minimum reserve a recipient must hold to be eligible.
pub const DEFAULT_MIN_RESERVE: u64 = 50;

/// Why a recipient was left out of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    SelfTransfer,
    RecipientDisabled,
    AccountDisabled,
    ZeroCapacity,
    LowReserve,
    OutsideWindow,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExclusionReason::SelfTransfer => "self",
            ExclusionReason::RecipientDisabled => "recipient disabled",
            ExclusionReason::AccountDisabled => "account disabled",
            ExclusionReason::ZeroCapacity => "zero capacity",
            ExclusionReason::LowReserve => "low reserve",
            ExclusionReason::OutsideWindow => "outside window",
        };
        write!(f, "{}", s)
    }
}

/// Tunables for the filter
#[derive(Debug, Clone)]
pub struct EligibilityParams {
    /// Recipients whose reserve reading is below this are excluded
    pub min_reserve: u64,
    /// Timezone the time windows are expressed in
    pub reference_offset: FixedOffset,
}

impl Default for EligibilityParams {
    fn default() -> Self {
        Self {
            min_reserve: DEFAULT_MIN_RESERVE,
            reference_offset: Utc.fix(),
        }
    }
}

impl EligibilityParams {
    pub fn with_min_reserve(mut self, min_reserve: u64) -> Self {
        self.min_reserve = min_reserve;
        self
    }

    /// Returns None when `hours` is outside -23..=23
    pub fn with_utc_offset_hours(mut self, hours: i32) -> Option<Self> {
        self.reference_offset = FixedOffset::east_opt(hours.checked_mul(3600)?)?;
        Some(self)
    }

    /// Hour of day (0-23) in the reference timezone
    pub fn local_hour(&self, now: DateTime<Utc>) -> u8 {
        now.with_timezone(&self.reference_offset).hour() as u8
    }
}

/// Output of one filter pass
#[derive(Debug, Clone, Default)]
pub struct EligibilityReport {
    /// Candidates that passed every rule, in input order
    pub eligible: Vec<Recipient>,
    /// How many recipients each rule removed
    pub excluded: BTreeMap<ExclusionReason, usize>,
}

impl EligibilityReport {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }

    pub fn excluded_for(&self, reason: ExclusionReason) -> usize {
        self.excluded.get(&reason).copied().unwrap_or(0)
    }
}

/// Return the first rule `recipient` fails, or None if it is eligible.
pub fn exclusion_reason(
    recipient: &Recipient,
    settings: Option<&RecipientSettings>,
    caller_id: &str,
    now: DateTime<Utc>,
    params: &EligibilityParams,
) -> Option<ExclusionReason> {
    if recipient.id == caller_id {
        return Some(ExclusionReason::SelfTransfer);
    }
    if recipient.disabled {
        return Some(ExclusionReason::RecipientDisabled);
    }
    if settings.is_some_and(|s| s.disabled) {
        return Some(ExclusionReason::AccountDisabled);
    }
    if recipient.capacity == 0 {
        return Some(ExclusionReason::ZeroCapacity);
    }
    if recipient.reserve.is_some_and(|r| r < params.min_reserve) {
        return Some(ExclusionReason::LowReserve);
    }

    let window = settings.and_then(|s| s.window).or(recipient.window);
    if let Some(window) = window {
        if !window.contains(params.local_hour(now)) {
            return Some(ExclusionReason::OutsideWindow);
        }
    }

    None
}

/// Filter `recipients` down to the ones eligible at `now`.
pub fn filter_eligible(
    recipients: &[Recipient],
    settings: &HashMap<String, RecipientSettings>,
    caller_id: &str,
    now: DateTime<Utc>,
    params: &EligibilityParams,
) -> EligibilityReport {
    let mut report = EligibilityReport::default();

    for recipient in recipients {
        match exclusion_reason(recipient, settings.get(&recipient.id), caller_id, now, params) {
            None => report.eligible.push(recipient.clone()),
            Some(reason) => {
                log::debug!("Excluding {} ({}): {}", recipient.label, recipient.id, reason);
                *report.excluded.entry(reason).or_insert(0) += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeWindow;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 30, 0).unwrap()
    }

    fn params() -> EligibilityParams {
        EligibilityParams::default()
    }

    #[test]
    fn test_params_default() {
        let p = EligibilityParams::default();
        assert_eq!(p.min_reserve, DEFAULT_MIN_RESERVE);
        assert_eq!(p.local_hour(at_hour(5)), 5);
    }

    #[test]
    fn test_params_utc_offset() {
        let p = EligibilityParams::default().with_utc_offset_hours(9).unwrap();
        assert_eq!(p.local_hour(at_hour(20)), 5);

        let p = EligibilityParams::default().with_utc_offset_hours(-5).unwrap();
        assert_eq!(p.local_hour(at_hour(3)), 22);
    }

    #[test]
    fn test_params_invalid_offset() {
        assert!(EligibilityParams::default().with_utc_offset_hours(30).is_none());
    }

    #[test]
    fn test_all_rules_pass() {
        let r = Recipient::new("alice", "Alice", 10).with_reserve(500);
        assert_eq!(exclusion_reason(&r, None, "me", at_hour(12), &params()), None);
    }

    #[test]
    fn test_self_excluded() {
        let r = Recipient::new("me", "Me", 10);
        assert_eq!(
            exclusion_reason(&r, None, "me", at_hour(12), &params()),
            Some(ExclusionReason::SelfTransfer)
        );
    }

    #[test]
    fn test_recipient_disabled() {
        let r = Recipient::new("bob", "Bob", 10).disabled();
        assert_eq!(
            exclusion_reason(&r, None, "me", at_hour(12), &params()),
            Some(ExclusionReason::RecipientDisabled)
        );
    }

    #[test]
    fn test_account_disabled() {
        let r = Recipient::new("carol", "Carol", 10);
        let s = RecipientSettings::disabled();
        assert_eq!(
            exclusion_reason(&r, Some(&s), "me", at_hour(12), &params()),
            Some(ExclusionReason::AccountDisabled)
        );
    }

    #[test]
    fn test_first_failing_rule_wins() {
        // Disabled at both levels and zero capacity: recipient flag is checked first
        let r = Recipient::new("dan", "Dan", 0).disabled();
        let s = RecipientSettings::disabled();
        assert_eq!(
            exclusion_reason(&r, Some(&s), "me", at_hour(12), &params()),
            Some(ExclusionReason::RecipientDisabled)
        );
    }

    #[test]
    fn test_zero_capacity() {
        let r = Recipient::new("eve", "Eve", 0);
        assert_eq!(
            exclusion_reason(&r, None, "me", at_hour(12), &params()),
            Some(ExclusionReason::ZeroCapacity)
        );
    }

    #[test]
    fn test_low_reserve() {
        let p = params().with_min_reserve(100);
        let low = Recipient::new("f", "Frank", 10).with_reserve(99);
        let ok = Recipient::new("g", "Grace", 10).with_reserve(100);
        let unknown = Recipient::new("h", "Heidi", 10);
        assert_eq!(
            exclusion_reason(&low, None, "me", at_hour(12), &p),
            Some(ExclusionReason::LowReserve)
        );
        assert_eq!(exclusion_reason(&ok, None, "me", at_hour(12), &p), None);
        assert_eq!(exclusion_reason(&unknown, None, "me", at_hour(12), &p), None);
    }

    #[test]
    fn test_recipient_window() {
        let r = Recipient::new("i", "Ivan", 10).with_window(TimeWindow::new(22, 6));
        assert_eq!(exclusion_reason(&r, None, "me", at_hour(23), &params()), None);
        assert_eq!(exclusion_reason(&r, None, "me", at_hour(2), &params()), None);
        assert_eq!(
            exclusion_reason(&r, None, "me", at_hour(12), &params()),
            Some(ExclusionReason::OutsideWindow)
        );
    }

    #[test]
    fn test_settings_window_overrides_recipient_window() {
        let r = Recipient::new("j", "Judy", 10).with_window(TimeWindow::new(0, 6));
        let s = RecipientSettings::with_window(TimeWindow::new(12, 18));
        assert_eq!(exclusion_reason(&r, Some(&s), "me", at_hour(13), &params()), None);
        assert_eq!(
            exclusion_reason(&r, Some(&s), "me", at_hour(3), &params()),
            Some(ExclusionReason::OutsideWindow)
        );
    }

    #[test]
    fn test_window_uses_reference_timezone() {
        let p = params().with_utc_offset_hours(9).unwrap();
        let r = Recipient::new("k", "Ken", 10).with_window(TimeWindow::new(8, 12));
        // 01:30 UTC is 10:30 at +09:00
        assert_eq!(exclusion_reason(&r, None, "me", at_hour(1), &p), None);
        assert_eq!(
            exclusion_reason(&r, None, "me", at_hour(10), &p),
            Some(ExclusionReason::OutsideWindow)
        );
    }

    #[test]
    fn test_filter_counts_and_preserves_order() {
        let recipients = vec![
            Recipient::new("me", "Me", 10),
            Recipient::new("alice", "Alice", 3),
            Recipient::new("bob", "Bob", 0),
            Recipient::new("carol", "Carol", 8),
            Recipient::new("dave", "Dave", 9),
        ];
        let mut settings = HashMap::new();
        settings.insert("carol".to_string(), RecipientSettings::disabled());

        let report = filter_eligible(&recipients, &settings, "me", at_hour(12), &params());

        let ids: Vec<&str> = report.eligible.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "dave"]);
        assert_eq!(report.excluded_for(ExclusionReason::SelfTransfer), 1);
        assert_eq!(report.excluded_for(ExclusionReason::ZeroCapacity), 1);
        assert_eq!(report.excluded_for(ExclusionReason::AccountDisabled), 1);
        assert_eq!(report.excluded_for(ExclusionReason::LowReserve), 0);
        assert_eq!(report.excluded_total(), 3);
    }

    #[test]
    fn test_filter_is_repeatable() {
        let recipients = vec![Recipient::new("a", "A", 1), Recipient::new("b", "B", 2)];
        let settings = HashMap::new();
        let first = filter_eligible(&recipients, &settings, "me", at_hour(12), &params());
        let second = filter_eligible(&recipients, &settings, "me", at_hour(12), &params());
        assert_eq!(first.eligible, second.eligible);
        assert_eq!(first.excluded, second.excluded);
    }

    #[test]
    fn test_exclusion_reason_display() {
        assert_eq!(ExclusionReason::AccountDisabled.to_string(), "account disabled");
        assert_eq!(ExclusionReason::OutsideWindow.to_string(), "outside window");
    }
}
