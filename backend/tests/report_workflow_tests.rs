//! Report status workflow tests

use proptest::prelude::*;
use shared::types::{ReportStatus, Role};

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_new_reports_start_pending() {
        assert_eq!(ReportStatus::default(), ReportStatus::Pending);
    }

    #[test]
    fn test_every_status_parses_from_its_label() {
        for status in ReportStatus::ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn test_new_accounts_are_plain_users() {
        assert_eq!(Role::default(), Role::User);
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
    }
}

proptest! {
    /// Anything outside the three workflow labels is rejected
    #[test]
    fn prop_unknown_status_labels_rejected(label in "\\PC{0,20}") {
        let known = ReportStatus::ALL.iter().any(|s| s.as_str() == label);
        prop_assert_eq!(label.parse::<ReportStatus>().is_ok(), known);
    }
}
