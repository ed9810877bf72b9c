//! The fixed warning vocabulary.
//!
//! Anomalous-but-accepted responses and state-machine rejections carry
//! `Warning: 299 <service-uri>: <text>` headers drawn from this set.

use upsrs_core::ProcedureStepState;

/// A merge update had its state tag stripped.
pub const UPDATED_WITH_MODIFICATIONS: &str = "The Workitem was updated with modifications";

/// The target work item has not been claimed.
pub const NOT_CLAIMED: &str = "The target URI did not reference a claimed Workitem";

/// The request does not fit the work item's current state.
pub const INCONSISTENT_WITH_WORKITEM_STATE: &str =
    "The submitted request is inconsistent with the current state of the Workitem";

/// A required transaction UID was absent.
pub const TRANSACTION_UID_MISSING: &str = "The Transaction UID is missing";

/// The supplied transaction UID did not match the stored one.
pub const TRANSACTION_UID_INCORRECT: &str = "The Transaction UID is incorrect";

/// The request does not fit the UPS instance's state machine.
pub const INCONSISTENT_WITH_UPS_STATE: &str =
    "The submitted request is inconsistent with the state of the UPS Instance";

/// The idempotent terminal-state repeat message.
pub fn already_in_state(state: ProcedureStepState) -> String {
    format!("The Workitem is already in the requested state of {state}")
}

/// Render one `Warning` header value.
pub fn warning_value(service_uri: &str, text: &str) -> String {
    format!("299 {service_uri}: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_value_shape() {
        let value = warning_value("http://pacs.example.com", TRANSACTION_UID_MISSING);
        assert_eq!(
            value,
            "299 http://pacs.example.com: The Transaction UID is missing"
        );
    }

    #[test]
    fn test_already_in_state_vocabulary() {
        assert_eq!(
            already_in_state(ProcedureStepState::Completed),
            "The Workitem is already in the requested state of COMPLETED"
        );
        assert_eq!(
            already_in_state(ProcedureStepState::Canceled),
            "The Workitem is already in the requested state of CANCELED"
        );
    }
}
