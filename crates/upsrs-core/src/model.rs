//! Domain models: work items and subscriptions.

use chrono::{DateTime, Utc};
use std::fmt;

use upsrs_dicom::{is_valid_uid, tags, Dataset, Vr};

use crate::error::Error;

/// Well-known UID designating a global subscription target.
pub const GLOBAL_SUBSCRIPTION_UID: &str = "1.2.840.10008.5.1.4.34.5";

/// Well-known UID designating a filtered global subscription target.
pub const FILTERED_SUBSCRIPTION_UID: &str = "1.2.840.10008.5.1.4.34.5.1";

/// SOP class carried in every event report envelope.
pub const UPS_PUSH_SOP_CLASS_UID: &str = "1.2.840.10008.5.1.4.34.6.1";

/// Default input readiness when the creating client supplies none.
pub const DEFAULT_INPUT_READINESS: &str = "READY";

/// The procedure step state machine.
///
/// ```text
///   SCHEDULED ──► IN PROGRESS ──► COMPLETED
///                      │
///                      └────────► CANCELED
/// ```
///
/// `COMPLETED` and `CANCELED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureStepState {
    /// Waiting to be claimed.
    Scheduled,
    /// Claimed by a performer holding the transaction UID.
    InProgress,
    /// Finished successfully. Terminal.
    Completed,
    /// Canceled. Terminal.
    Canceled,
}

impl ProcedureStepState {
    /// The wire string for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureStepState::Scheduled => "SCHEDULED",
            ProcedureStepState::InProgress => "IN PROGRESS",
            ProcedureStepState::Completed => "COMPLETED",
            ProcedureStepState::Canceled => "CANCELED",
        }
    }

    /// Parse a wire string.
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "SCHEDULED" => Ok(ProcedureStepState::Scheduled),
            "IN PROGRESS" => Ok(ProcedureStepState::InProgress),
            "COMPLETED" => Ok(ProcedureStepState::Completed),
            "CANCELED" => Ok(ProcedureStepState::Canceled),
            other => Err(Error::Validation(format!("unknown procedure step state {other:?}"))),
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcedureStepState::Completed | ProcedureStepState::Canceled)
    }
}

impl fmt::Display for ProcedureStepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of scheduled procedural work.
///
/// The attribute payload lives in `dataset`; the state and transaction
/// UID are mirrored there so the dataset stays the wire truth.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// The SOP Instance UID. Immutable after creation.
    pub uid: String,
    /// The attribute payload.
    pub dataset: Dataset,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Lock token, set when the item is first claimed.
    pub transaction_uid: Option<String>,
}

impl WorkItem {
    /// Build a work item from an incoming dataset.
    ///
    /// The dataset must carry a valid SOP Instance UID. New items must be
    /// SCHEDULED; a missing state is defaulted, as is input readiness.
    pub fn new(mut dataset: Dataset) -> Result<Self, Error> {
        let uid = dataset
            .str_value(tags::SOP_INSTANCE_UID)
            .ok_or_else(|| Error::Validation("missing SOP Instance UID".to_string()))?
            .to_string();
        if !is_valid_uid(&uid) {
            return Err(Error::Validation(format!("invalid SOP Instance UID {uid:?}")));
        }

        match dataset.str_value(tags::PROCEDURE_STEP_STATE).map(str::to_string) {
            None => dataset.set_str(
                tags::PROCEDURE_STEP_STATE,
                Vr::CS,
                ProcedureStepState::Scheduled.as_str(),
            ),
            Some(state) => {
                if ProcedureStepState::parse(&state)? != ProcedureStepState::Scheduled {
                    return Err(Error::Validation(format!(
                        "new workitems must be SCHEDULED, not {state:?}"
                    )));
                }
            }
        }

        if !dataset.contains(tags::INPUT_READINESS_STATE) {
            dataset.set_str(tags::INPUT_READINESS_STATE, Vr::CS, DEFAULT_INPUT_READINESS);
        }

        let now = Utc::now();
        Ok(WorkItem {
            uid,
            dataset,
            created_at: now,
            updated_at: now,
            transaction_uid: None,
        })
    }

    /// The current procedure step state.
    pub fn state(&self) -> ProcedureStepState {
        self.dataset
            .str_value(tags::PROCEDURE_STEP_STATE)
            .and_then(|s| ProcedureStepState::parse(s).ok())
            .unwrap_or(ProcedureStepState::Scheduled)
    }

    /// Transition to a new state and stamp `updated_at`.
    ///
    /// The caller is responsible for having checked legality.
    pub fn set_state(&mut self, state: ProcedureStepState) {
        self.dataset.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, state.as_str());
        self.touch();
    }

    /// The stored input readiness state.
    pub fn input_readiness(&self) -> &str {
        self.dataset
            .str_value(tags::INPUT_READINESS_STATE)
            .unwrap_or(DEFAULT_INPUT_READINESS)
    }

    /// Record the lock token, mirroring it into the dataset.
    pub fn set_transaction_uid(&mut self, transaction_uid: &str) {
        self.transaction_uid = Some(transaction_uid.to_string());
        self.dataset.set_uid(tags::TRANSACTION_UID, transaction_uid);
    }

    /// Merge an update into the payload and stamp `updated_at`.
    pub fn apply_update(&mut self, partial: &Dataset) {
        self.dataset.merge(partial);
        self.touch();
    }

    /// Stamp `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A durable registration of interest in a target.
///
/// The target is a concrete work item UID or one of the reserved
/// global/filtered UIDs. Identity is (target, subscriber); the record is
/// immutable — suspension is modeled as replacement.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// The target UID (concrete, global, or filtered).
    pub workitem_uid: String,
    /// The subscriber's AE title.
    pub ae_title: String,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
    /// Whether deletion of covered items is locked for this subscriber.
    pub deletion_lock: bool,
    /// Optional contact URI supplied at subscribe time.
    pub contact_uri: Option<String>,
    /// The matching filter. Present iff the target is the filtered UID.
    pub filter: Option<Dataset>,
    /// Whether the subscription is suspended.
    pub suspended: bool,
}

impl Subscription {
    /// A fresh, unsuspended subscription with defaults.
    pub fn new(workitem_uid: impl Into<String>, ae_title: impl Into<String>) -> Self {
        Subscription {
            workitem_uid: workitem_uid.into(),
            ae_title: ae_title.into(),
            created_at: Utc::now(),
            deletion_lock: false,
            contact_uri: None,
            filter: None,
            suspended: false,
        }
    }

    /// Set the deletion lock.
    pub fn with_deletion_lock(mut self, deletion_lock: bool) -> Self {
        self.deletion_lock = deletion_lock;
        self
    }

    /// Attach a filter.
    pub fn with_filter(mut self, filter: Dataset) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The suspended replacement for this subscription.
    pub fn as_suspended(&self) -> Self {
        let mut replacement = self.clone();
        replacement.suspended = true;
        replacement
    }

    /// Whether the target is the global reserved UID.
    pub fn is_global(&self) -> bool {
        self.workitem_uid == GLOBAL_SUBSCRIPTION_UID
    }

    /// Whether the target is the filtered reserved UID.
    pub fn is_filtered(&self) -> bool {
        self.workitem_uid == FILTERED_SUBSCRIPTION_UID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled_dataset(uid: &str) -> Dataset {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, uid);
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        ds
    }

    #[test]
    fn test_state_parse_roundtrip() {
        for state in [
            ProcedureStepState::Scheduled,
            ProcedureStepState::InProgress,
            ProcedureStepState::Completed,
            ProcedureStepState::Canceled,
        ] {
            assert_eq!(ProcedureStepState::parse(state.as_str()).unwrap(), state);
        }
        assert!(ProcedureStepState::parse("PAUSED").is_err());
    }

    #[test]
    fn test_new_workitem_defaults() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        let item = WorkItem::new(ds).unwrap();

        assert_eq!(item.uid, "1.2.3.4");
        assert_eq!(item.state(), ProcedureStepState::Scheduled);
        assert_eq!(item.input_readiness(), DEFAULT_INPUT_READINESS);
        assert!(item.updated_at >= item.created_at);
    }

    #[test]
    fn test_new_workitem_rejects_non_scheduled() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "IN PROGRESS");
        assert!(matches!(WorkItem::new(ds), Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_workitem_rejects_bad_uid() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1..2");
        assert!(matches!(WorkItem::new(ds), Err(Error::Validation(_))));
        assert!(matches!(WorkItem::new(Dataset::new()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_transaction_uid_mirrored() {
        let mut item = WorkItem::new(scheduled_dataset("1.2.3.4")).unwrap();
        item.set_transaction_uid("1.2.3.4.5");
        assert_eq!(item.transaction_uid.as_deref(), Some("1.2.3.4.5"));
        assert_eq!(item.dataset.str_value(tags::TRANSACTION_UID), Some("1.2.3.4.5"));
    }

    #[test]
    fn test_suspended_replacement() {
        let sub = Subscription::new(GLOBAL_SUBSCRIPTION_UID, "AE1").with_deletion_lock(true);
        let suspended = sub.as_suspended();
        assert!(suspended.suspended);
        assert!(suspended.deletion_lock);
        assert_eq!(suspended.ae_title, "AE1");
        assert!(sub.is_global() && !sub.is_filtered());
    }
}
