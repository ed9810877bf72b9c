//! Work item lifecycle: create, update, state transitions, cancellation.

use std::sync::Arc;

use upsrs_dicom::{tags, Dataset};

use crate::error::Error;
use crate::model::{ProcedureStepState, WorkItem};
use crate::notifier::Notifier;
use crate::store::WorkItemStore;

/// Result of a merge update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The updated work item.
    pub workitem: WorkItem,
    /// Whether a state tag was stripped from the request payload.
    pub state_tag_stripped: bool,
}

/// Result of a cancellation request.
#[derive(Debug)]
pub enum CancelOutcome {
    /// The work item was SCHEDULED and is now CANCELED.
    Canceled(WorkItem),
    /// The work item is IN PROGRESS; the performer was asked to cancel.
    CancelRequested(WorkItem),
}

/// Owns all work item mutations. Every committed mutation hands its
/// event to the notifier after the store write; fan-out failures never
/// undo the commit.
pub struct WorkItemService {
    store: Arc<WorkItemStore>,
    notifier: Arc<Notifier>,
}

impl WorkItemService {
    /// Wire the service over its store and the notifier.
    pub fn new(store: Arc<WorkItemStore>, notifier: Arc<Notifier>) -> Self {
        WorkItemService { store, notifier }
    }

    /// The backing store, for read paths.
    pub fn store(&self) -> &Arc<WorkItemStore> {
        &self.store
    }

    /// Create a work item from an incoming dataset.
    pub fn create(&self, dataset: Dataset) -> Result<WorkItem, Error> {
        let workitem = WorkItem::new(dataset)?;
        let created = self.store.create(workitem)?;
        tracing::info!(uid = %created.uid, "workitem created");
        self.notify_creation(&created);
        Ok(created)
    }

    /// Look up a work item.
    pub fn get(&self, uid: &str) -> Option<WorkItem> {
        self.store.get(uid)
    }

    /// Merge-update a work item.
    ///
    /// The state tag may only change through [`Self::change_state`]; if
    /// present in the payload it is stripped and reported back. Identity
    /// and lock tags are silently protected. Once an item has left
    /// SCHEDULED, updates must present the stored transaction UID.
    pub fn update(
        &self,
        uid: &str,
        mut partial: Dataset,
        transaction_uid: Option<&str>,
    ) -> Result<UpdateOutcome, Error> {
        let state_tag_stripped = partial.remove(tags::PROCEDURE_STEP_STATE).is_some();
        partial.remove(tags::SOP_INSTANCE_UID);
        partial.remove(tags::TRANSACTION_UID);

        let workitem = self.store.update(uid, |item| {
            check_transaction_uid(item, transaction_uid)?;
            item.apply_update(&partial);
            Ok(())
        })?;

        tracing::debug!(uid = %workitem.uid, "workitem updated");
        Ok(UpdateOutcome { workitem, state_tag_stripped })
    }

    /// Drive the state machine.
    ///
    /// SCHEDULED items are claimed with a fresh transaction UID; claimed
    /// items move to COMPLETED or CANCELED only under the stored UID.
    /// Requesting the current terminal state again reports
    /// [`Error::AlreadyInState`]; anything else out of a terminal state
    /// is an illegal transition.
    pub fn change_state(
        &self,
        uid: &str,
        new_state: ProcedureStepState,
        transaction_uid: Option<&str>,
    ) -> Result<WorkItem, Error> {
        let transaction_uid = transaction_uid.filter(|t| !t.is_empty());

        let workitem = self.store.update(uid, |item| {
            let current = item.state();
            if current.is_terminal() {
                if new_state == current {
                    return Err(Error::AlreadyInState { state: current });
                }
                return Err(Error::InvalidTransition { from: current, to: new_state });
            }

            match (current, new_state) {
                (ProcedureStepState::Scheduled, ProcedureStepState::InProgress) => {
                    let token = transaction_uid.ok_or(Error::TransactionUidMissing)?;
                    item.set_transaction_uid(token);
                }
                (
                    ProcedureStepState::InProgress,
                    ProcedureStepState::Completed | ProcedureStepState::Canceled,
                ) => {
                    let token = transaction_uid.ok_or(Error::TransactionUidMissing)?;
                    if item.transaction_uid.as_deref() != Some(token) {
                        return Err(Error::TransactionUidMismatch);
                    }
                }
                (from, to) => {
                    return Err(Error::InvalidTransition { from, to });
                }
            }

            item.set_state(new_state);
            Ok(())
        })?;

        tracing::info!(uid = %workitem.uid, state = %workitem.state(), "workitem state changed");
        self.notify_status_change(&workitem);
        Ok(workitem)
    }

    /// Handle a cancellation request.
    ///
    /// A SCHEDULED item is canceled outright, absorbing the reason and
    /// contact attributes from the request. For an IN PROGRESS item the
    /// decision belongs to the performer: a cancel-request event is
    /// emitted and the state is left alone. Terminal items conflict.
    pub fn cancel(&self, uid: &str, partial: &Dataset) -> Result<CancelOutcome, Error> {
        let mut requested_only = false;
        let mut sanitized = partial.clone();
        sanitized.remove(tags::PROCEDURE_STEP_STATE);
        sanitized.remove(tags::SOP_INSTANCE_UID);
        sanitized.remove(tags::TRANSACTION_UID);

        let workitem = self.store.update(uid, |item| match item.state() {
            ProcedureStepState::Scheduled => {
                item.apply_update(&sanitized);
                item.set_state(ProcedureStepState::Canceled);
                Ok(())
            }
            ProcedureStepState::InProgress => {
                requested_only = true;
                Ok(())
            }
            state => Err(Error::StateConflict { state }),
        })?;

        if requested_only {
            tracing::info!(uid = %workitem.uid, "cancellation requested from performer");
            let event = self.notifier.builder().cancel_requested(
                &workitem,
                partial.str_value(tags::REQUESTING_AE).unwrap_or(""),
                partial.str_value(tags::REASON_FOR_CANCELLATION),
                partial.str_value(tags::CONTACT_URI),
                partial.str_value(tags::CONTACT_DISPLAY_NAME),
            );
            self.notifier.dispatch(&event, &workitem);
            Ok(CancelOutcome::CancelRequested(workitem))
        } else {
            tracing::info!(uid = %workitem.uid, "workitem canceled");
            self.notify_status_change(&workitem);
            Ok(CancelOutcome::Canceled(workitem))
        }
    }

    /// Creation emits a state report and an assignment report, in that
    /// order, through the fan-out.
    fn notify_creation(&self, workitem: &WorkItem) {
        let state = self.notifier.builder().state_report(workitem, None);
        self.notifier.dispatch(&state, workitem);

        let assigned = self.notifier.builder().assigned(workitem);
        self.notifier.dispatch(&assigned, workitem);
    }

    /// A committed state change emits a progress report when progress
    /// information is present (and the item is not canceled), otherwise
    /// a state report carrying any recorded cancellation reason.
    fn notify_status_change(&self, workitem: &WorkItem) {
        let has_progress = workitem
            .dataset
            .contains(tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE);

        let event = if has_progress && workitem.state() != ProcedureStepState::Canceled {
            self.notifier.builder().progress_report(workitem)
        } else {
            let reason = workitem.dataset.str_value(tags::REASON_FOR_CANCELLATION);
            self.notifier.builder().state_report(workitem, reason)
        };
        self.notifier.dispatch(&event, workitem);
    }
}

fn check_transaction_uid(item: &WorkItem, supplied: Option<&str>) -> Result<(), Error> {
    let scheduled = item.state() == ProcedureStepState::Scheduled;
    match supplied {
        Some(token) => {
            if !scheduled && item.transaction_uid.as_deref() != Some(token) {
                return Err(Error::TransactionUidMismatch);
            }
            Ok(())
        }
        None if scheduled => Ok(()),
        None => Err(Error::TransactionUidMissing),
    }
}
