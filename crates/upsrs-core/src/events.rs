//! Event report construction.

use std::sync::atomic::{AtomicU32, Ordering};

use upsrs_dicom::{tags, Dataset, Element, Vr};

use crate::model::{WorkItem, UPS_PUSH_SOP_CLASS_UID};

/// Message IDs wrap within [1, 65534].
const MESSAGE_ID_MAX: u32 = 65_534;

/// The five event report shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// State report.
    StateReport = 1,
    /// Cancel requested by another AE.
    CancelRequested = 2,
    /// Progress report.
    ProgressReport = 3,
    /// SCP status change (restart/shutdown announcements).
    ScpStatusChange = 4,
    /// Work item assigned.
    Assigned = 5,
}

impl EventType {
    /// The wire Event Type ID.
    pub fn id(self) -> i64 {
        self as i64
    }
}

/// SCP status announced in a status-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScpStatus {
    /// The SCP restarted.
    Restarted,
    /// The SCP is about to go down.
    GoingDown,
}

impl ScpStatus {
    /// The wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            ScpStatus::Restarted => "RESTARTED",
            ScpStatus::GoingDown => "GOING DOWN",
        }
    }
}

/// Whether state survived a restart, announced in a status-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartStatus {
    /// Subscriptions and the worklist survived.
    WarmStart,
    /// State was lost; subscribers must re-subscribe.
    ColdStart,
}

impl RestartStatus {
    /// The wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            RestartStatus::WarmStart => "WARM START",
            RestartStatus::ColdStart => "COLD START",
        }
    }
}

/// Builds event report datasets with a process-wide monotonic message id.
pub struct EventBuilder {
    last_message_id: AtomicU32,
}

impl EventBuilder {
    /// A builder whose first message id is 1.
    pub fn new() -> Self {
        EventBuilder { last_message_id: AtomicU32::new(0) }
    }

    /// The next message id, wrapping from 65534 back to 1.
    pub fn next_message_id(&self) -> i64 {
        loop {
            let current = self.last_message_id.load(Ordering::Relaxed);
            let next = if current >= MESSAGE_ID_MAX { 1 } else { current + 1 };
            if self
                .last_message_id
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return next as i64;
            }
        }
    }

    fn envelope(
        &self,
        event_type: EventType,
        affected_uid: &str,
        state: &str,
        input_readiness: &str,
    ) -> Dataset {
        let mut event = Dataset::new();
        event.set_uid(tags::AFFECTED_SOP_CLASS_UID, UPS_PUSH_SOP_CLASS_UID);
        event.set_int(tags::MESSAGE_ID, Vr::US, self.next_message_id());
        if affected_uid.is_empty() {
            event.put(tags::AFFECTED_SOP_INSTANCE_UID, Element::empty(Vr::UI));
        } else {
            event.set_uid(tags::AFFECTED_SOP_INSTANCE_UID, affected_uid);
        }
        event.set_int(tags::EVENT_TYPE_ID, Vr::US, event_type.id());
        event.set_str(tags::INPUT_READINESS_STATE, Vr::CS, input_readiness);
        event.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, state);
        event
    }

    /// A state report, with the cancellation reason when one is recorded.
    pub fn state_report(&self, workitem: &WorkItem, reason: Option<&str>) -> Dataset {
        let mut event = self.envelope(
            EventType::StateReport,
            &workitem.uid,
            workitem.state().as_str(),
            workitem.input_readiness(),
        );
        if let Some(reason) = reason {
            event.set_str(tags::REASON_FOR_CANCELLATION, Vr::LT, reason);
        }
        event
    }

    /// A cancel-request report addressed to the performing AE.
    pub fn cancel_requested(
        &self,
        workitem: &WorkItem,
        requesting_ae: &str,
        reason: Option<&str>,
        contact_uri: Option<&str>,
        contact_display_name: Option<&str>,
    ) -> Dataset {
        let mut event = self.envelope(
            EventType::CancelRequested,
            &workitem.uid,
            workitem.state().as_str(),
            workitem.input_readiness(),
        );
        event.set_str(tags::REQUESTING_AE, Vr::AE, requesting_ae);
        if let Some(reason) = reason {
            event.set_str(tags::REASON_FOR_CANCELLATION, Vr::LT, reason);
        }
        if let Some(uri) = contact_uri {
            event.set_str(tags::CONTACT_URI, Vr::UR, uri);
        }
        if let Some(name) = contact_display_name {
            event.set_str(tags::CONTACT_DISPLAY_NAME, Vr::LO, name);
        }
        event
    }

    /// A progress report, copying the work item's progress information
    /// sequence with the progress value clamped to 0..=100.
    pub fn progress_report(&self, workitem: &WorkItem) -> Dataset {
        let mut event = self.envelope(
            EventType::ProgressReport,
            &workitem.uid,
            workitem.state().as_str(),
            workitem.input_readiness(),
        );

        let items: Vec<Dataset> = workitem
            .dataset
            .sequence(tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE)
            .into_iter()
            .map(|item| {
                let mut copy = item.clone();
                if let Some(progress) =
                    copy.get(tags::PROCEDURE_STEP_PROGRESS).and_then(Element::first_float)
                {
                    copy.put(
                        tags::PROCEDURE_STEP_PROGRESS,
                        Element::float(Vr::DS, progress.clamp(0.0, 100.0)),
                    );
                }
                copy
            })
            .collect();
        event.set_sequence(tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE, items);
        event
    }

    /// An SCP status-change report. Carries no affected instance.
    pub fn scp_status_change(&self, scp_status: ScpStatus, restart: RestartStatus) -> Dataset {
        let mut event = Dataset::new();
        event.set_uid(tags::AFFECTED_SOP_CLASS_UID, UPS_PUSH_SOP_CLASS_UID);
        event.set_int(tags::MESSAGE_ID, Vr::US, self.next_message_id());
        event.put(tags::AFFECTED_SOP_INSTANCE_UID, Element::empty(Vr::UI));
        event.set_int(tags::EVENT_TYPE_ID, Vr::US, EventType::ScpStatusChange.id());
        event.set_str(tags::SCP_STATUS, Vr::CS, scp_status.as_str());
        event.set_str(tags::SUBSCRIPTION_LIST_STATUS, Vr::CS, restart.as_str());
        event.set_str(tags::UNIFIED_PROCEDURE_STEP_LIST_STATUS, Vr::CS, restart.as_str());
        event
    }

    /// An assignment report, copying station and performer attributes
    /// from the work item when present.
    pub fn assigned(&self, workitem: &WorkItem) -> Dataset {
        let mut event = self.envelope(
            EventType::Assigned,
            &workitem.uid,
            workitem.state().as_str(),
            workitem.input_readiness(),
        );
        for tag in [
            tags::SCHEDULED_STATION_NAME_CODE_SEQUENCE,
            tags::HUMAN_PERFORMER_CODE_SEQUENCE,
            tags::HUMAN_PERFORMERS_ORGANIZATION,
        ] {
            event.copy_from(&workitem.dataset, tag);
        }
        event
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        EventBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcedureStepState;

    fn workitem(uid: &str) -> WorkItem {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, uid);
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        WorkItem::new(ds).unwrap()
    }

    #[test]
    fn test_message_ids_are_monotonic_and_wrap() {
        let builder = EventBuilder::new();
        assert_eq!(builder.next_message_id(), 1);
        assert_eq!(builder.next_message_id(), 2);

        builder.last_message_id.store(MESSAGE_ID_MAX - 1, Ordering::Relaxed);
        assert_eq!(builder.next_message_id(), MESSAGE_ID_MAX as i64);
        assert_eq!(builder.next_message_id(), 1);
    }

    #[test]
    fn test_state_report_envelope() {
        let builder = EventBuilder::new();
        let event = builder.state_report(&workitem("1.2.3.4"), None);

        assert_eq!(
            event.str_value(tags::AFFECTED_SOP_CLASS_UID),
            Some(UPS_PUSH_SOP_CLASS_UID)
        );
        assert_eq!(event.str_value(tags::AFFECTED_SOP_INSTANCE_UID), Some("1.2.3.4"));
        assert_eq!(event.int_value(tags::EVENT_TYPE_ID), Some(1));
        assert_eq!(event.str_value(tags::PROCEDURE_STEP_STATE), Some("SCHEDULED"));
        assert_eq!(event.int_value(tags::MESSAGE_ID), Some(1));
        assert!(!event.contains(tags::REASON_FOR_CANCELLATION));
    }

    #[test]
    fn test_state_report_carries_cancellation_reason() {
        let builder = EventBuilder::new();
        let mut item = workitem("1.2.3.4");
        item.set_state(ProcedureStepState::Canceled);
        let event = builder.state_report(&item, Some("patient unavailable"));
        assert_eq!(
            event.str_value(tags::REASON_FOR_CANCELLATION),
            Some("patient unavailable")
        );
        assert_eq!(event.str_value(tags::PROCEDURE_STEP_STATE), Some("CANCELED"));
    }

    #[test]
    fn test_progress_is_clamped() {
        let builder = EventBuilder::new();
        let mut item = workitem("1.2.3.4");
        let mut info = Dataset::new();
        info.put(tags::PROCEDURE_STEP_PROGRESS, Element::float(Vr::DS, 250.0));
        info.set_str(tags::PROCEDURE_STEP_PROGRESS_DESCRIPTION, Vr::ST, "beam on");
        item.dataset
            .set_sequence(tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE, vec![info]);

        let event = builder.progress_report(&item);
        let items = event.sequence(tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].get(tags::PROCEDURE_STEP_PROGRESS).and_then(Element::first_float),
            Some(100.0)
        );
        assert_eq!(
            items[0].str_value(tags::PROCEDURE_STEP_PROGRESS_DESCRIPTION),
            Some("beam on")
        );
    }

    #[test]
    fn test_scp_status_change_has_empty_instance_uid() {
        let builder = EventBuilder::new();
        let event = builder.scp_status_change(ScpStatus::Restarted, RestartStatus::ColdStart);

        assert!(event.get(tags::AFFECTED_SOP_INSTANCE_UID).unwrap().is_empty());
        assert_eq!(event.int_value(tags::EVENT_TYPE_ID), Some(4));
        assert_eq!(event.str_value(tags::SCP_STATUS), Some("RESTARTED"));
        assert_eq!(event.str_value(tags::SUBSCRIPTION_LIST_STATUS), Some("COLD START"));
    }

    #[test]
    fn test_assigned_copies_station_attributes() {
        let builder = EventBuilder::new();
        let mut item = workitem("1.2.3.4");
        let mut station = Dataset::new();
        station.set_str(tags::CODE_VALUE, Vr::SH, "TRTMACHINE1");
        item.dataset
            .set_sequence(tags::SCHEDULED_STATION_NAME_CODE_SEQUENCE, vec![station]);

        let event = builder.assigned(&item);
        assert_eq!(event.int_value(tags::EVENT_TYPE_ID), Some(5));
        assert_eq!(
            event.sequence(tags::SCHEDULED_STATION_NAME_CODE_SEQUENCE).len(),
            1
        );
        // Attributes the work item lacks are simply absent.
        assert!(!event.contains(tags::HUMAN_PERFORMER_CODE_SEQUENCE));
    }
}
