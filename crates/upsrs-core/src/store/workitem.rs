//! The work item store.

use std::collections::HashMap;

use parking_lot::RwLock;
use upsrs_dicom::{matching, Dataset};

use crate::error::Error;
use crate::model::WorkItem;

/// In-memory map from work item UID to record.
///
/// An interface-compatible persistent implementation can replace this
/// without touching the services.
#[derive(Default)]
pub struct WorkItemStore {
    items: RwLock<HashMap<String, WorkItem>>,
}

impl WorkItemStore {
    /// An empty store.
    pub fn new() -> Self {
        WorkItemStore::default()
    }

    /// Insert a new work item.
    pub fn create(&self, workitem: WorkItem) -> Result<WorkItem, Error> {
        let mut items = self.items.write();
        if items.contains_key(&workitem.uid) {
            return Err(Error::Duplicate(workitem.uid.clone()));
        }
        items.insert(workitem.uid.clone(), workitem.clone());
        Ok(workitem)
    }

    /// Look up a work item by UID, returning a deep copy.
    pub fn get(&self, uid: &str) -> Option<WorkItem> {
        self.items.read().get(uid).cloned()
    }

    /// Whether a work item exists.
    pub fn contains(&self, uid: &str) -> bool {
        self.items.read().contains_key(uid)
    }

    /// Mutate a work item under the write lock.
    ///
    /// The closure runs with exclusive access, which serializes writers
    /// per item; an `Err` from the closure leaves the record untouched.
    pub fn update<F>(&self, uid: &str, mutate: F) -> Result<WorkItem, Error>
    where
        F: FnOnce(&mut WorkItem) -> Result<(), Error>,
    {
        let mut items = self.items.write();
        let item = items.get_mut(uid).ok_or_else(|| Error::NotFound(uid.to_string()))?;
        let mut candidate = item.clone();
        mutate(&mut candidate)?;
        *item = candidate.clone();
        Ok(candidate)
    }

    /// Merge a partial dataset into a work item.
    pub fn update_merge(&self, uid: &str, partial: &Dataset) -> Result<WorkItem, Error> {
        self.update(uid, |item| {
            item.apply_update(partial);
            Ok(())
        })
    }

    /// Delete a work item. Unused by the request surface; kept for
    /// store parity with persistent backends.
    pub fn delete(&self, uid: &str) -> bool {
        self.items.write().remove(uid).is_some()
    }

    /// Deep-copy snapshot of every work item, ordered by UID.
    pub fn list_all(&self) -> Vec<WorkItem> {
        let items = self.items.read();
        let mut all: Vec<WorkItem> = items.values().cloned().collect();
        all.sort_by(|a, b| a.uid.cmp(&b.uid));
        all
    }

    /// Matching work items, projected and paginated.
    ///
    /// `include_fields` of `["all"]` (or empty) keeps every attribute.
    /// Ordering is by UID, stable within a call.
    pub fn list_filtered(
        &self,
        query: &Dataset,
        include_fields: &[String],
        offset: usize,
        limit: Option<usize>,
    ) -> Vec<WorkItem> {
        let mut matched: Vec<WorkItem> = {
            let items = self.items.read();
            items
                .values()
                .filter(|item| matching::matches(query, &item.dataset))
                .cloned()
                .collect()
        };
        matched.sort_by(|a, b| a.uid.cmp(&b.uid));

        matched
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|mut item| {
                if !include_fields.is_empty() {
                    item.dataset.retain_fields(include_fields);
                }
                item
            })
            .collect()
    }

    /// Number of stored work items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcedureStepState;
    use upsrs_dicom::{tags, Vr};

    fn workitem(uid: &str) -> WorkItem {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, uid);
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        WorkItem::new(ds).unwrap()
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let store = WorkItemStore::new();
        store.create(workitem("1.2.3.4")).unwrap();
        assert!(matches!(
            store.create(workitem("1.2.3.4")),
            Err(Error::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_returns_copy() {
        let store = WorkItemStore::new();
        store.create(workitem("1.2.3.4")).unwrap();

        let mut copy = store.get("1.2.3.4").unwrap();
        copy.dataset.set_str(tags::WORKLIST_LABEL, Vr::LO, "LOCAL");

        // Mutating the copy does not touch the stored record.
        assert!(!store.get("1.2.3.4").unwrap().dataset.contains(tags::WORKLIST_LABEL));
    }

    #[test]
    fn test_update_failure_leaves_record_untouched() {
        let store = WorkItemStore::new();
        store.create(workitem("1.2.3.4")).unwrap();

        let result: Result<WorkItem, Error> = store.update("1.2.3.4", |item| {
            item.set_state(ProcedureStepState::Canceled);
            Err(Error::TransactionUidMissing)
        });
        assert!(result.is_err());
        assert_eq!(store.get("1.2.3.4").unwrap().state(), ProcedureStepState::Scheduled);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = WorkItemStore::new();
        assert!(matches!(
            store.update_merge("9.9.9", &Dataset::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_filtered_projects_and_paginates() {
        let store = WorkItemStore::new();
        for uid in ["1.2.3.1", "1.2.3.2", "1.2.3.3"] {
            let mut item = workitem(uid);
            item.dataset.set_str(tags::WORKLIST_LABEL, Vr::LO, "LIST-A");
            store.create(item).unwrap();
        }

        let mut query = Dataset::new();
        query.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");

        let all = store.list_filtered(&query, &["all".to_string()], 0, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].uid, "1.2.3.1");

        let page = store.list_filtered(&query, &["all".to_string()], 1, Some(1));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].uid, "1.2.3.2");

        let projected =
            store.list_filtered(&query, &["ProcedureStepState".to_string()], 0, None);
        assert!(projected[0].dataset.contains(tags::SOP_INSTANCE_UID));
        assert!(!projected[0].dataset.contains(tags::WORKLIST_LABEL));
    }

    #[test]
    fn test_list_filtered_no_match() {
        let store = WorkItemStore::new();
        store.create(workitem("1.2.3.4")).unwrap();

        let mut query = Dataset::new();
        query.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "COMPLETED");
        assert!(store.list_filtered(&query, &[], 0, None).is_empty());
    }
}
