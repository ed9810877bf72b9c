//! Attribute datasets.

use std::collections::BTreeMap;

use crate::tag::{keyword_for_tag, tags, Tag};
use crate::value::{Element, PersonName};
use crate::vr::Vr;

/// An attribute dataset: an ordered map from tag to element.
///
/// Tag order (ascending) gives deterministic serialization, which is what
/// the wire format expects anyway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    elements: BTreeMap<Tag, Element>,
}

impl Dataset {
    /// An empty dataset.
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the dataset has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element.
    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    /// Whether a tag is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    /// Insert or replace an element.
    pub fn put(&mut self, tag: Tag, element: Element) {
        self.elements.insert(tag, element);
    }

    /// Remove an element, returning it if present.
    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        self.elements.remove(&tag)
    }

    /// Iterate elements in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Element)> {
        self.elements.iter().map(|(t, e)| (*t, e))
    }

    /// The first string value of a tag, if present.
    ///
    /// Person names yield their alphabetic group.
    pub fn str_value(&self, tag: Tag) -> Option<&str> {
        self.get(tag).and_then(Element::first_str)
    }

    /// The first integer value of a tag, if present.
    pub fn int_value(&self, tag: Tag) -> Option<i64> {
        self.get(tag).and_then(Element::first_int)
    }

    /// The sequence items of a tag; empty when absent or not a sequence.
    pub fn sequence(&self, tag: Tag) -> Vec<&Dataset> {
        self.get(tag).map(|e| e.items().collect()).unwrap_or_default()
    }

    /// Set a single-string element.
    pub fn set_str(&mut self, tag: Tag, vr: Vr, value: impl Into<String>) {
        self.put(tag, Element::str(vr, value));
    }

    /// Set a UID-valued element.
    pub fn set_uid(&mut self, tag: Tag, value: impl Into<String>) {
        self.set_str(tag, Vr::UI, value);
    }

    /// Set a single-integer element.
    pub fn set_int(&mut self, tag: Tag, vr: Vr, value: i64) {
        self.put(tag, Element::int(vr, value));
    }

    /// Set a person-name element.
    pub fn set_person(&mut self, tag: Tag, name: PersonName) {
        self.put(tag, Element::person(name));
    }

    /// Set a sequence element.
    pub fn set_sequence(&mut self, tag: Tag, items: impl IntoIterator<Item = Dataset>) {
        self.put(tag, Element::sequence(items));
    }

    /// Merge another dataset into this one.
    ///
    /// Incoming elements override per tag; tags absent from `other` are
    /// left untouched. Sequences are replaced whole, not spliced.
    pub fn merge(&mut self, other: &Dataset) {
        for (tag, element) in other.iter() {
            self.elements.insert(tag, element.clone());
        }
    }

    /// Copy an element from `source` when it is present there.
    pub fn copy_from(&mut self, source: &Dataset, tag: Tag) {
        if let Some(element) = source.get(tag) {
            self.elements.insert(tag, element.clone());
        }
    }

    /// Project the dataset onto a set of include-field keywords.
    ///
    /// Identity tags (SOP Class UID, SOP Instance UID) are always kept.
    /// The single keyword `all` keeps everything.
    pub fn retain_fields(&mut self, keywords: &[String]) {
        if keywords.iter().any(|k| k == "all") {
            return;
        }
        self.elements.retain(|tag, _| {
            if *tag == tags::SOP_CLASS_UID || *tag == tags::SOP_INSTANCE_UID {
                return true;
            }
            match keyword_for_tag(*tag) {
                Some(keyword) => keywords.iter().any(|k| k == keyword),
                None => keywords.iter().any(|k| k == &tag.to_string()),
            }
        });
    }
}

impl FromIterator<(Tag, Element)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (Tag, Element)>>(iter: I) -> Self {
        Dataset { elements: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = (&'a Tag, &'a Element);
    type IntoIter = std::collections::btree_map::Iter<'a, Tag, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_get_set_roundtrip() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");

        assert_eq!(ds.str_value(tags::SOP_INSTANCE_UID), Some("1.2.3.4"));
        assert_eq!(ds.str_value(tags::PROCEDURE_STEP_STATE), Some("SCHEDULED"));
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_merge_overrides_per_tag() {
        let mut base = Dataset::new();
        base.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        base.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        base.set_str(tags::WORKLIST_LABEL, Vr::LO, "LIST-A");

        let mut incoming = Dataset::new();
        incoming.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "IN PROGRESS");

        base.merge(&incoming);

        // Overridden tag takes the incoming value; absent tags survive.
        assert_eq!(base.str_value(tags::PROCEDURE_STEP_STATE), Some("IN PROGRESS"));
        assert_eq!(base.str_value(tags::WORKLIST_LABEL), Some("LIST-A"));
        assert_eq!(base.str_value(tags::SOP_INSTANCE_UID), Some("1.2.3.4"));
    }

    #[test]
    fn test_retain_fields_keeps_identity() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        ds.set_str(tags::WORKLIST_LABEL, Vr::LO, "LIST-A");

        ds.retain_fields(&["ProcedureStepState".to_string()]);

        assert!(ds.contains(tags::SOP_INSTANCE_UID));
        assert!(ds.contains(tags::PROCEDURE_STEP_STATE));
        assert!(!ds.contains(tags::WORKLIST_LABEL));
    }

    #[test]
    fn test_retain_fields_all_keeps_everything() {
        let mut ds = Dataset::new();
        ds.set_uid(tags::SOP_INSTANCE_UID, "1.2.3.4");
        ds.set_str(tags::WORKLIST_LABEL, Vr::LO, "LIST-A");

        ds.retain_fields(&["all".to_string()]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_sequence_access() {
        let mut item = Dataset::new();
        item.set_str(tags::CODE_VALUE, Vr::SH, "121726");

        let mut ds = Dataset::new();
        ds.set_sequence(tags::SCHEDULED_WORKITEM_CODE_SEQUENCE, vec![item]);

        let items = ds.sequence(tags::SCHEDULED_WORKITEM_CODE_SEQUENCE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].str_value(tags::CODE_VALUE), Some("121726"));

        // A non-sequence element yields no items.
        ds.set_str(tags::PROCEDURE_STEP_STATE, Vr::CS, "SCHEDULED");
        assert!(ds.sequence(tags::PROCEDURE_STEP_STATE).is_empty());
        assert!(matches!(
            ds.get(tags::PROCEDURE_STEP_STATE).unwrap().first(),
            Some(Value::Str(_))
        ));
    }
}
