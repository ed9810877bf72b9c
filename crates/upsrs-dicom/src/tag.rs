//! DICOM tags and the attribute dictionary used by the worklist service.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::vr::Vr;

/// A DICOM tag: group and element packed into 32 bits.
///
/// The wire form (and the JSON key form) is eight uppercase hex digits,
/// e.g. `"00741000"` for Procedure Step State.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

impl Tag {
    /// The group number (upper 16 bits).
    pub fn group(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The element number (lower 16 bits).
    pub fn element(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Whether this tag belongs to the command group (0000,xxxx).
    ///
    /// Command-group elements carry event envelope fields and never
    /// participate in attribute matching.
    pub fn is_command_group(self) -> bool {
        self.group() == 0x0000
    }

    /// Whether this tag belongs to the file-meta group (0002,xxxx).
    pub fn is_file_meta(self) -> bool {
        self.group() == 0x0002
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidTag(s.to_string()));
        }
        let value = u32::from_str_radix(s, 16).map_err(|_| Error::InvalidTag(s.to_string()))?;
        Ok(Tag(value))
    }
}

/// Well-known tags for the UPS worklist domain.
pub mod tags {
    use super::Tag;

    // Command group (event report envelope).
    pub const AFFECTED_SOP_CLASS_UID: Tag = Tag(0x0000_0002);
    pub const MESSAGE_ID: Tag = Tag(0x0000_0110);
    pub const AFFECTED_SOP_INSTANCE_UID: Tag = Tag(0x0000_1000);
    pub const EVENT_TYPE_ID: Tag = Tag(0x0000_1002);

    // Identity and general study attributes.
    pub const SOP_CLASS_UID: Tag = Tag(0x0008_0016);
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008_0018);
    pub const ACCESSION_NUMBER: Tag = Tag(0x0008_0050);
    pub const MODALITY: Tag = Tag(0x0008_0060);
    pub const CODE_VALUE: Tag = Tag(0x0008_0100);
    pub const CODING_SCHEME_DESIGNATOR: Tag = Tag(0x0008_0102);
    pub const CODE_MEANING: Tag = Tag(0x0008_0104);
    pub const TRANSACTION_UID: Tag = Tag(0x0008_1195);

    // Patient.
    pub const PATIENT_NAME: Tag = Tag(0x0010_0010);
    pub const PATIENT_ID: Tag = Tag(0x0010_0020);
    pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010_0030);
    pub const PATIENT_SEX: Tag = Tag(0x0010_0040);

    // Scheduling (0040,xxxx).
    pub const SCHEDULED_PROCEDURE_STEP_START_DATE_TIME: Tag = Tag(0x0040_4005);
    pub const HUMAN_PERFORMER_CODE_SEQUENCE: Tag = Tag(0x0040_4009);
    pub const SCHEDULED_PROCEDURE_STEP_MODIFICATION_DATE_TIME: Tag = Tag(0x0040_4010);
    pub const EXPECTED_COMPLETION_DATE_TIME: Tag = Tag(0x0040_4011);
    pub const SCHEDULED_WORKITEM_CODE_SEQUENCE: Tag = Tag(0x0040_4018);
    pub const SCHEDULED_STATION_NAME_CODE_SEQUENCE: Tag = Tag(0x0040_4025);
    pub const SCHEDULED_STATION_CLASS_CODE_SEQUENCE: Tag = Tag(0x0040_4026);
    pub const SCHEDULED_HUMAN_PERFORMERS_SEQUENCE: Tag = Tag(0x0040_4034);
    pub const ACTUAL_HUMAN_PERFORMERS_SEQUENCE: Tag = Tag(0x0040_4035);
    pub const HUMAN_PERFORMERS_ORGANIZATION: Tag = Tag(0x0040_4036);
    pub const HUMAN_PERFORMER_NAME: Tag = Tag(0x0040_4037);
    pub const INPUT_READINESS_STATE: Tag = Tag(0x0040_4041);

    // Procedure step (0074,xxxx).
    pub const PROCEDURE_STEP_STATE: Tag = Tag(0x0074_1000);
    pub const PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE: Tag = Tag(0x0074_1002);
    pub const PROCEDURE_STEP_PROGRESS: Tag = Tag(0x0074_1004);
    pub const PROCEDURE_STEP_PROGRESS_DESCRIPTION: Tag = Tag(0x0074_1006);
    pub const PROCEDURE_STEP_COMMUNICATIONS_URI_SEQUENCE: Tag = Tag(0x0074_1008);
    pub const CONTACT_URI: Tag = Tag(0x0074_100A);
    pub const CONTACT_DISPLAY_NAME: Tag = Tag(0x0074_100C);
    pub const SCHEDULED_PROCEDURE_STEP_PRIORITY: Tag = Tag(0x0074_1200);
    pub const WORKLIST_LABEL: Tag = Tag(0x0074_1202);
    pub const PROCEDURE_STEP_LABEL: Tag = Tag(0x0074_1204);
    pub const RECEIVING_AE: Tag = Tag(0x0074_1234);
    pub const REQUESTING_AE: Tag = Tag(0x0074_1236);
    pub const REASON_FOR_CANCELLATION: Tag = Tag(0x0074_1238);
    pub const SCP_STATUS: Tag = Tag(0x0074_1242);
    pub const SUBSCRIPTION_LIST_STATUS: Tag = Tag(0x0074_1244);
    pub const UNIFIED_PROCEDURE_STEP_LIST_STATUS: Tag = Tag(0x0074_1246);
}

/// One row of the attribute dictionary.
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    /// The tag.
    pub tag: Tag,
    /// The DICOM keyword.
    pub keyword: &'static str,
    /// The value representation.
    pub vr: Vr,
}

/// The attribute dictionary, sorted by tag.
///
/// This covers every attribute the worklist service reads, writes, or
/// accepts as a search/filter key. Unknown tags are still carried through
/// the codec; they just cannot be named by keyword.
pub const DICTIONARY: &[DictEntry] = &[
    DictEntry { tag: tags::AFFECTED_SOP_CLASS_UID, keyword: "AffectedSOPClassUID", vr: Vr::UI },
    DictEntry { tag: tags::MESSAGE_ID, keyword: "MessageID", vr: Vr::US },
    DictEntry { tag: tags::AFFECTED_SOP_INSTANCE_UID, keyword: "AffectedSOPInstanceUID", vr: Vr::UI },
    DictEntry { tag: tags::EVENT_TYPE_ID, keyword: "EventTypeID", vr: Vr::US },
    DictEntry { tag: tags::SOP_CLASS_UID, keyword: "SOPClassUID", vr: Vr::UI },
    DictEntry { tag: tags::SOP_INSTANCE_UID, keyword: "SOPInstanceUID", vr: Vr::UI },
    DictEntry { tag: tags::ACCESSION_NUMBER, keyword: "AccessionNumber", vr: Vr::SH },
    DictEntry { tag: tags::MODALITY, keyword: "Modality", vr: Vr::CS },
    DictEntry { tag: tags::CODE_VALUE, keyword: "CodeValue", vr: Vr::SH },
    DictEntry { tag: tags::CODING_SCHEME_DESIGNATOR, keyword: "CodingSchemeDesignator", vr: Vr::SH },
    DictEntry { tag: tags::CODE_MEANING, keyword: "CodeMeaning", vr: Vr::LO },
    DictEntry { tag: tags::TRANSACTION_UID, keyword: "TransactionUID", vr: Vr::UI },
    DictEntry { tag: tags::PATIENT_NAME, keyword: "PatientName", vr: Vr::PN },
    DictEntry { tag: tags::PATIENT_ID, keyword: "PatientID", vr: Vr::LO },
    DictEntry { tag: tags::PATIENT_BIRTH_DATE, keyword: "PatientBirthDate", vr: Vr::DA },
    DictEntry { tag: tags::PATIENT_SEX, keyword: "PatientSex", vr: Vr::CS },
    DictEntry {
        tag: tags::SCHEDULED_PROCEDURE_STEP_START_DATE_TIME,
        keyword: "ScheduledProcedureStepStartDateTime",
        vr: Vr::DT,
    },
    DictEntry {
        tag: tags::HUMAN_PERFORMER_CODE_SEQUENCE,
        keyword: "HumanPerformerCodeSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::SCHEDULED_PROCEDURE_STEP_MODIFICATION_DATE_TIME,
        keyword: "ScheduledProcedureStepModificationDateTime",
        vr: Vr::DT,
    },
    DictEntry {
        tag: tags::EXPECTED_COMPLETION_DATE_TIME,
        keyword: "ExpectedCompletionDateTime",
        vr: Vr::DT,
    },
    DictEntry {
        tag: tags::SCHEDULED_WORKITEM_CODE_SEQUENCE,
        keyword: "ScheduledWorkitemCodeSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::SCHEDULED_STATION_NAME_CODE_SEQUENCE,
        keyword: "ScheduledStationNameCodeSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::SCHEDULED_STATION_CLASS_CODE_SEQUENCE,
        keyword: "ScheduledStationClassCodeSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::SCHEDULED_HUMAN_PERFORMERS_SEQUENCE,
        keyword: "ScheduledHumanPerformersSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::ACTUAL_HUMAN_PERFORMERS_SEQUENCE,
        keyword: "ActualHumanPerformersSequence",
        vr: Vr::SQ,
    },
    DictEntry {
        tag: tags::HUMAN_PERFORMERS_ORGANIZATION,
        keyword: "HumanPerformersOrganization",
        vr: Vr::LO,
    },
    DictEntry { tag: tags::HUMAN_PERFORMER_NAME, keyword: "HumanPerformerName", vr: Vr::PN },
    DictEntry { tag: tags::INPUT_READINESS_STATE, keyword: "InputReadinessState", vr: Vr::CS },
    DictEntry { tag: tags::PROCEDURE_STEP_STATE, keyword: "ProcedureStepState", vr: Vr::CS },
    DictEntry {
        tag: tags::PROCEDURE_STEP_PROGRESS_INFORMATION_SEQUENCE,
        keyword: "ProcedureStepProgressInformationSequence",
        vr: Vr::SQ,
    },
    DictEntry { tag: tags::PROCEDURE_STEP_PROGRESS, keyword: "ProcedureStepProgress", vr: Vr::DS },
    DictEntry {
        tag: tags::PROCEDURE_STEP_PROGRESS_DESCRIPTION,
        keyword: "ProcedureStepProgressDescription",
        vr: Vr::ST,
    },
    DictEntry {
        tag: tags::PROCEDURE_STEP_COMMUNICATIONS_URI_SEQUENCE,
        keyword: "ProcedureStepCommunicationsURISequence",
        vr: Vr::SQ,
    },
    DictEntry { tag: tags::CONTACT_URI, keyword: "ContactURI", vr: Vr::UR },
    DictEntry { tag: tags::CONTACT_DISPLAY_NAME, keyword: "ContactDisplayName", vr: Vr::LO },
    DictEntry {
        tag: tags::SCHEDULED_PROCEDURE_STEP_PRIORITY,
        keyword: "ScheduledProcedureStepPriority",
        vr: Vr::CS,
    },
    DictEntry { tag: tags::WORKLIST_LABEL, keyword: "WorklistLabel", vr: Vr::LO },
    DictEntry { tag: tags::PROCEDURE_STEP_LABEL, keyword: "ProcedureStepLabel", vr: Vr::LO },
    DictEntry { tag: tags::RECEIVING_AE, keyword: "ReceivingAE", vr: Vr::AE },
    DictEntry { tag: tags::REQUESTING_AE, keyword: "RequestingAE", vr: Vr::AE },
    DictEntry { tag: tags::REASON_FOR_CANCELLATION, keyword: "ReasonForCancellation", vr: Vr::LT },
    DictEntry { tag: tags::SCP_STATUS, keyword: "SCPStatus", vr: Vr::CS },
    DictEntry { tag: tags::SUBSCRIPTION_LIST_STATUS, keyword: "SubscriptionListStatus", vr: Vr::CS },
    DictEntry {
        tag: tags::UNIFIED_PROCEDURE_STEP_LIST_STATUS,
        keyword: "UnifiedProcedureStepListStatus",
        vr: Vr::CS,
    },
];

/// Look up a dictionary entry by tag.
pub fn entry_for_tag(tag: Tag) -> Option<&'static DictEntry> {
    DICTIONARY.iter().find(|e| e.tag == tag)
}

/// Look up a dictionary entry by keyword.
pub fn entry_for_keyword(keyword: &str) -> Option<&'static DictEntry> {
    DICTIONARY.iter().find(|e| e.keyword == keyword)
}

/// Resolve a search/filter key, which may be a keyword or an 8-hex-digit
/// tag, into `(tag, vr)`.
///
/// Hex tags outside the dictionary resolve with an unknown (`UN`) VR so
/// callers can still match on exact string values.
pub fn resolve_key(key: &str) -> Result<(Tag, Vr), Error> {
    if let Some(entry) = entry_for_keyword(key) {
        return Ok((entry.tag, entry.vr));
    }
    let tag = key.parse::<Tag>().map_err(|_| Error::UnknownKeyword(key.to_string()))?;
    let vr = entry_for_tag(tag).map(|e| e.vr).unwrap_or(Vr::UN);
    Ok((tag, vr))
}

/// The keyword for a tag, when the dictionary knows it.
pub fn keyword_for_tag(tag: Tag) -> Option<&'static str> {
    entry_for_tag(tag).map(|e| e.keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parse_and_display() {
        let tag: Tag = "00741000".parse().unwrap();
        assert_eq!(tag, tags::PROCEDURE_STEP_STATE);
        assert_eq!(tag.group(), 0x0074);
        assert_eq!(tag.element(), 0x1000);
        assert_eq!(tag.to_string(), "00741000");
    }

    #[test]
    fn test_tag_parse_rejects_malformed() {
        assert!("0074100".parse::<Tag>().is_err());
        assert!("0074100Z".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn test_resolve_key_by_keyword_and_hex() {
        let (tag, vr) = resolve_key("PatientName").unwrap();
        assert_eq!(tag, tags::PATIENT_NAME);
        assert_eq!(vr, Vr::PN);

        let (tag, vr) = resolve_key("00741000").unwrap();
        assert_eq!(tag, tags::PROCEDURE_STEP_STATE);
        assert_eq!(vr, Vr::CS);

        assert!(resolve_key("NoSuchKeyword").is_err());
    }

    #[test]
    fn test_dictionary_is_sorted_by_tag() {
        for pair in DICTIONARY.windows(2) {
            assert!(pair[0].tag < pair[1].tag, "{} >= {}", pair[0].tag, pair[1].tag);
        }
    }

    #[test]
    fn test_command_group_detection() {
        assert!(tags::EVENT_TYPE_ID.is_command_group());
        assert!(!tags::PROCEDURE_STEP_STATE.is_command_group());
    }
}
