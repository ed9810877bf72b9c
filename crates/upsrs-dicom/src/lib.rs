//! DICOM attribute model for the UPSRS worklist service.
//!
//! This crate defines the typed attribute model shared by the domain
//! core and the HTTP surface, plus the DICOM+JSON codec and the query
//! matcher.
//!
//! # Modules
//!
//! - [`tag`] - Tags and the attribute dictionary
//! - [`vr`] - Value representations
//! - [`value`] - Typed element values
//! - [`dataset`] - Attribute datasets
//! - [`json`] - The DICOM+JSON codec
//! - [`time`] - DA/TM/DT parsing
//! - [`matching`] - Query/filter matching
//! - [`uid`] - UID validation and generation

pub mod dataset;
pub mod error;
pub mod json;
pub mod matching;
pub mod tag;
pub mod time;
pub mod uid;
pub mod value;
pub mod vr;

pub use dataset::Dataset;
pub use error::Error;
pub use json::{dataset_from_body, dataset_from_json_value};
pub use matching::matches;
pub use tag::{entry_for_keyword, entry_for_tag, keyword_for_tag, resolve_key, tags, Tag};
pub use uid::{generate_uid, is_valid_uid, validate_uid};
pub use value::{Element, PersonName, Value};
pub use vr::Vr;
