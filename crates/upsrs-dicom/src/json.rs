//! The DICOM+JSON codec.
//!
//! Wire form: a dataset is an object whose keys are 8-hex-digit tags and
//! whose values are `{"vr": "XX", "Value": [...]}` objects. Sequence items
//! nest datasets under `Value`; person names are component-group objects.
//! Empty `Value` arrays are omitted on output.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dataset::Dataset;
use crate::error::Error;
use crate::tag::Tag;
use crate::value::{Element, PersonName, Value};
use crate::vr::Vr;

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (tag, element) in self.iter() {
            map.serialize_entry(&tag.to_string(), element)?;
        }
        map.end()
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.values.is_empty() { 1 } else { 2 };
        let mut state = serializer.serialize_struct("Element", fields)?;
        state.serialize_field("vr", self.vr.as_str())?;
        if !self.values.is_empty() {
            state.serialize_field("Value", &self.values)?;
        }
        state.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Person(pn) => {
                let count = [&pn.alphabetic, &pn.ideographic, &pn.phonetic]
                    .iter()
                    .filter(|g| g.is_some())
                    .count();
                let mut map = serializer.serialize_map(Some(count))?;
                if let Some(a) = &pn.alphabetic {
                    map.serialize_entry("Alphabetic", a)?;
                }
                if let Some(i) = &pn.ideographic {
                    map.serialize_entry("Ideographic", i)?;
                }
                if let Some(p) = &pn.phonetic {
                    map.serialize_entry("Phonetic", p)?;
                }
                map.end()
            }
            Value::Item(ds) => ds.serialize(serializer),
        }
    }
}

/// The raw wire shape of an element, before VR-directed typing.
#[derive(Deserialize)]
struct RawElement {
    vr: String,
    #[serde(rename = "Value", default)]
    value: Vec<serde_json::Value>,
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawElement>::deserialize(deserializer)?;
        let mut ds = Dataset::new();
        for (key, raw_element) in raw {
            let tag: Tag = key.parse().map_err(D::Error::custom)?;
            let vr: Vr = raw_element.vr.parse().map_err(D::Error::custom)?;
            let element = element_from_raw(tag, vr, raw_element.value).map_err(D::Error::custom)?;
            ds.put(tag, element);
        }
        Ok(ds)
    }
}

fn element_from_raw(tag: Tag, vr: Vr, raw: Vec<serde_json::Value>) -> Result<Element, Error> {
    let mut values = Vec::with_capacity(raw.len());
    for value in raw {
        values.push(value_from_raw(tag, vr, value)?);
    }
    Ok(Element { vr, values })
}

fn value_from_raw(tag: Tag, vr: Vr, value: serde_json::Value) -> Result<Value, Error> {
    use serde_json::Value as Json;

    let malformed = |reason: &str| Error::MalformedJson {
        tag: tag.to_string(),
        reason: reason.to_string(),
    };

    match value {
        Json::Object(map) => {
            if vr == Vr::PN {
                let group = |key: &str| {
                    map.get(key).and_then(Json::as_str).map(str::to_string)
                };
                Ok(Value::Person(PersonName {
                    alphabetic: group("Alphabetic"),
                    ideographic: group("Ideographic"),
                    phonetic: group("Phonetic"),
                }))
            } else {
                let item: Dataset = serde_json::from_value(Json::Object(map))
                    .map_err(|e| malformed(&e.to_string()))?;
                Ok(Value::Item(item))
            }
        }
        Json::String(s) => {
            // Lenient: a bare string under PN is treated as the
            // alphabetic group, as common senders emit it.
            if vr == Vr::PN {
                Ok(Value::Person(PersonName::alphabetic(s)))
            } else {
                Ok(Value::Str(s))
            }
        }
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(malformed("number out of range"))
            }
        }
        Json::Null => Err(malformed("null value")),
        Json::Bool(_) => Err(malformed("boolean value")),
        Json::Array(_) => Err(malformed("nested array value")),
    }
}

/// Parse a request body into a dataset.
///
/// Accepts either a bare dataset object or a one-element array wrapping
/// it, which some UPS clients send.
pub fn dataset_from_body(bytes: &[u8]) -> Result<Dataset, Error> {
    let json: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedBody(e.to_string()))?;
    dataset_from_json_value(json)
}

/// Parse an already-decoded JSON value into a dataset, unwrapping a
/// one-element array if present.
pub fn dataset_from_json_value(json: serde_json::Value) -> Result<Dataset, Error> {
    let object = match json {
        serde_json::Value::Array(mut items) => {
            if items.is_empty() {
                return Err(Error::MalformedBody("empty array body".to_string()));
            }
            items.remove(0)
        }
        other => other,
    };
    serde_json::from_value(object).map_err(|e| Error::MalformedBody(e.to_string()))
}
