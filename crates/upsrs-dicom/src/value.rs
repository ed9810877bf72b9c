//! Typed element values.

use std::fmt;

use crate::dataset::Dataset;
use crate::vr::Vr;

/// A person name, split into its DICOM+JSON component groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersonName {
    /// The alphabetic component group (`Family^Given^Middle^Prefix^Suffix`).
    pub alphabetic: Option<String>,
    /// The ideographic component group.
    pub ideographic: Option<String>,
    /// The phonetic component group.
    pub phonetic: Option<String>,
}

impl PersonName {
    /// A person name with only an alphabetic group.
    pub fn alphabetic(value: impl Into<String>) -> Self {
        PersonName { alphabetic: Some(value.into()), ideographic: None, phonetic: None }
    }

    /// The string used for matching and display: the alphabetic group.
    pub fn match_str(&self) -> &str {
        self.alphabetic.as_deref().unwrap_or("")
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.match_str())
    }
}

/// One value of a (possibly multi-valued) element.
///
/// This is the tagged variant over the VR domain: the codec and the
/// matcher dispatch on it instead of on runtime JSON types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string value (string-typed VRs).
    Str(String),
    /// An integer value (IS, UL, US).
    Int(i64),
    /// A decimal value (DS, FD).
    Float(f64),
    /// A person name (PN).
    Person(PersonName),
    /// A sequence item (SQ).
    Item(Dataset),
}

impl Value {
    /// The value as a string slice, when it is string-like.
    ///
    /// Person names yield their alphabetic group.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Person(pn) => Some(pn.match_str()),
            _ => None,
        }
    }

    /// The value as an integer, when numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// The value as a float, when numeric.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value as a sequence item.
    pub fn as_item(&self) -> Option<&Dataset> {
        match self {
            Value::Item(ds) => Some(ds),
            _ => None,
        }
    }
}

/// One dataset element: a VR plus zero or more values.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// The value representation.
    pub vr: Vr,
    /// The values. Multi-valued elements keep wire order.
    pub values: Vec<Value>,
}

impl Element {
    /// An empty (zero-length) element.
    pub fn empty(vr: Vr) -> Self {
        Element { vr, values: Vec::new() }
    }

    /// A single-string element.
    pub fn str(vr: Vr, value: impl Into<String>) -> Self {
        Element { vr, values: vec![Value::Str(value.into())] }
    }

    /// A multi-string element.
    pub fn strs(vr: Vr, values: impl IntoIterator<Item = String>) -> Self {
        Element { vr, values: values.into_iter().map(Value::Str).collect() }
    }

    /// A single-integer element.
    pub fn int(vr: Vr, value: i64) -> Self {
        Element { vr, values: vec![Value::Int(value)] }
    }

    /// A single-decimal element.
    pub fn float(vr: Vr, value: f64) -> Self {
        Element { vr, values: vec![Value::Float(value)] }
    }

    /// A person-name element.
    pub fn person(name: PersonName) -> Self {
        Element { vr: Vr::PN, values: vec![Value::Person(name)] }
    }

    /// A sequence element.
    pub fn sequence(items: impl IntoIterator<Item = Dataset>) -> Self {
        Element { vr: Vr::SQ, values: items.into_iter().map(Value::Item).collect() }
    }

    /// The first value, if any.
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    /// The first value as a string.
    pub fn first_str(&self) -> Option<&str> {
        self.first().and_then(Value::as_str)
    }

    /// The first value as an integer.
    pub fn first_int(&self) -> Option<i64> {
        self.first().and_then(Value::as_int)
    }

    /// The first value as a float.
    pub fn first_float(&self) -> Option<f64> {
        self.first().and_then(Value::as_float)
    }

    /// The sequence items, empty for non-sequence elements.
    pub fn items(&self) -> impl Iterator<Item = &Dataset> {
        self.values.iter().filter_map(Value::as_item)
    }

    /// Whether the element carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
