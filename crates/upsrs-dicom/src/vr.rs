//! Value representations.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The DICOM value representations the worklist service handles.
///
/// `UN` stands in for tags outside the dictionary; their values are
/// carried as opaque strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Vr {
    /// Application Entity title.
    AE,
    /// Code String.
    CS,
    /// Date (YYYYMMDD).
    DA,
    /// Decimal String.
    DS,
    /// Date Time.
    DT,
    /// Floating point double.
    FD,
    /// Integer String.
    IS,
    /// Long String.
    LO,
    /// Long Text.
    LT,
    /// Person Name.
    PN,
    /// Short String.
    SH,
    /// Sequence of Items.
    SQ,
    /// Short Text.
    ST,
    /// Time (HHMMSS.FFFFFF).
    TM,
    /// Unique Identifier.
    UI,
    /// Unsigned Long.
    UL,
    /// Unknown.
    UN,
    /// URI/URL.
    UR,
    /// Unsigned Short.
    US,
}

impl Vr {
    /// The two-character code.
    pub fn as_str(self) -> &'static str {
        match self {
            Vr::AE => "AE",
            Vr::CS => "CS",
            Vr::DA => "DA",
            Vr::DS => "DS",
            Vr::DT => "DT",
            Vr::FD => "FD",
            Vr::IS => "IS",
            Vr::LO => "LO",
            Vr::LT => "LT",
            Vr::PN => "PN",
            Vr::SH => "SH",
            Vr::SQ => "SQ",
            Vr::ST => "ST",
            Vr::TM => "TM",
            Vr::UI => "UI",
            Vr::UL => "UL",
            Vr::UN => "UN",
            Vr::UR => "UR",
            Vr::US => "US",
        }
    }

    /// Date/time representations get range and chronological matching.
    pub fn is_datetime(self) -> bool {
        matches!(self, Vr::DA | Vr::DT | Vr::TM)
    }

    /// Whether values are sequences of nested datasets.
    pub fn is_sequence(self) -> bool {
        self == Vr::SQ
    }

    /// Whether values are carried as JSON strings.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            Vr::AE
                | Vr::CS
                | Vr::DA
                | Vr::DT
                | Vr::LO
                | Vr::LT
                | Vr::PN
                | Vr::SH
                | Vr::ST
                | Vr::TM
                | Vr::UI
                | Vr::UN
                | Vr::UR
        )
    }

    /// Whether values are carried as JSON numbers.
    pub fn is_numeric(self) -> bool {
        matches!(self, Vr::DS | Vr::FD | Vr::IS | Vr::UL | Vr::US)
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vr = match s {
            "AE" => Vr::AE,
            "CS" => Vr::CS,
            "DA" => Vr::DA,
            "DS" => Vr::DS,
            "DT" => Vr::DT,
            "FD" => Vr::FD,
            "IS" => Vr::IS,
            "LO" => Vr::LO,
            "LT" => Vr::LT,
            "PN" => Vr::PN,
            "SH" => Vr::SH,
            "SQ" => Vr::SQ,
            "ST" => Vr::ST,
            "TM" => Vr::TM,
            "UI" => Vr::UI,
            "UL" => Vr::UL,
            "UN" => Vr::UN,
            "UR" => Vr::UR,
            "US" => Vr::US,
            other => return Err(Error::InvalidVr(other.to_string())),
        };
        Ok(vr)
    }
}
