//! Compiled-in survey metadata: instrument membership, per-band depth and
//! archive database names.

use crate::error::{LookupKind, Result, SurveyError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Telescope/camera programme that a survey belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instrument {
    Ukirt,
    Vista,
}

impl Instrument {
    pub const ALL: [Instrument; 2] = [Instrument::Ukirt, Instrument::Vista];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ukirt => "UKIRT",
            Self::Vista => "VISTA",
        }
    }

    /// Survey codes observed with this instrument.
    pub fn survey_codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        SURVEYS
            .iter()
            .filter(move |s| s.instrument == *self)
            .map(|s| s.code)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SurveyError::lookup(LookupKind::Instrument, s))
    }
}

struct SurveyEntry {
    instrument: Instrument,
    code: &'static str,
    database: &'static str,
    depths: &'static [(&'static str, f64)],
}

static SURVEYS: &[SurveyEntry] = &[
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "dxs",
        database: "UKIDSSDR11PLUS",
        depths: &[("J", 22.41), ("H", 23.19)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "gcs",
        database: "UKIDSSDR11PLUS",
        depths: &[("Y", 20.734), ("J", 20.51), ("H", 20.19)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "gps",
        database: "UKIDSSDR11PLUS",
        depths: &[("J", 20.71), ("H", 20.39)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "gps2",
        database: "UKIDSSDR11PLUS",
        depths: &[("H", 20.39)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "las",
        database: "UKIDSSDR11PLUS",
        depths: &[("Y", 20.834), ("J", 20.51), ("H", 20.19)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "las2",
        database: "UKIDSSDR11PLUS",
        depths: &[("J", 20.51)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "uds",
        database: "UKIDSSDR11PLUS",
        depths: &[("J", 25.21), ("H", 24.69)],
    },
    SurveyEntry {
        instrument: Instrument::Ukirt,
        code: "uhs",
        database: "UHSDR1",
        depths: &[("J", 20.51)],
    },
    SurveyEntry {
        instrument: Instrument::Vista,
        code: "vhs",
        database: "VHSDR6",
        depths: &[("Y", 21.2), ("J", 21.2), ("H", 20.6)],
    },
    SurveyEntry {
        instrument: Instrument::Vista,
        code: "video",
        database: "VIDEODR6",
        depths: &[("Y", 24.6), ("J", 24.5), ("H", 24.0)],
    },
    SurveyEntry {
        instrument: Instrument::Vista,
        code: "viking",
        database: "VIKINGDR5",
        depths: &[("Y", 22.3), ("J", 22.1), ("H", 21.5)],
    },
    SurveyEntry {
        instrument: Instrument::Vista,
        code: "vmc",
        database: "VMCDR6",
        depths: &[("Y", 21.9), ("J", 21.4)],
    },
    SurveyEntry {
        instrument: Instrument::Vista,
        code: "vvv",
        database: "VVVDR5",
        depths: &[("Y", 21.2), ("J", 20.2), ("H", 18.2)],
    },
];

fn entry(instrument: Instrument, code: &str) -> Option<&'static SurveyEntry> {
    SURVEYS
        .iter()
        .find(|s| s.instrument == instrument && s.code == code)
}

/// Parent instrument of a survey code, if the code is known.
pub fn instrument_of(code: &str) -> Option<Instrument> {
    SURVEYS.iter().find(|s| s.code == code).map(|s| s.instrument)
}

/// Limiting magnitude of `code` in `band`.
///
/// # Errors
/// [`SurveyError::Lookup`] naming `<INSTRUMENT>-<code>-<band>` when the
/// combination has no entry.
pub fn limiting_magnitude(instrument: Instrument, code: &str, band: &str) -> Result<f64> {
    entry(instrument, code)
        .and_then(|s| s.depths.iter().find(|(b, _)| *b == band))
        .map(|&(_, mag)| mag)
        .ok_or_else(|| {
            SurveyError::lookup(
                LookupKind::LimitingMagnitude,
                format!("{}-{}-{}", instrument, code, band),
            )
        })
}

/// Archive database name holding `code`'s catalogue.
pub fn remote_database_name(instrument: Instrument, code: &str) -> Option<&'static str> {
    entry(instrument, code).map(|s| s.database)
}
