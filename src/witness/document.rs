//! Field layout of the signed identity document.
//!
//! The signed data is a run of `0xFF`-delimited fields. Only the leading
//! demographic fields are decoded; the trailing photo is opaque binary.

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

use super::{WitnessError, WitnessResult};

/// Field delimiter inside the signed data.
pub const DELIMITER: u8 = 0xFF;

/// Offset of Indian Standard Time from UTC, in seconds.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const VERSION: usize = 0;
const REFERENCE_ID: usize = 2;
const NAME: usize = 3;
const DATE_OF_BIRTH: usize = 4;
const GENDER: usize = 5;
const PINCODE: usize = 11;
const MIN_FIELDS: usize = GENDER + 1;

fn reference_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})(\d{14})(\d{3})$").expect("static regex is valid")
    })
}

/// Decoded demographic fields of a signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    /// Scheme version tag, e.g. `V2`.
    pub version: String,
    /// Full reference id: last four ID digits, issuance time, milliseconds.
    pub reference_id: String,
    /// Last four digits of the holder's ID number.
    pub last_four_digits: String,
    /// Issuance time as unix seconds (UTC).
    pub timestamp: u64,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub pincode: Option<String>,
}

/// Read the version tag without decoding the rest of the document.
pub fn version_tag(signed_data: &[u8]) -> WitnessResult<&[u8]> {
    signed_data
        .iter()
        .position(|&b| b == DELIMITER)
        .map(|end| &signed_data[..end])
        .ok_or_else(|| WitnessError::Malformed("no field delimiter in signed data".into()))
}

impl DocumentFields {
    /// Decode the demographic fields from the signed data.
    pub fn parse(signed_data: &[u8]) -> WitnessResult<Self> {
        let fields: Vec<&[u8]> = signed_data
            .split(|&b| b == DELIMITER)
            .take(PINCODE + 1)
            .collect();
        if fields.len() < MIN_FIELDS {
            return Err(WitnessError::Malformed(format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            )));
        }

        let text = |index: usize, label: &str| -> WitnessResult<String> {
            std::str::from_utf8(fields[index])
                .map(str::to_string)
                .map_err(|_| WitnessError::Malformed(format!("{} is not valid UTF-8", label)))
        };

        let reference_id = text(REFERENCE_ID, "reference id")?;
        let captures = reference_id_pattern()
            .captures(&reference_id)
            .ok_or_else(|| {
                WitnessError::Malformed(format!("invalid reference id: {:?}", reference_id))
            })?;
        let last_four_digits = captures[1].to_string();
        let timestamp = parse_issuance_time(&captures[2])?;

        Ok(Self {
            version: text(VERSION, "version")?,
            reference_id,
            last_four_digits,
            timestamp,
            name: text(NAME, "name")?,
            date_of_birth: text(DATE_OF_BIRTH, "date of birth")?,
            gender: text(GENDER, "gender")?,
            pincode: fields
                .get(PINCODE)
                .and_then(|f| std::str::from_utf8(f).ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

/// Convert a `YYYYMMDDhhmmss` IST timestamp to unix seconds.
fn parse_issuance_time(digits: &str) -> WitnessResult<u64> {
    let naive = NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
        .map_err(|e| WitnessError::Malformed(format!("invalid issuance time {}: {}", digits, e)))?;
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)
        .ok_or_else(|| WitnessError::Malformed("invalid timezone offset".into()))?;
    let issued = ist
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| WitnessError::Malformed(format!("ambiguous issuance time {}", digits)))?;

    u64::try_from(issued.timestamp())
        .map_err(|_| WitnessError::Malformed(format!("issuance time {} precedes epoch", digits)))
}
