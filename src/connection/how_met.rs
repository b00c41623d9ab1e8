//! The "how we met" field: free text plus an optional meeting year.
//!
//! Stored connection rows carry a single text column in which a year, when
//! present, is encoded as a trailing `" (Year: YYYY)"` suffix. Internally
//! tierlink keeps the two logical fields separate; the combined form is
//! produced and consumed only at the store boundary so existing stored
//! text round-trips byte-for-byte.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Earliest year accepted as a 4-digit meeting year.
const YEAR_MIN: u16 = 1000;

/// Latest year accepted as a 4-digit meeting year.
const YEAR_MAX: u16 = 9999;

/// Marker that introduces the encoded year suffix.
const YEAR_PREFIX: &str = " (Year: ";

/// Description of how two users met, with an optional meeting year.
///
/// Constructed values are always valid: the description is non-empty and
/// the year, if present, has exactly four digits. Use [`HowMet::new`] for
/// structured input and [`HowMet::parse`] for text read back from storage.
///
/// # Example
///
/// ```rust
/// use tierlink::HowMet;
///
/// let how_met = HowMet::new("Met at a conference", Some(2019))?;
/// assert_eq!(how_met.encode(), "Met at a conference (Year: 2019)");
///
/// let parsed = HowMet::parse("Met at a conference (Year: 2019)")?;
/// assert_eq!(parsed.description(), "Met at a conference");
/// assert_eq!(parsed.year(), Some(2019));
/// # Ok::<(), tierlink::ValidationError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HowMet {
    description: String,
    year: Option<u16>,
}

impl HowMet {
    /// Creates a validated HowMet from its two logical fields.
    ///
    /// # Errors
    /// Returns `ValidationError` if the description is empty (or only
    /// whitespace) or the year is not a 4-digit number.
    pub fn new(description: impl Into<String>, year: Option<u16>) -> Result<Self, ValidationError> {
        let description = description.into();

        if description.trim().is_empty() {
            return Err(ValidationError::required_field("how_met"));
        }

        if let Some(year) = year {
            if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
                return Err(ValidationError::invalid_field(
                    "year",
                    format!("must be a 4-digit number, got {}", year),
                ));
            }
        }

        Ok(Self { description, year })
    }

    /// Parses combined text from the store boundary.
    ///
    /// A trailing `" (Year: YYYY)"` suffix is split off as the year; any
    /// other text is kept verbatim as the description. Trailing whitespace
    /// is normalized away.
    ///
    /// # Errors
    /// Returns `ValidationError` if the remaining description is empty.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let (description, year) = split_year_suffix(text);
        Self::new(description, year)
    }

    /// The free-text portion, without any year suffix.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The meeting year, if one was recorded.
    pub fn year(&self) -> Option<u16> {
        self.year
    }

    /// Encodes the combined store-boundary form.
    ///
    /// `parse(encode(x)) == x` for every constructed value, and the
    /// output is byte-identical to text previously read by [`parse`]
    /// (modulo trailing whitespace).
    pub fn encode(&self) -> String {
        match self.year {
            Some(year) => format!("{}{}{})", self.description, YEAR_PREFIX, year),
            None => self.description.clone(),
        }
    }
}

impl fmt::Display for HowMet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Splits a trailing `" (Year: YYYY)"` suffix off the combined text.
///
/// Returns the text unchanged (minus trailing whitespace) when no
/// well-formed suffix is present.
fn split_year_suffix(text: &str) -> (&str, Option<u16>) {
    let trimmed = text.trim_end();

    if let Some(head) = trimmed.strip_suffix(')') {
        if let Some(idx) = head.rfind(YEAR_PREFIX) {
            let digits = &head[idx + YEAR_PREFIX.len()..];
            if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(year) = digits.parse::<u16>() {
                    return (&trimmed[..idx], Some(year));
                }
            }
        }
    }

    (trimmed, None)
}
