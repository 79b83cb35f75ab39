//! Certificate codes of the genre catalog mapped onto one rating enumeration.
//!
//! The catalog mixes MPAA, CBFC and TV classification codes. The exclusion
//! set and the remap table below are carried over as-is; several entries
//! (`M`, `Open`, `E10+`, `MA-13`) have no documented rationale and should be
//! reviewed by someone who knows the regional systems before they are changed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Codes whose rows are dropped outright instead of being remapped.
pub const EXCLUDED_CERTIFICATES: &[&str] = &["A", "T", "12", "7"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Certificate {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
    Approved,
    Passed,
    Unrated,
    #[serde(rename = "Not Rated")]
    NotRated,
}

impl Certificate {
    pub const ALL: [Certificate; 9] = [
        Certificate::G,
        Certificate::Pg,
        Certificate::Pg13,
        Certificate::R,
        Certificate::Nc17,
        Certificate::Approved,
        Certificate::Passed,
        Certificate::Unrated,
        Certificate::NotRated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Certificate::G => "G",
            Certificate::Pg => "PG",
            Certificate::Pg13 => "PG-13",
            Certificate::R => "R",
            Certificate::Nc17 => "NC-17",
            Certificate::Approved => "Approved",
            Certificate::Passed => "Passed",
            Certificate::Unrated => "Unrated",
            Certificate::NotRated => "Not Rated",
        }
    }

    /// Looks up a raw catalog code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let mapped = match code.trim() {
            "G" | "TV-G" | "U" | "E" | "E10+" | "TV-Y" => Certificate::G,
            "PG" | "TV-PG" | "TV-Y7" | "M" | "UA" | "M/PG" | "Open" | "UA 7+" | "GP"
            | "TV-Y7-FV" => Certificate::Pg,
            "PG-13" | "TV-14" | "13+" | "TV-13" | "UA 13+" | "13" => Certificate::Pg13,
            "R" | "TV-MA" | "16" | "16+" | "18" | "18+" | "UA 16+" | "MA-13" | "MA-17" => {
                Certificate::R
            }
            "NC-17" | "X" | "AO" => Certificate::Nc17,
            "Approved" => Certificate::Approved,
            "Passed" => Certificate::Passed,
            "Unrated" => Certificate::Unrated,
            "Not Rated" => Certificate::NotRated,
            _ => return None,
        };
        Some(mapped)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Certificate {
    type Err = String;

    /// Accepts the enumeration's display names, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Certificate::ALL
            .into_iter()
            .find(|certificate| certificate.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("Unknown certificate '{value}'"))
    }
}

/// Outcome of running one raw certificate cell through the filter and remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateOutcome {
    Excluded,
    Rated(Certificate),
}

/// Excluded codes drop the row; everything else (blank included) maps onto
/// the enumeration, defaulting to [`Certificate::NotRated`].
pub fn classify_certificate(raw: Option<&str>) -> CertificateOutcome {
    let code = raw.map(str::trim).unwrap_or("");
    if EXCLUDED_CERTIFICATES.contains(&code) {
        return CertificateOutcome::Excluded;
    }
    CertificateOutcome::Rated(Certificate::from_code(code).unwrap_or(Certificate::NotRated))
}
