//! Wire types for the USPeopleSearch API.
//!
//! The upstream service is loose about which fields it returns, so every
//! field is optional and collections default to empty. Callers decide what
//! a missing field means.

use serde::Deserialize;

/// Response from the TCPA registry endpoint (`/tcpa/v1`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TcpaResponse {
    /// "ok" when the lookup succeeded server-side.
    pub status: Option<String>,
    /// "Yes"/"No" listing flag. May be absent or blank when undetermined.
    pub listed: Option<String>,
    /// National DNC registry flag.
    pub ndnc: Option<String>,
    /// State DNC registry flag.
    pub sdnc: Option<String>,
    /// Two-letter state code for the number.
    pub state: Option<String>,
}

impl TcpaResponse {
    /// Whether the server reported a successful lookup.
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}

/// Response from the person details endpoint (`/v1/`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonResponse {
    pub status: Option<String>,
    /// Zero or more matching people, best match first.
    #[serde(default)]
    pub person: Vec<PersonRecord>,
}

impl PersonResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }

    /// Best match, if the server returned any.
    pub fn best_match(&self) -> Option<&PersonRecord> {
        self.person.first()
    }
}

/// A single person attached to a phone number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonRecord {
    pub name: Option<String>,
    /// Line status reported for this person, e.g. "Active".
    pub status: Option<String>,
    #[serde(default)]
    pub addresses: Vec<PersonAddress>,
}

/// A postal address fragment. Any component may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonAddress {
    pub home: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}
