//! Per-identifier lookup orchestration.
//!
//! [`PhoneLookup`] is the engine's seam to the outside world. Implementations
//! fold their own failures into the returned record (`failed` flag plus
//! sentinel fields); the controller never sees an `Err` and never retries.
//!
//! [`PeopleSearchLookup`] is the production implementation over the
//! USPeopleSearch relay: up to two sub-calls per number, registry first,
//! details second, with a transport fault on the first abandoning the second.

use async_trait::async_trait;
use tracing::warn;
use uspeople::{PeopleSearchClient, PersonAddress, PersonResponse, TcpaResponse};

use crate::phone::PhoneNumber;
use crate::record::{CheckRecord, DncStatus, ERROR_TEXT, NOT_FOUND};

/// Which sub-calls to perform for each identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Query the DNC registry endpoint.
    pub registry_check: bool,
    /// Query the person details endpoint.
    pub person_details: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            registry_check: true,
            person_details: true,
        }
    }
}

impl CheckOptions {
    /// True when no sub-call is requested at all.
    pub fn is_noop(&self) -> bool {
        !self.registry_check && !self.person_details
    }
}

/// The engine's view of the external lookup service.
#[async_trait]
pub trait PhoneLookup: Send + Sync {
    /// Check one number. Always returns a record; failures are folded in.
    async fn check(&self, phone: &PhoneNumber, options: CheckOptions) -> CheckRecord;

    /// Service reachability, for the status surface. Never used by the
    /// per-item loop.
    async fn probe(&self) -> bool;
}

/// Production lookup over the USPeopleSearch relay.
pub struct PeopleSearchLookup {
    client: PeopleSearchClient,
}

impl PeopleSearchLookup {
    pub fn new() -> Result<Self, uspeople::LookupError> {
        Ok(Self {
            client: PeopleSearchClient::new()?,
        })
    }

    /// Aim at an alternate relay, e.g. from a `DNC_RELAY_URL` override.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, uspeople::LookupError> {
        Ok(Self {
            client: PeopleSearchClient::with_base_url(base_url)?,
        })
    }
}

#[async_trait]
impl PhoneLookup for PeopleSearchLookup {
    async fn check(&self, phone: &PhoneNumber, options: CheckOptions) -> CheckRecord {
        let mut record = CheckRecord::empty(phone.clone());

        if options.registry_check {
            match self.client.registry_check(phone.digits()).await {
                Ok(Some(body)) if body.is_ok() => apply_registry(&mut record, &body),
                Ok(_) => {
                    // Non-success status: no data, defaults stand.
                }
                Err(e) => {
                    warn!(phone = %phone, "registry check failed: {}", e);
                    mark_registry_error(&mut record);
                    record.failed = true;
                    // First fault abandons the details call.
                    return record;
                }
            }
        }

        if options.person_details {
            match self.client.person_details(phone.digits()).await {
                Ok(Some(body)) if body.is_ok() => apply_details(&mut record, &body),
                Ok(_) => {}
                Err(e) => {
                    warn!(phone = %phone, "person details failed: {}", e);
                    mark_details_error(&mut record);
                    record.failed = true;
                }
            }
        }

        record
    }

    async fn probe(&self) -> bool {
        self.client.probe().await
    }
}

/// Copy registry fields out of a successful TCPA body.
///
/// A body whose `listed` flag is absent or blank stays `Unknown`; only an
/// explicit value decides membership.
fn apply_registry(record: &mut CheckRecord, body: &TcpaResponse) {
    record.dnc_status = match body.listed.as_deref() {
        None | Some("") => DncStatus::Unknown,
        Some("No") => DncStatus::No,
        Some(_) => DncStatus::Yes,
    };
    record.ndnc = text_or(body.ndnc.as_deref(), &record.ndnc);
    record.sdnc = text_or(body.sdnc.as_deref(), &record.sdnc);
    record.region = text_or(body.state.as_deref(), &record.region);
}

/// Copy identity fields out of a successful details body.
///
/// An empty person list is a legitimate "nobody attached to this number"
/// answer; the `Not Found` defaults stand.
fn apply_details(record: &mut CheckRecord, body: &PersonResponse) {
    let Some(person) = body.best_match() else {
        return;
    };
    record.name = text_or(person.name.as_deref(), &record.name);
    record.person_status = text_or(person.status.as_deref(), &record.person_status);
    if let Some(address) = person.addresses.first() {
        record.address = render_address(address);
    }
}

/// `"{home}, {city}, {state} {zip}"` with empty parts dropped.
fn render_address(address: &PersonAddress) -> String {
    let clean = |value: &Option<String>| -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut parts: Vec<String> = Vec::new();
    if let Some(home) = clean(&address.home) {
        parts.push(home);
    }
    if let Some(city) = clean(&address.city) {
        parts.push(city);
    }
    let state_zip: Vec<String> = [clean(&address.state), clean(&address.zip)]
        .into_iter()
        .flatten()
        .collect();
    if !state_zip.is_empty() {
        parts.push(state_zip.join(" "));
    }

    if parts.is_empty() {
        NOT_FOUND.to_string()
    } else {
        parts.join(", ")
    }
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

pub(crate) fn mark_registry_error(record: &mut CheckRecord) {
    record.dnc_status = DncStatus::Error;
    record.ndnc = ERROR_TEXT.to_string();
    record.sdnc = ERROR_TEXT.to_string();
    record.region = ERROR_TEXT.to_string();
}

pub(crate) fn mark_details_error(record: &mut CheckRecord) {
    record.name = ERROR_TEXT.to_string();
    record.address = ERROR_TEXT.to_string();
    record.person_status = ERROR_TEXT.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UNKNOWN;

    fn base_record() -> CheckRecord {
        CheckRecord::empty(PhoneNumber::parse("4045093823").unwrap())
    }

    fn tcpa(json: &str) -> TcpaResponse {
        serde_json::from_str(json).unwrap()
    }

    fn person(json: &str) -> PersonResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn registry_listed_no_maps_to_no() {
        let mut record = base_record();
        apply_registry(
            &mut record,
            &tcpa(r#"{"status":"ok","listed":"No","ndnc":"No","sdnc":"Yes","state":"GA"}"#),
        );
        assert_eq!(record.dnc_status, DncStatus::No);
        assert_eq!(record.ndnc, "No");
        assert_eq!(record.sdnc, "Yes");
        assert_eq!(record.region, "GA");
    }

    #[test]
    fn registry_listed_yes_maps_to_yes() {
        let mut record = base_record();
        apply_registry(&mut record, &tcpa(r#"{"status":"ok","listed":"Yes"}"#));
        assert_eq!(record.dnc_status, DncStatus::Yes);
        assert_eq!(record.region, UNKNOWN);
    }

    #[test]
    fn registry_without_listed_stays_unknown() {
        let mut record = base_record();
        apply_registry(&mut record, &tcpa(r#"{"status":"ok","state":"GA"}"#));
        assert_eq!(record.dnc_status, DncStatus::Unknown);
        assert_eq!(record.region, "GA");
    }

    #[test]
    fn blank_listed_counts_as_absent() {
        let mut record = base_record();
        apply_registry(&mut record, &tcpa(r#"{"status":"ok","listed":""}"#));
        assert_eq!(record.dnc_status, DncStatus::Unknown);
    }

    #[test]
    fn details_with_empty_person_list_keeps_not_found() {
        let mut record = base_record();
        apply_details(&mut record, &person(r#"{"status":"ok","person":[]}"#));
        assert_eq!(record.name, NOT_FOUND);
        assert_eq!(record.address, NOT_FOUND);
    }

    #[test]
    fn details_take_the_first_person_and_address() {
        let mut record = base_record();
        apply_details(
            &mut record,
            &person(
                r#"{"status":"ok","person":[
                    {"name":"Jane Doe","status":"Active","addresses":[
                        {"home":"12 Elm St","city":"Atlanta","state":"GA","zip":"30303"},
                        {"home":"99 Oak Ave","city":"Austin","state":"TX","zip":"78701"}
                    ]},
                    {"name":"Someone Else"}
                ]}"#,
            ),
        );
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.person_status, "Active");
        assert_eq!(record.address, "12 Elm St, Atlanta, GA 30303");
    }

    #[test]
    fn address_drops_empty_parts() {
        let rendered = render_address(&serde_json::from_str(r#"{"city":"Atlanta","zip":"30303"}"#).unwrap());
        assert_eq!(rendered, "Atlanta, 30303");
        let rendered = render_address(&serde_json::from_str(r#"{"home":"  "}"#).unwrap());
        assert_eq!(rendered, NOT_FOUND);
    }

    #[test]
    fn error_marking_covers_each_sub_call() {
        let mut record = base_record();
        mark_registry_error(&mut record);
        assert_eq!(record.dnc_status, DncStatus::Error);
        assert_eq!(record.ndnc, ERROR_TEXT);
        assert_eq!(record.name, NOT_FOUND);

        let mut record = base_record();
        mark_details_error(&mut record);
        assert_eq!(record.name, ERROR_TEXT);
        assert_eq!(record.dnc_status, DncStatus::Unknown);
    }

    #[tokio::test]
    async fn no_flags_means_no_network_and_a_clean_record() {
        // Unroutable host: if any request were issued the record would fail.
        let lookup = PeopleSearchLookup::with_base_url("http://127.0.0.1:1").unwrap();
        let phone = PhoneNumber::parse("4045093823").unwrap();
        let record = lookup
            .check(
                &phone,
                CheckOptions {
                    registry_check: false,
                    person_details: false,
                },
            )
            .await;
        assert!(!record.failed);
        assert_eq!(record.dnc_status, DncStatus::Unknown);
        assert_eq!(record.name, NOT_FOUND);
    }

    #[tokio::test]
    async fn transport_fault_on_registry_abandons_details() {
        let lookup = PeopleSearchLookup::with_base_url("http://127.0.0.1:1").unwrap();
        let phone = PhoneNumber::parse("4045093823").unwrap();
        let record = lookup.check(&phone, CheckOptions::default()).await;
        assert!(record.failed);
        assert_eq!(record.dnc_status, DncStatus::Error);
        assert_eq!(record.ndnc, ERROR_TEXT);
        // Details never ran, so identity fields keep their defaults.
        assert_eq!(record.name, NOT_FOUND);
        assert_eq!(record.person_status, UNKNOWN);
    }
}
