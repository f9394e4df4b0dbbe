//! Result export: CSV and JSON renderings of stored check records.

use chrono::Utc;
use dnc_engine::CheckRecord;

/// Column order matches the on-screen results table.
pub const CSV_HEADER: &str = "Phone Number,DNC Status,NDNC,SDNC,State,Name,Address,Status";

/// Render records as CSV. Name and address may carry commas, so those
/// two columns are always quoted.
pub fn to_csv(records: &[CheckRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 96 + CSV_HEADER.len());
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            record.phone.formatted(),
            record.dnc_status,
            record.ndnc,
            record.sdnc,
            record.region,
            quoted(&record.name),
            quoted(&record.address),
            record.person_status,
        ));
    }
    out
}

/// Render records as pretty-printed JSON.
pub fn to_json(records: &[CheckRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Default export filename, dated with today's UTC date.
pub fn default_filename(extension: &str) -> String {
    format!(
        "dnc-check-results-{}.{}",
        Utc::now().format("%Y-%m-%d"),
        extension
    )
}

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
