//! Read-only search and pagination over the result sequence.

use crate::record::CheckRecord;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One page of matching records, plus enough totals to draw a pager.
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub records: Vec<CheckRecord>,
    /// 1-based page number this slice came from.
    pub page: usize,
    pub page_count: usize,
    pub total_matches: usize,
}

/// Filter records by a case-insensitive substring and slice out one page.
///
/// The query matches against the identifier digits, name, address, or
/// region. A blank query matches everything. Matches keep their original
/// processing order; a page past the end comes back empty with the totals
/// still correct.
pub fn project(
    records: &[CheckRecord],
    query: Option<&str>,
    page: usize,
    page_size: usize,
) -> ResultPage {
    let page = page.max(1);
    let page_size = page_size.max(1);

    let needle = query.map(str::trim).unwrap_or("").to_lowercase();
    let matches: Vec<&CheckRecord> = records
        .iter()
        .filter(|record| needle.is_empty() || matches_query(record, &needle))
        .collect();

    let total_matches = matches.len();
    let page_count = total_matches.div_ceil(page_size);
    // Saturate: a huge page number must land past the end, not wrap.
    let start = (page - 1).saturating_mul(page_size);
    let slice = matches
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    ResultPage {
        records: slice,
        page,
        page_count,
        total_matches,
    }
}

fn matches_query(record: &CheckRecord, needle: &str) -> bool {
    record.phone.digits().contains(needle)
        || record.name.to_lowercase().contains(needle)
        || record.address.to_lowercase().contains(needle)
        || record.region.to_lowercase().contains(needle)
}
