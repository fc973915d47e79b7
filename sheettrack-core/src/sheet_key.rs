//! Spreadsheet key extraction from sharing URLs

use regex::Regex;
use std::sync::OnceLock;

/// Extract the key from a URL like `https://docs.google.com/spreadsheets/d/<key>/edit`.
///
/// Returns `None` when the URL has no `/spreadsheets/d/` segment.
pub fn extract_sheet_key(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("static sheet key pattern")
    });
    re.captures(url).map(|caps| caps[1].to_string())
}
