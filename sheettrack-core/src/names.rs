//! Teacher name normalization

use crate::source::CellValue;
use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Honorifics that may carry a trailing period (`Lic.`, `Dr.`).
const SHORT_TITLES: &[&str] = &["lic", "dr", "ing", "arq", "ms", "msc", "sr", "sra", "srta"];

/// Spelled-out honorifics.
const LONG_TITLES: &[&str] = &["licenciado", "doctor", "ingeniero", "maestro"];

fn title_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let short = format!(r"(?i)\b({})\b\.?", SHORT_TITLES.join("|"));
        let long = format!(r"(?i)\b({})\b", LONG_TITLES.join("|"));
        [
            Regex::new(&short).expect("static title pattern"),
            Regex::new(&long).expect("static title pattern"),
        ]
    })
}

fn whitespace_pattern() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"))
}

/// Normalize a cell value holding a person's name.
///
/// Anything other than text normalizes to the empty string.
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => normalize_name(s),
        _ => String::new(),
    }
}

/// Canonical comparison form of a free-text name.
///
/// Lowercases, folds diacritics, strips honorifics and collapses whitespace:
/// `"Lic.  María LÓPEZ"` becomes `"maria lopez"`.
pub fn normalize_name(raw: &str) -> String {
    let mut name: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    for pattern in title_patterns() {
        name = pattern.replace_all(&name, " ").into_owned();
    }

    whitespace_pattern()
        .replace_all(name.trim(), " ")
        .trim()
        .to_string()
}
