//! Collision-resistant, semantically hinted asset identifiers.
//!
//! Format: `ast_{semantic}_{timestampMillis}_{random4}`, or
//! `ast_{timestampMillis}_{random4}` when no usable hint is supplied.

use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

const SEMANTIC_MAX_LEN: usize = 20;
const RANDOM_LEN: usize = 4;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

lazy_static! {
    static ref ASSET_ID_RE: Regex =
        Regex::new(r"^ast_(?:[a-z0-9_]+_)?[0-9]{13}_[0-9a-z]{4}$").expect("valid asset id regex");
}

/// Mint a new asset id, embedding `semantic_hint` when it survives
/// normalization.
pub fn generate(semantic_hint: Option<&str>) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let random = random_suffix();

    match semantic_hint.map(normalize_hint).filter(|s| !s.is_empty()) {
        Some(semantic) => format!("ast_{semantic}_{timestamp}_{random}"),
        None => format!("ast_{timestamp}_{random}"),
    }
}

/// Lowercase, collapse runs of non-alphanumerics to a single underscore,
/// trim edge underscores, cap at 20 characters.
fn normalize_hint(hint: &str) -> String {
    let mut out = String::with_capacity(hint.len());
    let mut last_was_sep = false;
    for c in hint.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').chars().take(SEMANTIC_MAX_LEN).collect()
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Shape check: `ast_`, optional semantic segment, 13-digit millisecond
/// timestamp, 4 base-36 characters.
pub fn is_valid(id: &str) -> bool {
    ASSET_ID_RE.is_match(id)
}

/// Recover the semantic hint from an id.
///
/// The timestamp and random segments are located by position from the end,
/// so the hint is only recoverable when it occupies exactly one
/// underscore-delimited segment. Hints that normalized to several segments
/// parse as `None`.
pub fn semantic_name(id: &str) -> Option<&str> {
    if !is_valid(id) {
        return None;
    }
    let parts: Vec<&str> = id.split('_').collect();
    if parts.len() == 4 { Some(parts[1]) } else { None }
}

/// Millisecond creation timestamp embedded in the id (second-to-last
/// segment).
pub fn timestamp_millis(id: &str) -> Option<i64> {
    if !is_valid(id) {
        return None;
    }
    let parts: Vec<&str> = id.split('_').collect();
    parts[parts.len() - 2].parse().ok()
}
