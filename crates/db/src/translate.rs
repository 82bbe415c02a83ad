//! Windows-to-Unix path rewriting and `%dest_...%` token expansion.

use regex_lite::Regex;
use tabops_core::PathRules;
use tracing::warn;

use crate::constants::ConstantLookup;
use crate::{DbError, DbResult};

const DEST_TOKEN: &str = r"(?i)%dest_[^%]*%";

/// Backslashes become forward slashes, then every configured share prefix
/// is replaced by its mount point.
pub fn convert_windows_path_to_unix(path: &str, rules: &PathRules) -> String {
    let mut unix = path.replace('\\', "/");
    for rewrite in &rules.share_prefixes {
        unix = unix.replace(&rewrite.from, &rewrite.to);
    }
    unix
}

/// Replace each `%dest_<name>%` token with the constant whose code is the
/// whole token. Replacement values are inserted literally and not rescanned.
pub fn substitute_destination(text: &str, lookup: &impl ConstantLookup) -> DbResult<String> {
    let pattern = Regex::new(DEST_TOKEN).map_err(|e| DbError::Pattern(e.to_string()))?;

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in pattern.find_iter(text) {
        let value = lookup.get_constant_value(m.as_str()).map_err(|e| {
            warn!(token = m.as_str(), text, "unable to resolve destination token");
            e
        })?;
        out.push_str(&text[last..m.start()]);
        out.push_str(&value);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
