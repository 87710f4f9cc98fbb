//! Filesystem-safe identifiers derived from media titles.
//!
//! An identifier is used as the raw asset's file stem, the segment folder name
//! and the segment file prefix, so it must be short, ASCII-only and stable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Maximum number of title characters kept before the hash suffix.
pub const MAX_BASE_LEN: usize = 50;

/// Number of hex digits of the SHA-1 digest appended to long titles.
pub const HASH_SUFFIX_LEN: usize = 10;

/// Identifier returned when nothing usable is left of a title.
pub const SENTINEL: &str = "untitled";

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]+").expect("Invalid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// A sanitized, length-bounded name derived from a media title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the n-th segment (0-based index, 1-based in the name).
    pub fn segment_file_name(&self, index: usize) -> String {
        format!("{}_{}.mp3", self.0, index + 1)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn a raw title into an identifier.
///
/// The title is NFKD-normalized and reduced to ASCII, everything except word
/// characters, whitespace and hyphens is dropped, and whitespace runs become a
/// single underscore. Titles longer than [`MAX_BASE_LEN`] keep their first
/// [`MAX_BASE_LEN`] characters followed by `_` and the first
/// [`HASH_SUFFIX_LEN`] hex digits of the SHA-1 of the untruncated result.
pub fn sanitize(raw_title: &str) -> Identifier {
    let ascii: String = raw_title.nfkd().filter(char::is_ascii).collect();
    let cleaned = DISALLOWED.replace_all(&ascii, "");
    let collapsed = WHITESPACE.replace_all(cleaned.trim(), "_").into_owned();

    if collapsed.is_empty() {
        return Identifier(SENTINEL.to_string());
    }

    if collapsed.len() <= MAX_BASE_LEN {
        return Identifier(collapsed);
    }

    let hex = format!("{:x}", Sha1::digest(collapsed.as_bytes()));

    // ASCII only at this point, so byte slicing is char slicing.
    Identifier(format!(
        "{}_{}",
        &collapsed[..MAX_BASE_LEN],
        &hex[..HASH_SUFFIX_LEN]
    ))
}
