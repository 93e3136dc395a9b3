//! Shared utilities for the cache library.

use std::fmt::Display;

/// Build a composite cache key from the parts of a logical query.
///
/// Format: `{part}::{part}::...`, e.g. resource kind, path and filter signature.
pub fn build_cache_key<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push_str("::");
        }
        key.push_str(&part.to_string());
    }
    key
}
