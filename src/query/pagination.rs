//! Pagination links
//!
//! Builds `next`/`previous` URLs by rewriting `limit` and `offset` in the
//! request URL. Other query parameters are kept byte for byte (no decoding or
//! re-encoding) and emitted sorted by key so the output is stable.

use serde::Serialize;
use std::collections::BTreeMap;

/// Page envelope returned by list operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Count and neighbouring page references, without results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageLinks {
    /// Attach a page of results
    pub fn with_results<T>(self, results: Vec<T>) -> Page<T> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}

/// Derive next/previous links for a `limit`/`offset` window over `count` rows
pub fn build_links(url: &str, count: u64, limit: u32, offset: u64) -> PageLinks {
    let limit_u64 = u64::from(limit);

    let next = if offset.saturating_add(limit_u64) < count {
        Some(with_window(url, limit, offset + limit_u64))
    } else {
        None
    };

    let previous = if offset > 0 {
        Some(with_window(url, limit, offset.saturating_sub(limit_u64)))
    } else {
        None
    };

    PageLinks {
        count,
        next,
        previous,
    }
}

/// Replace `limit` and `offset` in the URL's query string
fn with_window(url: &str, limit: u32, offset: u64) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, query),
        None => (url, ""),
    };

    let mut params: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        params.entry(key).or_default().push(value.to_string());
    }

    params.insert("limit", vec![limit.to_string()]);
    params.insert("offset", vec![offset.to_string()]);

    let encoded = params
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |value| format!("{key}={value}")))
        .collect::<Vec<_>>()
        .join("&");

    format!("{base}?{encoded}")
}
