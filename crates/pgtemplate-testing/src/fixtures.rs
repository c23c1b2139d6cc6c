//! Test fixture utilities.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Point a connection string at `database`.
///
/// Handles both URL (`postgres://...`) and key-value (`host=... dbname=...`)
/// forms. For URLs the path is replaced and the query string kept; for
/// key-value strings `dbname` is replaced or appended.
#[must_use]
pub fn replace_database_in_connection_string(connection_string: &str, database: &str) -> String {
    if connection_string.starts_with("postgres://")
        || connection_string.starts_with("postgresql://")
    {
        return replace_url_database(connection_string, database);
    }

    let mut replaced = false;
    let mut parts: Vec<String> = connection_string
        .split_whitespace()
        .map(|part| {
            if part.starts_with("dbname=") {
                replaced = true;
                format!("dbname={database}")
            } else {
                part.to_string()
            }
        })
        .collect();
    if !replaced {
        parts.push(format!("dbname={database}"));
    }
    parts.join(" ")
}

fn replace_url_database(url: &str, database: &str) -> String {
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    let authority_end = url[authority_start..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |i| authority_start + i);

    let (head, tail) = url.split_at(authority_end);
    let suffix_start = tail.find(['?', '#']).unwrap_or(tail.len());
    format!("{head}/{database}{}", &tail[suffix_start..])
}

/// Generate a database name no other test in this or any concurrent
/// process will use.
#[must_use]
pub fn unique_database_name(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{nanos}_{}_{seq}", std::process::id())
}
