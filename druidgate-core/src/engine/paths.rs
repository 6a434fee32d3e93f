//! Druid API paths.
//!
//! Caller-supplied identifiers (datasource names, task ids, lookup tiers) are
//! percent-encoded so they cannot escape their path segment.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Everything outside RFC 3986 `unreserved` is encoded.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b',')
    .add(b'$')
    .add(b'!')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*');

pub const SQL: &str = "/druid/v2/sql";
pub const DATASOURCES: &str = "/druid/coordinator/v1/datasources";
pub const LOOKUPS_CONFIG: &str = "/druid/coordinator/v1/lookups/config";
pub const TASKS: &str = "/druid/indexer/v1/tasks";
pub const TASK: &str = "/druid/indexer/v1/task";
pub const SUPERVISORS: &str = "/druid/indexer/v1/supervisor";
pub const BASIC_SECURITY: &str = "/druid-ext/basic-security/authentication/db";
pub const STATUS: &str = "/status";
pub const HEALTH: &str = "/status/health";

/// Encode one path segment.
pub fn segment(raw: &str) -> String {
    // dot segments would be collapsed by URL normalization
    if raw == "." || raw == ".." {
        return raw.replace('.', "%2E");
    }
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// `base` followed by each encoded segment.
pub fn join(base: &str, segments: &[&str]) -> String {
    let mut path = base.trim_end_matches('/').to_string();
    for raw in segments {
        path.push('/');
        path.push_str(&segment(raw));
    }
    path
}
