//! Glob patterns for cache invalidation.
//!
//! `*` matches any substring (including the empty one); every other character
//! matches itself. Patterns are anchored at both ends, so `ngos:*` never
//! matches `user-ngos:1`.

use regex::Regex;

/// Compile a glob into a full-key regular expression.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let body = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?s)^{body}$"))
}
