//! Route pattern matching and endpoint resolution.
//!
//! Pattern syntax:
//! - literal segments compare case-insensitively
//! - `{name}` matches any single segment
//! - a trailing `*` matches any remaining suffix, including none
//!
//! Leading and trailing slashes are ignored on both sides, and empty segments
//! are dropped, so `/users//42/` is the same path as `users/42`.

use super::types::MockEndpoint;
use std::cmp::Reverse;

/// Method wildcard and suffix wildcard token
const WILDCARD: &str = "*";

/// Check whether an endpoint accepts the given method and path.
pub fn endpoint_matches(endpoint: &MockEndpoint, method: &str, path: &str) -> bool {
    method_matches(&endpoint.method, method) && route_matches(&endpoint.route_pattern, path)
}

/// Check whether a configured method accepts the actual request method.
pub fn method_matches(pattern_method: &str, actual_method: &str) -> bool {
    pattern_method == WILDCARD || pattern_method.eq_ignore_ascii_case(actual_method)
}

/// Check whether a route pattern matches an actual request path.
pub fn route_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.trim_matches('/');
    let path = path.trim_matches('/');

    if eq_ignore_case(pattern, path) {
        return true;
    }

    let pattern_parts: Vec<&str> = split_segments(pattern);
    let path_parts: Vec<&str> = split_segments(path);

    if let Some((&last, prefix)) = pattern_parts.split_last() {
        if last == WILDCARD {
            return path_parts.len() >= prefix.len()
                && prefix
                    .iter()
                    .zip(&path_parts)
                    .all(|(pattern_part, path_part)| segment_matches(pattern_part, path_part));
        }
    }

    pattern_parts.len() == path_parts.len()
        && pattern_parts
            .iter()
            .zip(&path_parts)
            .all(|(pattern_part, path_part)| segment_matches(pattern_part, path_part))
}

/// Resolve the endpoint that should answer a request.
///
/// Only enabled endpoints are considered. Candidates are ordered by priority
/// (highest first), then by pattern length (longest first); the first one whose
/// method and route match wins. Ties beyond that keep table order.
pub fn find_best_match<'a>(
    endpoints: &'a [MockEndpoint],
    method: &str,
    path: &str,
) -> Option<&'a MockEndpoint> {
    let mut candidates: Vec<&MockEndpoint> = endpoints.iter().filter(|e| e.is_enabled).collect();
    candidates.sort_by_key(|e| (Reverse(e.priority), Reverse(e.route_pattern.chars().count())));
    candidates
        .into_iter()
        .find(|e| endpoint_matches(e, method, path))
}

fn split_segments(value: &str) -> Vec<&str> {
    value.split('/').filter(|s| !s.is_empty()).collect()
}

fn segment_matches(pattern_part: &str, path_part: &str) -> bool {
    is_parameter(pattern_part) || eq_ignore_case(pattern_part, path_part)
}

fn is_parameter(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}')
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
