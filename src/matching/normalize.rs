/// Token every path-parameter segment collapses to
pub const WILDCARD: &str = ":param";

fn is_parameter(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}'))
        || (segment.starts_with('<') && segment.ends_with('>'))
        || (segment.starts_with(':') && segment.len() > 1)
        || (segment.starts_with('[') && segment.ends_with(']'))
}

/// Canonical form of a route template or call path.
///
/// Drops the query string, folds case, collapses `{id}`, `:id`, `<int:id>`
/// and `[id]` segments to [`WILDCARD`] and removes empty segments, so
/// `/Users/{id}/` and `/users/:id` both become `/users/:param`. Applying it
/// twice gives the same result as applying it once.
pub fn normalize_path(path: &str) -> String {
    let without_query = path.split(['?', '#']).next().unwrap_or("");
    let segments: Vec<String> = without_query
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if is_parameter(s) {
                WILDCARD.to_string()
            } else {
                s.to_lowercase()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Segment-wise match of two normalized paths: equal segment counts, and
/// every position either literally equal or a wildcard on either side
pub fn segments_match(left: &str, right: &str) -> bool {
    let left: Vec<&str> = left.split('/').filter(|s| !s.is_empty()).collect();
    let right: Vec<&str> = right.split('/').filter(|s| !s.is_empty()).collect();
    left.len() == right.len()
        && left
            .iter()
            .zip(&right)
            .all(|(l, r)| l == r || *l == WILDCARD || *r == WILDCARD)
}
