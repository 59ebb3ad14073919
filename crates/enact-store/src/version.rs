/// Splits a `v<major>.<minor>.<patch>`-shaped version string into
/// integer components for comparison; non-numeric components sort
/// last, per the spec's "highest cached" rule.
fn components(version: &str) -> Vec<Result<u64, String>> {
    version
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse::<u64>().map_err(|_| part.to_string()))
        .collect()
}

fn compare_component(a: &Result<u64, String>, b: &Result<u64, String>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Ok(a), Ok(b)) => a.cmp(b),
        // Non-numeric components sort last (i.e. rank highest in an
        // ascending comparison), so a numeric component is always
        // "less than" a non-numeric one at the same position.
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(a), Err(b)) => a.cmp(b),
    }
}

/// Lexicographic comparison of two version strings after splitting on
/// `.`, numeric components compared as integers, non-numeric
/// components sorting after any numeric one.
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let (ca, cb) = (components(a), components(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = compare_component(x, y);
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

/// Returns the highest of the given version strings, if any.
pub fn highest_cached_version(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .max_by(|a, b| compare_versions(a, b))
        .cloned()
}
