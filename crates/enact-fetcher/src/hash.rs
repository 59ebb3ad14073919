use sha2::{Digest, Sha256};

/// Strips a tolerated `sha256:` prefix and lowercases, so a hash can be
/// compared regardless of which side (registry descriptor or computed
/// digest) carries the prefix.
pub fn normalize(hash: &str) -> String {
    hash.strip_prefix("sha256:").unwrap_or(hash).to_lowercase()
}

pub fn hex_digest(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_prefix_either_side() {
        assert_eq!(normalize("sha256:ABCDEF"), "abcdef");
        assert_eq!(normalize("abcdef"), "abcdef");
    }
}
