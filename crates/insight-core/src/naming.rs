//! Content-addressed names for external resources

use sha2::{Digest, Sha256};

/// Derive a stable identity from `content`.
///
/// Equal inputs always yield the same 32 character hex string.
pub fn create_name(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_stable() {
        assert_eq!(create_name("api.example.com:80"), create_name("api.example.com:80"));
        assert_eq!(create_name("api.example.com:80").len(), 32);
    }

    #[test]
    fn test_name_differs_by_port() {
        assert_ne!(create_name("api.example.com:80"), create_name("api.example.com:443"));
    }
}
