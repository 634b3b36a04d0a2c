//! Request identity keys.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request identity.
///
/// The method is upper-cased so `get` and `GET` share an entry. The URL is
/// expected to be absolute and already canonical.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", "https://lobby.example/style.css");
        let b = compute_request_key("GET", "https://lobby.example/style.css");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let upper = compute_request_key("GET", "https://lobby.example/");
        let lower = compute_request_key("get", "https://lobby.example/");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_key_differs_by_method() {
        let get = compute_request_key("GET", "https://lobby.example/");
        let head = compute_request_key("HEAD", "https://lobby.example/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_key_differs_by_query() {
        let a = compute_request_key("GET", "https://lobby.example/app.js?v=1");
        let b = compute_request_key("GET", "https://lobby.example/app.js?v=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "https://lobby.example/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
