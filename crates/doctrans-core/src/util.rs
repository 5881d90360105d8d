//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get the user's cache directory following XDG conventions.
///
/// Returns `$XDG_CACHE_HOME` if set, otherwise `$HOME/.cache`.
pub fn cache_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
}

/// Content fingerprint used for OCR cache keys and document identity.
///
/// MD5 is fine here: keys are opaque and collision resistance is not a
/// security property of the cache.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// RFC3339 UTC timestamp with microsecond precision.
///
/// Fixed-width output so lexicographic order equals chronological order,
/// which the "latest version" query relies on.
pub fn utc_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_hex() {
        let h = content_hash(b"hello");
        assert_eq!(h.len(), 32);
        assert_eq!(h, content_hash(b"hello"));
        assert_ne!(h, content_hash(b"world"));
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = utc_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = utc_timestamp();
        assert!(a < b);
        assert_eq!(a.len(), b.len());
    }
}
