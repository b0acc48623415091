//! Schema versioning for replay documents.

/// Current schema version for replay documents.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (field removals, type changes)
/// - MINOR: Additive changes (new optional fields)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Check if a document schema version is compatible with current.
pub fn is_compatible(version: &str) -> bool {
    major_of(SCHEMA_VERSION) == major_of(version)
}

fn major_of(version: &str) -> Option<u32> {
    version.split('.').next().and_then(|s| s.trim().parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_major_compatible() {
        assert!(is_compatible("1.0.0"));
        assert!(is_compatible("1.4.2"));
    }

    #[test]
    fn test_different_major_incompatible() {
        assert!(!is_compatible("0.9.0"));
        assert!(!is_compatible("2.0.0"));
    }

    #[test]
    fn test_garbage_version_incompatible() {
        assert!(!is_compatible("latest"));
        assert!(!is_compatible(""));
    }
}
