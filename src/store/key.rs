/// Normalizes a project or dependency name into its storage key.
pub fn project_key(name: &str) -> String {
    name.to_lowercase()
}

/// Whether a stored dependency key is `query` itself or lies beneath it.
///
/// `org/dep1` matches `org/dep1` and `org/dep1/sub`, but not `org/dep1foo`.
pub fn dependency_key_matches(query: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(query) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_key_lowercases() {
        assert_eq!(project_key("Example.com/Foo/Bar"), "example.com/foo/bar");
    }

    #[test]
    fn test_dependency_key_matches() {
        assert!(dependency_key_matches("org/dep1", "org/dep1"));
        assert!(dependency_key_matches("org/dep1", "org/dep1/sub"));
        assert!(dependency_key_matches("org/dep1", "org/dep1/sub/deeper"));
        assert!(!dependency_key_matches("org/dep1", "org/dep1foo"));
        assert!(!dependency_key_matches("org/dep1", "fooorg/dep1"));
        assert!(!dependency_key_matches("org/dep1", "org/dep"));
    }
}
