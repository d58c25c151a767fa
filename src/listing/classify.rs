// src/listing/classify.rs
// =============================================================================
// Directory vs. leaf classification.
//
// The listing gives us no type column. The only signal is the href itself:
// directories end with the path separator ("b/"), files don't ("b.txt").
// The parser keeps that separator, so the names can be classified as-is.
// =============================================================================

pub const PATH_SEPARATOR: char = '/';

// Returns true when the listing name denotes a directory
pub fn is_directory(name: &str) -> bool {
    name.ends_with(PATH_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_name() {
        assert!(is_directory("b/"));
        assert!(is_directory("/"));
    }

    #[test]
    fn test_leaf_name() {
        assert!(!is_directory("a.txt"));
        assert!(!is_directory(""));
        assert!(!is_directory("b/c"));
    }
}
