//! Test utilities for graph-ide

use std::fs;
use tempfile::TempDir;

/// Create a temporary project with the given `(relative path, content)` files.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_repo_with_structure() {
        let temp_dir = create_repo_with_structure(&[("src/deep/nested/file.ts", "export {};")]);
        assert!(temp_dir.path().join("src/deep/nested/file.ts").exists());
    }
}
