use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write `contents`, creating missing parent directories first
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parents() {
        let path = std::env::temp_dir()
            .join("pulser_file_utils_test")
            .join("nested")
            .join("out.json");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        write_file(&path, b"{}").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_read_missing_names_the_path() {
        let path = std::env::temp_dir().join("pulser_file_utils_test").join("missing.bin");
        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing.bin"));
    }
}
