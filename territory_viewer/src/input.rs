// src/input.rs
// Transaction hash input: CLI args, a file, or stdin

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

/// One entry per transaction; `None` marks a missing hash (JSON null or a blank line).
pub type Entries = Vec<Option<String>>;

pub fn load_entries(hashes: &[String], file: Option<&Path>) -> Result<Entries> {
    match file {
        Some(path) if !hashes.is_empty() => bail!(
            "Pass transaction hashes either as arguments or with --file {}, not both",
            path.display()
        ),
        Some(path) => parse_entries(&read_source(path)?),
        None => Ok(hashes.iter().cloned().map(Some).collect()),
    }
}

pub fn load_blocks(path: &Path) -> Result<Vec<Entries>> {
    let text = read_source(path)?;
    serde_json::from_str(&text).context("Expected a JSON array of blocks (arrays of tx hashes)")
}

/// A JSON array of strings/nulls, or one hash per line.
pub fn parse_entries(text: &str) -> Result<Entries> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("Invalid JSON array of transaction hashes");
    }

    Ok(text
        .lines()
        .map(|line| {
            let line = line.trim();
            if line.is_empty() {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect())
}

// `-` reads stdin
fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read transaction hashes from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json_array_with_nulls() {
        let entries = parse_entries(r#"["0xaa", null, ""]"#).unwrap();
        assert_eq!(
            entries,
            vec![Some("0xaa".to_string()), None, Some(String::new())]
        );
    }

    #[test]
    fn test_parse_lines_keeps_positions() {
        let entries = parse_entries("0xaa\n\n  0xbb  \n").unwrap();
        assert_eq!(
            entries,
            vec![Some("0xaa".to_string()), None, Some("0xbb".to_string())]
        );
    }

    #[test]
    fn test_invalid_json_array() {
        assert!(parse_entries("[0xaa]").is_err());
    }

    #[test]
    fn test_args_and_file_conflict() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_entries(&["0xaa".to_string()], Some(file.path())).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0xaa").unwrap();
        writeln!(file, "0xbb").unwrap();

        let entries = load_entries(&[], Some(file.path())).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_load_blocks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[["0xaa", "0xbb"], [], [null]]"#).unwrap();

        let blocks = load_blocks(file.path()).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].len(), 2);
        assert!(blocks[1].is_empty());
        assert_eq!(blocks[2], vec![None]);
    }
}
