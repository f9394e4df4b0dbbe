//! File intake: read a numbers file and build the check queue.

use std::path::Path;

use anyhow::{bail, Context, Result};
use dnc_engine::PhoneQueue;

/// Read a `.txt` or `.csv` file and collect every 10-digit number in it.
///
/// Lines that parse as a single number are taken whole; anything else is
/// scanned for embedded 10-digit runs, so comma-separated rows work too.
pub fn load_queue(path: &Path) -> Result<PhoneQueue> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt") | Some("csv") => {}
        _ => bail!(
            "unsupported file type (expected .txt or .csv): {}",
            path.display()
        ),
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let queue = PhoneQueue::from_text(&raw);
    if queue.is_empty() {
        bail!("no 10-digit phone numbers found in {}", path.display());
    }
    Ok(queue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(name: &str, body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_numbers_from_txt() {
        let (_dir, path) = file_with("numbers.txt", "4045093823\n(212) 555-0142\n");
        let queue = load_queue(&path).unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn loads_comma_separated_csv() {
        let (_dir, path) = file_with("numbers.csv", "4045093823,2125550142\n");
        let queue = load_queue(&path).unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = file_with("numbers.pdf", "4045093823\n");
        let err = load_queue(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn rejects_file_without_numbers() {
        let (_dir, path) = file_with("notes.txt", "call the office\nno numbers here\n");
        let err = load_queue(&path).unwrap_err();
        assert!(err.to_string().contains("no 10-digit phone numbers"));
    }

    #[test]
    fn uppercase_extension_is_accepted() {
        let (_dir, path) = file_with("NUMBERS.TXT", "4045093823\n");
        assert_eq!(load_queue(&path).unwrap().len(), 1);
    }
}
