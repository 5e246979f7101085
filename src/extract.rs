use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Read one report into a single text blob.
///
/// PDF inputs go through `pdf-extract`; anything else is treated as
/// already-extracted text. Downstream parsing never knows which it was.
pub fn read_document(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        pdf_extract::extract_text(path)
            .with_context(|| format!("extracting text from {}", path.display()))?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };

    if text.trim().is_empty() {
        bail!("{}: document contains no text", path.display());
    }
    debug!(path = %path.display(), bytes = text.len(), "document read");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_text_fixture() {
        let text = read_document(Path::new("tests/fixtures/ncr_2025_10_07.txt")).unwrap();
        assert!(text.contains("DAILY PRICE INDEX"));
    }

    #[test]
    fn missing_file_errors() {
        assert!(read_document(Path::new("tests/fixtures/nope.txt")).is_err());
    }

    #[test]
    fn invalid_pdf_errors() {
        // pdf-extract needs actual PDF bytes; a text file with a .pdf name
        // exercises the error path.
        let dir = std::env::temp_dir();
        let path = dir.join("dpi_tracker_not_a_pdf.pdf");
        std::fs::write(&path, "This is not a PDF").unwrap();
        let result = read_document(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
