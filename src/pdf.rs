//! PDF text and document-property extraction.
//!
//! Page text comes from `pdf-extract`; the title/author/creation-date
//! properties come from the PDF trailer's Info dictionary read with `lopdf`.
//! A document with an unreadable Info dictionary still ingests — properties
//! are optional metadata, page text is not.

use crate::error::{Error, Result};

/// Extracted content of one PDF: per-page text plus document properties.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub pages: Vec<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
}

/// Case-insensitive `.pdf` extension check. This is the only validation
/// applied to uploads; content sniffing is deliberately absent.
pub fn is_pdf_filename(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Extract per-page text and document properties from PDF bytes.
pub fn extract(bytes: &[u8]) -> Result<PdfDocument> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::IngestionFailure(format!("PDF text extraction failed: {}", e)))?;

    let (title, author, created) = match read_info_dictionary(bytes) {
        Ok(props) => props,
        Err(e) => {
            tracing::debug!("PDF info dictionary unreadable: {}", e);
            (None, None, None)
        }
    };

    Ok(PdfDocument {
        pages,
        title,
        author,
        created,
    })
}

fn read_info_dictionary(
    bytes: &[u8],
) -> anyhow::Result<(Option<String>, Option<String>, Option<String>)> {
    let doc = lopdf::Document::load_mem(bytes)?;
    let info_id = doc.trailer.get(b"Info")?.as_reference()?;
    let info = doc.get_dictionary(info_id)?;

    let field = |key: &[u8]| -> Option<String> {
        info.get(key)
            .ok()
            .and_then(|obj| obj.as_str().ok())
            .map(decode_pdf_string)
            .filter(|s| !s.is_empty())
    };

    Ok((field(b"Title"), field(b"Author"), field(b"CreationDate")))
}

/// Decode a PDF text string: UTF-16BE when the BOM is present, otherwise
/// treated as Latin-1 (a superset of PDFDocEncoding for common fields).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check_is_case_insensitive() {
        assert!(is_pdf_filename("manual.pdf"));
        assert!(is_pdf_filename("MANUAL.PDF"));
        assert!(is_pdf_filename("report.Pdf"));
        assert!(!is_pdf_filename("notes.txt"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename("archive.pdf.zip"));
    }

    #[test]
    fn invalid_pdf_bytes_return_error() {
        let err = extract(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::IngestionFailure(_)));
    }

    #[test]
    fn utf16_string_decoded() {
        let mut bytes = vec![0xFE, 0xFF];
        for c in "Manual".encode_utf16() {
            bytes.extend_from_slice(&c.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Manual");
    }

    #[test]
    fn latin1_string_decoded() {
        assert_eq!(decode_pdf_string(b"Caf\xe9"), "Café");
    }
}
