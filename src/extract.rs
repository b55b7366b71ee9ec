//! Text extraction for uploaded documents (txt, PDF, DOCX).
//!
//! Dispatch is keyed on the declared file extension; the pipeline only
//! ever consumes the plain UTF-8 text returned here.

use std::io::Read;

/// File extensions the service accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx"];

/// Maximum decompressed bytes to read from a DOCX ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction error: either the format is not accepted at all, or the
/// content could not be read as the declared format.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFormat(String),
    ExtractionFailed(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFormat(ext) => {
                write!(
                    f,
                    "unsupported file format: {} (supported: {})",
                    ext,
                    SUPPORTED_EXTENSIONS.join(", ")
                )
            }
            ExtractError::ExtractionFailed(e) => write!(f, "extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Lowercased extension of `filename`, if it is one the service supports.
pub fn supported_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    if filename.contains('.') && SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

/// Extract plain text from `bytes` declared as `extension`.
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    match extension.to_ascii_lowercase().as_str() {
        "txt" => extract_txt(bytes),
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_txt(bytes: &[u8]) -> Result<String, ExtractError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ExtractError::ExtractionFailed(format!("not valid UTF-8: {}", e)))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| ExtractError::ExtractionFailed(format!("PDF: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::ExtractionFailed(format!("DOCX: {}", e)))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::ExtractionFailed("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::ExtractionFailed(format!("DOCX: {}", e)))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::ExtractionFailed(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    extract_paragraph_text(&doc_xml)
}

/// Pull `w:t` text runs out of `word/document.xml`, one line per `w:p`
/// paragraph, matching how word processors display the document.
fn extract_paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::ExtractionFailed(format!("DOCX XML: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extension_accepts_known_formats() {
        assert_eq!(supported_extension("notes.txt").as_deref(), Some("txt"));
        assert_eq!(supported_extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(supported_extension("a.b.docx").as_deref(), Some("docx"));
    }

    #[test]
    fn supported_extension_rejects_others() {
        assert!(supported_extension("image.png").is_none());
        assert!(supported_extension("noextension").is_none());
        assert!(supported_extension("archive.tar.gz").is_none());
    }

    #[test]
    fn unsupported_format_returns_error() {
        let err = extract_text(b"foo", "png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn txt_roundtrips_utf8() {
        let text = extract_text("héllo\nwörld".as_bytes(), "txt").unwrap();
        assert_eq!(text, "héllo\nwörld");
    }

    #[test]
    fn invalid_utf8_txt_returns_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], "txt").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", "docx").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }
}
