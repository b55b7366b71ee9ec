//! Integration tests for document text extraction.

use doc_qa::extract::{extract_text, supported_extension, ExtractError};

/// Minimal valid PDF containing the text "quarterly leave policy".
/// Builds the body first, then the xref table with correct byte offsets
/// so the PDF parser accepts it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal DOCX (ZIP) whose `word/document.xml` holds one paragraph per
/// input string.
fn minimal_docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

#[test]
fn txt_extraction_passes_through() {
    let text = extract_text(b"plain text body", "txt").unwrap();
    assert_eq!(text, "plain text body");
}

#[test]
fn pdf_extraction_recovers_phrase() {
    let pdf = minimal_pdf_with_phrase("quarterly leave policy");
    let text = extract_text(&pdf, "pdf").unwrap();
    assert!(
        text.contains("quarterly leave policy"),
        "extracted text was: {:?}",
        text
    );
}

#[test]
fn docx_extraction_joins_paragraphs_with_newlines() {
    let docx = minimal_docx_with_paragraphs(&["first paragraph", "second paragraph"]);
    let text = extract_text(&docx, "docx").unwrap();
    assert_eq!(text, "first paragraph\nsecond paragraph");
}

#[test]
fn docx_missing_document_xml_fails() {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        zip.finish().unwrap();
    }
    let err = extract_text(&buf, "docx").unwrap_err();
    assert!(matches!(err, ExtractError::ExtractionFailed(_)));
}

#[test]
fn extension_check_matches_extraction_dispatch() {
    // Everything supported_extension accepts must extract (or fail on
    // content, not format); everything else is UnsupportedFormat.
    assert!(supported_extension("report.docx").is_some());
    let err = extract_text(b"bytes", "md").unwrap_err();
    assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
}
