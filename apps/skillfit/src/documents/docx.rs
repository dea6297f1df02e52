use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::documents::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Paragraph text of a `.docx` file, one line per paragraph.
pub fn extract_docx_text(path: &Path) -> Result<String, DocumentError> {
    read_docx(File::open(path)?)
}

pub fn read_docx<R: Read + Seek>(reader: R) -> Result<String, DocumentError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    Ok(document_xml_to_text(&xml))
}

/// Text runs (`<w:t>`), tabs and breaks, with paragraphs split on `</w:p>`.
fn document_xml_to_text(xml: &str) -> String {
    let paragraphs: Vec<String> = xml
        .split("</w:p>")
        .map(|chunk| {
            run_pattern()
                .captures_iter(chunk)
                .map(|caps| {
                    if let Some(text) = caps.get(1) {
                        unescape_xml(text.as_str())
                    } else if caps.get(2).is_some() {
                        "\t".to_string()
                    } else {
                        "\n".to_string()
                    }
                })
                .collect::<String>()
        })
        .collect();
    paragraphs.join("\n").trim().to_string()
}

fn run_pattern() -> &'static Regex {
    static RUN: OnceLock<Regex> = OnceLock::new();
    RUN.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:(tab)\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>")
            .expect("static regex is valid")
    })
}

fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// A minimal `.docx` archive holding one paragraph per line of `paragraphs`.
#[cfg(test)]
pub(crate) fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    docx_from_xml(&format!(
        "<?xml version=\"1.0\"?><w:document><w:body>{body}</w:body></w:document>"
    ))
}

#[cfg(test)]
pub(crate) fn docx_from_xml(document_xml: &str) -> Vec<u8> {
    use std::io::{Cursor, Write};

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>Jean Dupont</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Statisticien </w:t></w:r><w:r><w:t>&amp; analyste</w:t></w:r></w:p>
            <w:p><w:r><w:t>Compétences</w:t><w:tab/><w:t>R, SAS</w:t></w:r></w:p>
            <w:sectPr/></w:body></w:document>"#;
        let text = read_docx(Cursor::new(docx_from_xml(xml))).unwrap();
        assert_eq!(text, "Jean Dupont\nStatisticien & analyste\nCompétences\tR, SAS");
    }

    #[test]
    fn test_fixture_reads_back() {
        let text = read_docx(Cursor::new(docx_fixture(&["Zoé Lefèvre", "Data Analyst"]))).unwrap();
        assert_eq!(text, "Zoé Lefèvre\nData Analyst");
    }

    #[test]
    fn test_table_markup_is_not_mistaken_for_text() {
        let xml = "<w:tbl><w:tblPr/><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        assert_eq!(document_xml_to_text(xml), "cell");
    }

    #[test]
    fn test_entities_are_unescaped() {
        assert_eq!(unescape_xml("a &lt;b&gt; &quot;c&quot; &apos;d&apos;"), "a <b> \"c\" 'd'");
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_archive_without_document_part_fails() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("other.xml", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = read_docx(Cursor::new(buffer.into_inner())).unwrap_err();
        assert!(matches!(err, DocumentError::Docx(_)));
    }

    #[test]
    fn test_not_a_zip_fails() {
        let err = read_docx(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, DocumentError::Docx(_)));
    }
}
