use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::layout::{ReportLayout, ReportPage, PAGE_HEIGHT, PAGE_WIDTH};
use crate::domain::error::{AppError, Result};

const FONT_NAME: &str = "F1";
const FONT_SIZE: i64 = 12;

/// Serializes a [`ReportLayout`] into a PDF with the standard Helvetica font.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    base_font: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self {
            base_font: "Helvetica".to_string(),
        }
    }
}

impl PdfWriter {
    pub fn write(&self, layout: &ReportLayout) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font.as_str(),
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_NAME => font_id,
            },
        });

        let mut kids = Vec::with_capacity(layout.pages.len());
        for page in &layout.pages {
            let content = page_content(page)
                .encode()
                .map_err(|e| AppError::Internal(format!("Failed to encode report page: {e}")))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let page_count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AppError::Internal(format!("Failed to write report PDF: {e}")))?;
        Ok(bytes)
    }
}

fn page_content(page: &ReportPage) -> Content {
    let mut operations = Vec::with_capacity(page.lines.len() * 4);
    for line in &page.lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_NAME.as_bytes().to_vec()), Object::Integer(FONT_SIZE)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(line.x), Object::Integer(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(&line.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Text in the font's WinAnsi encoding; characters it cannot show become `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (encoded, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&encoded);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::report::layout::ReportLine;

    fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let raw = doc.get_page_content(*page_id).unwrap();
                Content::decode(&raw)
                    .unwrap()
                    .operations
                    .into_iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.first() {
                        Some(Object::String(bytes, _)) => {
                            Some(WINDOWS_1252.decode(bytes).0.into_owned())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn layout(pages: Vec<Vec<&str>>) -> ReportLayout {
        ReportLayout {
            pages: pages
                .into_iter()
                .map(|texts| ReportPage {
                    lines: texts
                        .into_iter()
                        .enumerate()
                        .map(|(i, text)| ReportLine {
                            x: 100,
                            y: 800 - 20 * i as i64,
                            text: text.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn writes_loadable_pdf_with_lines_in_order() {
        let bytes = PdfWriter::default()
            .write(&layout(vec![vec!["Title (draft)", "Total Equipment: 3"]]))
            .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(
            page_texts(&bytes),
            vec![vec!["Title (draft)".to_string(), "Total Equipment: 3".to_string()]]
        );
    }

    #[test]
    fn writes_one_pdf_page_per_layout_page() {
        let bytes = PdfWriter::default()
            .write(&layout(vec![vec!["a"], vec!["b", "c"]]))
            .unwrap();
        assert_eq!(page_texts(&bytes).len(), 2);
    }

    #[test]
    fn non_latin_text_degrades_to_question_marks() {
        assert_eq!(win_ansi_bytes("Küh"), vec![b'K', 0xFC, b'h']);
        assert_eq!(win_ansi_bytes("泵"), vec![b'?']);
    }
}
