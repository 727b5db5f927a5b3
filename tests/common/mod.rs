//! Shared test support: a deterministic in-process render engine.

use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use bindery::{PageStream, RenderEngine, Result};

/// Deterministic layout double.
///
/// Every non-empty line of the document body becomes one block,
/// `blocks_per_page` blocks fill a page, and each page's text is its
/// blocks' text (tags stripped) joined with spaces. The output is a real
/// PDF, so assembly, stamping and text extraction run against it
/// unmodified.
pub struct FakeEngine {
    pub blocks_per_page: usize,
}

impl FakeEngine {
    pub fn new(blocks_per_page: usize) -> Self {
        Self { blocks_per_page }
    }
}

impl RenderEngine for FakeEngine {
    fn render(&self, html: &str, _css: &str, _timeout: Duration) -> Result<PageStream> {
        let blocks = body_blocks(html);
        let mut pages: Vec<String> = blocks
            .chunks(self.blocks_per_page.max(1))
            .map(|chunk| chunk.join(" "))
            .collect();
        if pages.is_empty() {
            // Real engines emit at least one page for an empty document.
            pages.push(String::new());
        }
        Ok(build_pdf(&pages))
    }
}

/// Extract the body's block lines with tags stripped.
fn body_blocks(html: &str) -> Vec<String> {
    let body = match html.find("<body>") {
        Some(i) => &html[i + "<body>".len()..],
        None => html,
    };
    let body = match body.find("</body>") {
        Some(i) => &body[..i],
        None => body,
    };
    body.lines()
        .map(strip_tags)
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_tags(line: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Build a minimal PDF with one page of literal text per entry.
pub fn build_pdf(pages: &[String]) -> PageStream {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    PageStream {
        bytes,
        page_count: count,
    }
}
