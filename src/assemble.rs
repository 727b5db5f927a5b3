//! Fragment concatenation into the final page stream.
//!
//! Merges the rendered fragments into one PDF by renumbering each source
//! document's object graph and rebuilding a single Pages tree whose kids
//! follow fragment order, so every fragment keeps its internal page order.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Result;
use crate::render::{FragmentKind, RenderedFragment};

/// Page totals of the assembled document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCounts {
    pub cover: usize,
    pub front: usize,
    pub toc: usize,
    pub total: usize,
}

impl PageCounts {
    /// Final pages preceding the content section.
    pub fn content_offset(&self) -> usize {
        self.cover + self.front + self.toc
    }
}

/// Concatenate fragments, in the given order, into one document.
///
/// Counts are re-derived from the loaded documents rather than trusted
/// from the fragments. Zero-page fragments contribute nothing.
pub fn assemble(fragments: &[RenderedFragment]) -> Result<(Vec<u8>, PageCounts)> {
    let mut counts = PageCounts::default();
    let mut merged = Document::with_version("1.5");
    let mut max_id = 1u32;
    // Page objects in final order; a map would re-sort them by object id.
    let mut page_objects: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut carried: Vec<(ObjectId, Object)> = Vec::new();

    for fragment in fragments {
        if fragment.stream.is_empty() {
            continue;
        }
        let mut doc = Document::load_mem(&fragment.stream.bytes)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = doc.get_pages();
        let fragment_pages = pages.len();
        for page_id in pages.into_values() {
            if let Ok(Object::Dictionary(dict)) = doc.get_object(page_id) {
                page_objects.push((page_id, dict.clone()));
            }
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => carried.push((object_id, object)),
            }
        }

        match fragment.kind {
            FragmentKind::Cover => counts.cover += fragment_pages,
            FragmentKind::Front => counts.front += fragment_pages,
            FragmentKind::Toc => counts.toc += fragment_pages,
            FragmentKind::Content => {}
        }
    }

    for (object_id, object) in carried {
        merged.objects.insert(object_id, object);
    }
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(page_objects.len());
    for (object_id, mut page) in page_objects {
        page.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(object_id, Object::Dictionary(page));
        kids.push(Object::Reference(object_id));
    }
    counts.total = kids.len();

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(counts.total as i64)),
    ]);
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = merged.new_object_id();
    let catalog = Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.renumber_objects();
    merged.compress();

    let mut bytes = Vec::new();
    merged.save_to(&mut bytes)?;
    Ok((bytes, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PageStream;
    use lopdf::content::{Content, Operation};
    use lopdf::Stream;

    /// Minimal PDF with one page of literal text per entry.
    fn pdf_with_pages(texts: &[&str]) -> PageStream {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(
                "F1",
                Object::Reference(font_id),
            )])),
        )]));

        let mut kids = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().unwrap(),
            ));
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
        let pages_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count as i64)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

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

    fn fragment(kind: FragmentKind, texts: &[&str]) -> RenderedFragment {
        RenderedFragment {
            kind,
            stream: pdf_with_pages(texts),
        }
    }

    fn empty(kind: FragmentKind) -> RenderedFragment {
        RenderedFragment {
            kind,
            stream: PageStream::empty(),
        }
    }

    #[test]
    fn counts_and_order() {
        let fragments = [
            fragment(FragmentKind::Cover, &["cover"]),
            fragment(FragmentKind::Front, &["front-1", "front-2"]),
            fragment(FragmentKind::Toc, &["contents"]),
            fragment(FragmentKind::Content, &["ch-1", "ch-2", "ch-3"]),
        ];
        let (bytes, counts) = assemble(&fragments).unwrap();
        assert_eq!(
            counts,
            PageCounts {
                cover: 1,
                front: 2,
                toc: 1,
                total: 7
            }
        );
        assert_eq!(counts.content_offset(), 4);

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 7);
        // Fragment order and internal page order both survive the merge.
        let expected = ["cover", "front-1", "front-2", "contents", "ch-1", "ch-2", "ch-3"];
        for (page, text) in expected.iter().enumerate() {
            let extracted = doc.extract_text(&[page as u32 + 1]).unwrap();
            assert!(
                extracted.contains(text),
                "page {page} should contain {text:?}, got {extracted:?}"
            );
        }
    }

    #[test]
    fn missing_optional_fragments_contribute_nothing() {
        let fragments = [
            fragment(FragmentKind::Cover, &["cover"]),
            empty(FragmentKind::Front),
            empty(FragmentKind::Toc),
            fragment(FragmentKind::Content, &["ch-1"]),
        ];
        let (bytes, counts) = assemble(&fragments).unwrap();
        assert_eq!(
            counts,
            PageCounts {
                cover: 1,
                front: 0,
                toc: 0,
                total: 2
            }
        );
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn cover_only() {
        let fragments = [
            fragment(FragmentKind::Cover, &["cover"]),
            empty(FragmentKind::Front),
            empty(FragmentKind::Toc),
            empty(FragmentKind::Content),
        ];
        let (_, counts) = assemble(&fragments).unwrap();
        assert_eq!(counts.total, 1);
    }
}
