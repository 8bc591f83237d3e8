//! Page-level document surgery with lopdf.
//!
//! Extraction works by whitelist: load the source, delete every page that
//! is not wanted, prune the objects nothing references any more, and save.
//! What remains is exactly the resources the kept pages need.

use crate::error::WorkbenchError;
use lopdf::Document;
use std::collections::HashSet;
use tracing::debug;

/// Load PDF bytes, mapping parse errors to [`WorkbenchError::DocumentFailed`].
pub fn load(bytes: &[u8]) -> Result<Document, WorkbenchError> {
    Document::load_mem(bytes).map_err(|e| WorkbenchError::DocumentFailed(format!("parse: {e}")))
}

/// Serialise a document to bytes.
pub fn save(doc: &mut Document) -> Result<Vec<u8>, WorkbenchError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| WorkbenchError::DocumentFailed(format!("save: {e}")))?;
    Ok(buffer)
}

/// Number of pages in a PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize, WorkbenchError> {
    Ok(load(bytes)?.get_pages().len())
}

/// Build a new PDF holding only `pages` (1-indexed) of `bytes`.
pub fn extract_pages(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, WorkbenchError> {
    if pages.is_empty() {
        return Err(WorkbenchError::DocumentFailed("no pages specified".into()));
    }

    let mut doc = load(bytes)?;
    let total = doc.get_pages().len() as u32;

    if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > total) {
        return Err(WorkbenchError::DocumentFailed(format!(
            "page {bad} does not exist (document has {total} pages)"
        )));
    }

    let keep: HashSet<u32> = pages.iter().copied().collect();
    // Delete from the back so earlier page numbers stay valid.
    let mut delete: Vec<u32> = (1..=total).filter(|p| !keep.contains(p)).collect();
    delete.reverse();
    for page in delete {
        doc.delete_pages(&[page]);
    }

    doc.prune_objects();
    doc.compress();

    debug!("Extracted {} of {} pages", keep.len(), total);
    save(&mut doc)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, Stream};

    /// A `num_pages`-page Letter document whose pages read "Page N".
    pub fn sample_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut page_ids = Vec::new();

        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            page_ids.push(doc.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_pdf;
    use super::*;

    #[test]
    fn page_count_reads_tree() {
        assert_eq!(page_count(&sample_pdf(4)).unwrap(), 4);
    }

    #[test]
    fn extract_keeps_only_requested_pages() {
        let out = extract_pages(&sample_pdf(5), &[2, 4]).unwrap();
        assert_eq!(page_count(&out).unwrap(), 2);
    }

    #[test]
    fn extract_single_page() {
        let out = extract_pages(&sample_pdf(3), &[3]).unwrap();
        assert_eq!(page_count(&out).unwrap(), 1);
    }

    #[test]
    fn extract_rejects_missing_page() {
        let err = extract_pages(&sample_pdf(2), &[3]).unwrap_err();
        assert!(err.to_string().contains("page 3 does not exist"));
    }

    #[test]
    fn extract_rejects_empty_request() {
        assert!(extract_pages(&sample_pdf(2), &[]).is_err());
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        assert!(page_count(b"not a pdf").is_err());
    }
}
