//! Merge PDFs into one document.
//!
//! The first document is the base. Every later document has its object ids
//! shifted past the base's highest id, its objects are copied in, and its
//! pages are appended to the base page tree. Attributes a page inherits from
//! its own page tree (media box, resources) are copied onto the page first,
//! since the page is re-parented under the base root.

use crate::artifact::{self, OutputArtifact};
use crate::error::WorkbenchError;
use crate::pipeline::pages;
use crate::source::SourceFile;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

/// Name of the merged output.
pub const MERGED_NAME: &str = "merged.pdf";

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge `sources` in order into `merged.pdf`.
pub fn merge_documents(sources: &[SourceFile]) -> Result<OutputArtifact, WorkbenchError> {
    if sources.is_empty() {
        return Err(WorkbenchError::DocumentFailed("no documents to merge".into()));
    }

    let mut loaded = Vec::with_capacity(sources.len());
    for source in sources {
        let mut doc = pages::load(source.bytes()).map_err(|e| WorkbenchError::OpenFailed {
            name: source.name().to_string(),
            detail: e.to_string(),
        })?;
        materialize_inherited(&mut doc);
        debug!("Loaded {} ({} pages)", source.name(), doc.get_pages().len());
        loaded.push(doc);
    }

    let mut docs = loaded.into_iter();
    let mut dest = docs
        .next()
        .ok_or_else(|| WorkbenchError::Internal("merge input vanished".into()))?;
    let mut page_refs: Vec<ObjectId> = dest.get_pages().into_values().collect();

    for source in docs {
        let offset = dest.max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();

        for ((num, generation), mut object) in source.objects {
            shift_references(&mut object, offset);
            dest.objects.insert((num + offset, generation), object);
        }
        page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, generation)| (num + offset, generation)),
        );
        dest.max_id = dest.max_id.max(source.max_id + offset);
    }

    rebuild_page_tree(&mut dest, &page_refs)?;
    dest.prune_objects();
    dest.compress();

    let bytes = pages::save(&mut dest)?;
    info!(
        "Merged {} documents ({} pages) → {} bytes",
        sources.len(),
        page_refs.len(),
        bytes.len()
    );
    Ok(artifact::pdf_artifact(MERGED_NAME.to_string(), bytes))
}

/// Add `offset` to every object number `object` refers to.
fn shift_references(object: &mut Object, offset: u32) {
    match object {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => items.iter_mut().for_each(|o| shift_references(o, offset)),
        Object::Dictionary(dict) => dict
            .iter_mut()
            .for_each(|(_, v)| shift_references(v, offset)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, v)| shift_references(v, offset)),
        _ => {}
    }
}

/// Copy inheritable attributes from ancestors onto each page that lacks them.
fn materialize_inherited(doc: &mut Document) {
    for page_id in doc.get_pages().into_values() {
        let mut missing: Vec<(&[u8], Object)> = Vec::new();

        for key in INHERITABLE {
            let Ok(page) = doc.get_dictionary(page_id) else {
                break;
            };
            if page.has(key) {
                continue;
            }
            let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
            // Bounded walk; malformed trees can loop.
            for _ in 0..64 {
                let Some(id) = parent else { break };
                let Ok(node) = doc.get_dictionary(id) else { break };
                if let Ok(value) = node.get(key) {
                    missing.push((key, value.clone()));
                    break;
                }
                parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            }
        }

        if missing.is_empty() {
            continue;
        }
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in missing {
                page.set(key, value);
            }
        }
    }
}

/// Point the root page tree node at `page_refs`, flat, in order.
fn rebuild_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), WorkbenchError> {
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| WorkbenchError::DocumentFailed(format!("page tree root: {e}")))?;

    let pages_dict = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WorkbenchError::DocumentFailed(format!("page tree root: {e}")))?;
    pages_dict.set(
        "Kids",
        Object::Array(page_refs.iter().map(|&id| Object::Reference(id)).collect()),
    );
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    for &page_id in page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }
    Ok(())
}
