//! Template locator
//!
//! Finds insertion points in a template by scanning its body paragraphs for
//! literal anchor markers. A marker matches a paragraph when it is a substring
//! of the paragraph text; the first matching paragraph wins.

use crate::docx::TemplateDocument;

/// Index of the first body paragraph whose text contains `marker`
pub fn locate(doc: &TemplateDocument, marker: &str) -> Option<usize> {
    if marker.is_empty() {
        return None;
    }
    doc.paragraph_texts()
        .iter()
        .position(|text| text.contains(marker))
}

/// Resolve several markers with a single scan of the template
///
/// The result is in `markers` order; each marker is found or not
/// independently of the others.
pub fn locate_all<'a>(doc: &TemplateDocument, markers: &[&'a str]) -> Vec<(&'a str, Option<usize>)> {
    let mut found: Vec<(&'a str, Option<usize>)> = markers.iter().map(|m| (*m, None)).collect();

    for (index, text) in doc.paragraph_texts().iter().enumerate() {
        for (marker, slot) in found.iter_mut() {
            if slot.is_none() && !marker.is_empty() && text.contains(*marker) {
                *slot = Some(index);
            }
        }
        if found.iter().all(|(_, slot)| slot.is_some()) {
            break;
        }
    }

    for (marker, slot) in &found {
        match slot {
            Some(index) => log::debug!("Anchor {:?} found at paragraph {}", marker, index),
            None => log::debug!("Anchor {:?} not found", marker),
        }
    }
    found
}
