//! DOCX package handling
//!
//! A `TemplateDocument` keeps every zip entry of the template in its original
//! order. The main document part is held as a parsed tree; all other parts are
//! immutable bytes shared between instances.

use super::wordml::paragraph_text;
use super::xml::{parse_xml, write_xml, XmlElement, XmlNode};
use crate::types::{ReportError, Result};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Path of the main document part inside the package
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
enum PackagePart {
    /// A part copied verbatim
    Raw { name: String, data: Arc<Vec<u8>> },
    /// A directory entry
    Directory { name: String },
    /// `word/document.xml`, re-serialized from the tree
    MainDocument,
}

/// A parsed Word document, used both as template and as per-sample report
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    parts: Vec<PackagePart>,
    /// Root `w:document` element, without its body
    document: XmlElement,
    /// Child position of the body inside the root
    body_position: usize,
    /// The `w:body` element
    body: XmlElement,
}

impl TemplateDocument {
    /// Open a `.docx` file
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Loading template: {:?}", path);
        let bytes = std::fs::read(path).map_err(|e| ReportError::load(path, e))?;
        let template = Self::from_bytes(&bytes).map_err(|e| match e {
            ReportError::Template(reason) => ReportError::Template(format!("{:?}: {}", path, reason)),
            other => other,
        })?;
        log::debug!("Template has {} paragraph(s)", template.paragraph_count());
        Ok(template)
    }

    /// Parse a `.docx` package held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ReportError::Template(format!("not a valid .docx (zip) file: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut document = None;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ReportError::Template(format!("unreadable zip entry {}: {}", i, e)))?;
            let name = file.name().to_string();

            if file.is_dir() {
                parts.push(PackagePart::Directory { name });
                continue;
            }

            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| ReportError::Template(format!("unreadable zip entry {:?}: {}", name, e)))?;

            if name == MAIN_DOCUMENT_PART {
                document = Some(parse_xml(&data)?);
                parts.push(PackagePart::MainDocument);
            } else {
                parts.push(PackagePart::Raw {
                    name,
                    data: Arc::new(data),
                });
            }
        }

        let mut document = document
            .ok_or_else(|| ReportError::Template(format!("missing {}", MAIN_DOCUMENT_PART)))?;
        let body_position = document
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.is("body")))
            .ok_or_else(|| ReportError::Template("document has no w:body".into()))?;
        let body = match document.children.remove(body_position) {
            XmlNode::Element(body) => body,
            XmlNode::Text(_) => return Err(ReportError::Template("document has no w:body".into())),
        };

        Ok(Self {
            parts,
            document,
            body_position,
            body,
        })
    }

    /// Independent copy for one sample
    ///
    /// The document tree is deep-copied; the other parts are never modified
    /// and stay shared.
    pub fn instantiate(&self) -> Self {
        self.clone()
    }

    /// The `w:body` element
    pub fn body(&self) -> &XmlElement {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut XmlElement {
        &mut self.body
    }

    /// Text of each body-level paragraph, in document order
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.body()
            .elements()
            .filter(|e| e.is("p"))
            .map(paragraph_text)
            .collect()
    }

    pub fn paragraph_count(&self) -> usize {
        self.body().elements().filter(|e| e.is("p")).count()
    }

    /// Local names of the body's block elements (`p`, `tbl`, `sectPr`, ...)
    pub fn block_kinds(&self) -> Vec<String> {
        self.body().elements().map(|e| e.local_name().to_string()).collect()
    }

    /// Insert `blocks` directly after the body paragraph with index `paragraph`
    pub fn insert_after_paragraph(&mut self, paragraph: usize, blocks: Vec<XmlElement>) -> Result<()> {
        let body = self.body_mut();
        let position = body
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, XmlNode::Element(e) if e.is("p")))
            .nth(paragraph)
            .map(|(i, _)| i)
            .ok_or_else(|| {
                ReportError::Template(format!("paragraph index {} out of range", paragraph))
            })?;

        let tail: Vec<XmlNode> = body.children.split_off(position + 1);
        body.children.extend(blocks.into_iter().map(XmlNode::Element));
        body.children.extend(tail);
        Ok(())
    }

    /// Append `blocks` at the end of the body, before the section properties
    pub fn append(&mut self, blocks: Vec<XmlElement>) {
        let body = self.body_mut();
        let position = body
            .children
            .iter()
            .rposition(|node| matches!(node, XmlNode::Element(e) if e.is("sectPr")))
            .unwrap_or(body.children.len());

        let tail: Vec<XmlNode> = body.children.split_off(position);
        body.children.extend(blocks.into_iter().map(XmlNode::Element));
        body.children.extend(tail);
    }

    /// Serialize the package
    ///
    /// Entries keep their template order and a fixed timestamp, so the same
    /// document always produces the same bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            match part {
                PackagePart::Directory { name } => {
                    zip.add_directory(name.clone(), options).map_err(zip_error)?;
                }
                PackagePart::Raw { name, data } => {
                    zip.start_file(name.clone(), options).map_err(zip_error)?;
                    zip.write_all(data)?;
                }
                PackagePart::MainDocument => {
                    let xml = write_xml(&self.document_root())?;
                    zip.start_file(MAIN_DOCUMENT_PART, options).map_err(zip_error)?;
                    zip.write_all(&xml)?;
                }
            }
        }

        let cursor = zip.finish().map_err(zip_error)?;
        Ok(cursor.into_inner())
    }

    /// The full `w:document` tree with the body in place
    fn document_root(&self) -> XmlElement {
        let mut root = self.document.clone();
        let position = self.body_position.min(root.children.len());
        root.children.insert(position, XmlNode::Element(self.body.clone()));
        root
    }

    /// Write the package to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes().map_err(|e| ReportError::write(path, e))?;
        std::fs::write(path, bytes).map_err(|e| ReportError::write(path, e))
    }
}

fn zip_error(e: zip::result::ZipError) -> ReportError {
    ReportError::Template(format!("failed to build .docx package: {}", e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::docx::wordml::plain_paragraph;

    /// Build a minimal `.docx` whose body holds one paragraph per entry
    pub(crate) fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut body = String::new();
        for text in paragraphs {
            body.push_str(&format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", quick_xml::escape::escape(*text)));
        }
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}<w:sectPr/></w:body></w:document>",
            body
        );

        let options = SimpleFileOptions::default();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file(MAIN_DOCUMENT_PART, options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_and_paragraphs() {
        let doc = TemplateDocument::from_bytes(&docx_with_paragraphs(&["Intro", "Somatic Variants", "Footer"])).unwrap();
        assert_eq!(doc.paragraph_texts(), vec!["Intro", "Somatic Variants", "Footer"]);
        assert_eq!(doc.block_kinds(), vec!["p", "p", "p", "sectPr"]);
    }

    #[test]
    fn test_insert_after_paragraph() {
        let mut doc = TemplateDocument::from_bytes(&docx_with_paragraphs(&["Intro", "Anchor", "Footer"])).unwrap();
        doc.insert_after_paragraph(1, vec![XmlElement::new("w:tbl")]).unwrap();
        assert_eq!(doc.block_kinds(), vec!["p", "p", "tbl", "p", "sectPr"]);

        assert!(doc.insert_after_paragraph(3, vec![XmlElement::new("w:tbl")]).is_err());
    }

    #[test]
    fn test_append_keeps_section_properties_last() {
        let mut doc = TemplateDocument::from_bytes(&docx_with_paragraphs(&["Intro"])).unwrap();
        doc.append(vec![plain_paragraph("caption"), XmlElement::new("w:tbl")]);
        assert_eq!(doc.block_kinds(), vec!["p", "p", "tbl", "sectPr"]);
    }

    #[test]
    fn test_instances_are_independent() {
        let template = TemplateDocument::from_bytes(&docx_with_paragraphs(&["Intro"])).unwrap();
        let mut first = template.instantiate();
        first.append(vec![XmlElement::new("w:tbl")]);

        let second = template.instantiate();
        assert_eq!(second.block_kinds(), vec!["p", "sectPr"]);
        assert_eq!(template.block_kinds(), vec!["p", "sectPr"]);
    }

    #[test]
    fn test_serialization_roundtrip_is_stable() {
        let template = TemplateDocument::from_bytes(&docx_with_paragraphs(&["Intro", "Footer"])).unwrap();
        let bytes = template.to_bytes().unwrap();
        assert_eq!(bytes, template.to_bytes().unwrap());

        let reopened = TemplateDocument::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.paragraph_texts(), vec!["Intro", "Footer"]);
    }

    #[test]
    fn test_invalid_packages() {
        assert!(matches!(TemplateDocument::from_bytes(b"not a zip"), Err(ReportError::Template(_))));

        let options = SimpleFileOptions::default();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(TemplateDocument::from_bytes(&bytes), Err(ReportError::Template(_))));
    }
}
