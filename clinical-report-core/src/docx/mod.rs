//! Word document handling
//!
//! This module contains the DOCX package reader/writer, the owned XML tree
//! used for `word/document.xml`, and WordprocessingML helpers.

pub mod package;
pub mod wordml;
pub mod xml;

// Re-export key types for convenience
pub use package::{TemplateDocument, MAIN_DOCUMENT_PART};
pub use wordml::{paragraph_text, replace_in_paragraph, ParagraphFormat, RunFormat};
pub use xml::{XmlElement, XmlNode};
