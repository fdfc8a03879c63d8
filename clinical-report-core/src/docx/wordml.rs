//! WordprocessingML helpers: paragraph text, placeholder replacement and
//! builders for new paragraphs and runs.

use super::xml::{XmlElement, XmlNode};

/// Run-level formatting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: bool,
    /// Font size in half-points (`w:sz`)
    pub size_half_points: Option<u32>,
}

/// Paragraph-level formatting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParagraphFormat {
    pub center: bool,
}

/// Build a run; `\n` becomes a line break and `\t` a tab
pub fn run(text: &str, format: RunFormat) -> XmlElement {
    let mut r = XmlElement::new("w:r");

    if format.bold || format.size_half_points.is_some() {
        let mut rpr = XmlElement::new("w:rPr");
        if format.bold {
            rpr = rpr.with_child(XmlElement::new("w:b"));
        }
        if let Some(size) = format.size_half_points {
            rpr = rpr
                .with_child(XmlElement::new("w:sz").with_attr("w:val", size.to_string()))
                .with_child(XmlElement::new("w:szCs").with_attr("w:val", size.to_string()));
        }
        r = r.with_child(rpr);
    }

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            r = r.with_child(XmlElement::new("w:br"));
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                r = r.with_child(XmlElement::new("w:tab"));
            }
            if !segment.is_empty() {
                let mut t = XmlElement::new("w:t");
                t.set_text(segment);
                r = r.with_child(t);
            }
        }
    }
    r
}

/// Build a paragraph holding one run
pub fn paragraph(text: &str, para: ParagraphFormat, format: RunFormat) -> XmlElement {
    let mut p = XmlElement::new("w:p");
    if para.center {
        p = p.with_child(
            XmlElement::new("w:pPr").with_child(XmlElement::new("w:jc").with_attr("w:val", "center")),
        );
    }
    if text.is_empty() {
        return p;
    }
    p.with_child(run(text, format))
}

/// Plain paragraph with default formatting
pub fn plain_paragraph(text: &str) -> XmlElement {
    paragraph(text, ParagraphFormat::default(), RunFormat::default())
}

/// Text of a paragraph: its `w:t` contents in document order
///
/// Paragraphs nested inside the paragraph (text boxes) are not included.
pub fn paragraph_text(p: &XmlElement) -> String {
    let mut out = String::new();
    collect_text(p, &mut out);
    out
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in element.elements() {
        if child.is("t") {
            out.push_str(&child.text());
        } else if !child.is("p") {
            collect_text(child, out);
        }
    }
}

fn text_elements_mut<'a>(element: &'a mut XmlElement, out: &mut Vec<&'a mut XmlElement>) {
    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            if child.is("t") {
                out.push(child);
            } else if !child.is("p") {
                text_elements_mut(child, out);
            }
        }
    }
}

/// Visit every paragraph below `element`, including table cells and text boxes
pub fn for_each_paragraph_mut<F>(element: &mut XmlElement, f: &mut F)
where
    F: FnMut(&mut XmlElement),
{
    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            if child.is("p") {
                f(child);
            }
            for_each_paragraph_mut(child, f);
        }
    }
}

/// Replace placeholder tokens in one paragraph
///
/// Tokens contained in a single run are replaced in place, keeping that
/// run's formatting. A token split across runs (Word does this after
/// spell-checking or partial edits) is first merged into the first text
/// element it touches; text elements outside the token, and the tabs and
/// breaks between them, stay where they are. Returns the number of distinct
/// tokens replaced.
pub fn replace_in_paragraph(p: &mut XmlElement, replacements: &[(String, String)]) -> usize {
    let mut slots: Vec<&mut XmlElement> = Vec::new();
    text_elements_mut(p, &mut slots);

    let mut texts: Vec<String> = slots.iter().map(|t| t.text()).collect();
    let joined: String = texts.concat();

    let present: Vec<&(String, String)> = replacements
        .iter()
        .filter(|(key, _)| !key.is_empty() && joined.contains(key.as_str()))
        .collect();
    if present.is_empty() {
        return 0;
    }

    for (first, last) in straddled_slots(&texts, &joined, &present) {
        let merged = texts[first..=last].concat();
        for text in &mut texts[first + 1..=last] {
            text.clear();
        }
        texts[first] = merged;
    }

    for (slot, text) in slots.iter_mut().zip(texts.iter()) {
        let replaced = apply(text, &present);
        if replaced != slot.text() {
            slot.set_text(replaced);
        }
    }

    present.len()
}

/// Ranges of text slots crossed by a token occurrence, overlapping ranges merged
fn straddled_slots(texts: &[String], joined: &str, keys: &[&(String, String)]) -> Vec<(usize, usize)> {
    let mut ends = Vec::with_capacity(texts.len());
    let mut offset = 0;
    for text in texts {
        offset += text.len();
        ends.push(offset);
    }
    // slot holding the byte at `pos`
    let slot_at = |pos: usize| ends.partition_point(|&end| end <= pos);

    let mut spans = Vec::new();
    for (key, _) in keys {
        for (start, token) in joined.match_indices(key.as_str()) {
            let first = slot_at(start);
            let last = slot_at(start + token.len() - 1);
            if first < last {
                spans.push((first, last));
            }
        }
    }
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (first, last) in spans {
        match merged.last_mut() {
            Some(range) if first <= range.1 => range.1 = range.1.max(last),
            _ => merged.push((first, last)),
        }
    }
    merged
}

fn apply(text: &str, replacements: &[&(String, String)]) -> String {
    let mut out = text.to_string();
    for (key, value) in replacements {
        out = out.replace(key.as_str(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para_with_runs(parts: &[(&str, bool)]) -> XmlElement {
        let mut p = XmlElement::new("w:p");
        for (text, bold) in parts {
            p = p.with_child(run(text, RunFormat { bold: *bold, size_half_points: None }));
        }
        p
    }

    fn map(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_replace_within_runs() {
        let mut p = para_with_runs(&[("Patient: <<SampleID>>, ", false), ("run <<RunDate>>", true)]);
        let replaced = replace_in_paragraph(
            &mut p,
            &map(&[("<<SampleID>>", "S1"), ("<<RunDate>>", "2024-01-01")]),
        );

        assert_eq!(replaced, 2);
        assert_eq!(paragraph_text(&p), "Patient: S1, run 2024-01-01");
        // second run keeps its bold formatting
        let second = p.elements().nth(1).unwrap();
        assert!(second.find_child("rPr").unwrap().find_child("b").is_some());
    }

    #[test]
    fn test_replace_split_token() {
        let mut p = para_with_runs(&[("ID: <<Sample", false), ("ID>> end", false)]);
        let replaced = replace_in_paragraph(&mut p, &map(&[("<<SampleID>>", "S9")]));
        assert_eq!(replaced, 1);
        assert_eq!(paragraph_text(&p), "ID: S9 end");
    }

    #[test]
    fn test_split_token_keeps_tabs_in_place() {
        let mut p = para_with_runs(&[("Name:\t<<Sam", false), ("pleID>>", true), (" done", false)]);
        let replaced = replace_in_paragraph(&mut p, &map(&[("<<SampleID>>", "S1")]));
        assert_eq!(replaced, 1);

        let first = p.elements().next().unwrap();
        let parts: Vec<_> = first
            .elements()
            .map(|e| (e.local_name().to_string(), e.text()))
            .collect();
        assert_eq!(
            parts,
            vec![
                ("t".to_string(), "Name:".to_string()),
                ("tab".to_string(), String::new()),
                ("t".to_string(), "S1".to_string()),
            ]
        );
        // the run after the token keeps its own text
        assert_eq!(p.elements().nth(2).unwrap().find_child("t").unwrap().text(), " done");
        assert_eq!(paragraph_text(&p), "Name:S1 done");
    }

    #[test]
    fn test_unmatched_placeholders_survive() {
        let mut p = para_with_runs(&[("<<A>> and <<B>>", false)]);
        replace_in_paragraph(&mut p, &map(&[("<<A>>", "1")]));
        assert_eq!(paragraph_text(&p), "1 and <<B>>");
        assert_eq!(replace_in_paragraph(&mut p, &map(&[("<<C>>", "3")])), 0);
    }

    #[test]
    fn test_run_breaks_and_tabs() {
        let r = run("a\tb\nc", RunFormat::default());
        let names: Vec<_> = r.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, vec!["t", "tab", "t", "br", "t"]);
    }

    #[test]
    fn test_run_format() {
        let r = run("x", RunFormat { bold: true, size_half_points: Some(16) });
        let rpr = r.find_child("rPr").unwrap();
        assert!(rpr.find_child("b").is_some());
        assert_eq!(rpr.find_child("sz").unwrap().attr("w:val"), Some("16"));
    }

    #[test]
    fn test_for_each_paragraph_reaches_table_cells() {
        let cell_para = plain_paragraph("<<X>>");
        let table = XmlElement::new("w:tbl").with_child(
            XmlElement::new("w:tr").with_child(XmlElement::new("w:tc").with_child(cell_para)),
        );
        let mut body = XmlElement::new("w:body")
            .with_child(plain_paragraph("<<X>>"))
            .with_child(table);

        let mut count = 0;
        for_each_paragraph_mut(&mut body, &mut |p| {
            count += replace_in_paragraph(p, &map(&[("<<X>>", "y")]));
        });
        assert_eq!(count, 2);
    }
}
