//! End-to-end tests: workbook/HTML inputs -> populated .docx reports

use clinical_report_core::docx::{paragraph_text, XmlElement};
use clinical_report_core::{
    load_dataset, GenerationMode, ReportConfig, ReportError, ReportGenerator, SampleGroup, SourceKind,
    TemplateDocument,
};
use rust_xlsxwriter::Workbook;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write a minimal .docx template with one paragraph per entry
fn write_template(dir: &Path, paragraphs: &[&str]) -> PathBuf {
    let mut body = String::new();
    for text in paragraphs {
        body.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Normal\"/></w:pPr><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            quick_xml::escape::escape(*text)
        ));
    }
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr></w:body></w:document>",
        body
    );

    let options = SimpleFileOptions::default();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>")
        .unwrap();
    zip.add_directory("word/", options).unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.start_file("word/styles.xml", options).unwrap();
    zip.write_all(b"<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"/>")
        .unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let path = dir.join("template.docx");
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write the NGS variant workbook: two samples, three variants
fn write_ngs_workbook(dir: &Path) -> PathBuf {
    let header = [
        "RecordNumber", "SampleID", "SampleDate", "RunDate", "SampleType",
        "Chrom", "Gene", "Variant-ID", "VAF", "HGVS Consequence",
    ];
    let rows: [(&str, &str, &str, &str, f64, &str); 3] = [
        ("S1", "chr17", "TP53", "TP53_c.524G>A", 0.1234, "p.R175H"),
        ("S2", "chr12", "KRAS", "KRAS_c.35G>T", 0.5, "p.G12V"),
        ("S1", "chr7", "EGFR", "EGFR_c.2573T>G", 0.08, "p.L858R"),
    ];

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1").unwrap();
    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    for (i, (sample, chrom, gene, variant, vaf, hgvs)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, format!("R{}", 100 + i)).unwrap();
        sheet.write_string(r, 1, *sample).unwrap();
        sheet.write_string(r, 2, "2024-01-01").unwrap();
        sheet.write_string(r, 3, "2024-01-05").unwrap();
        sheet.write_string(r, 4, "FFPE").unwrap();
        sheet.write_string(r, 5, *chrom).unwrap();
        sheet.write_string(r, 6, *gene).unwrap();
        sheet.write_string(r, 7, *variant).unwrap();
        sheet.write_number(r, 8, *vaf).unwrap();
        sheet.write_string(r, 9, *hgvs).unwrap();
    }

    let path = dir.join("ngs.xlsx");
    workbook.save(&path).unwrap();
    path
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tables(doc: &TemplateDocument) -> Vec<&XmlElement> {
    doc.body().elements().filter(|e| e.is("tbl")).collect()
}

/// Cell texts of a rendered table, row by row
fn cell_texts(table: &XmlElement) -> Vec<Vec<String>> {
    table
        .elements()
        .filter(|e| e.is("tr"))
        .map(|row| {
            row.elements()
                .filter(|e| e.is("tc"))
                .map(|cell| cell.elements().filter(|e| e.is("p")).map(paragraph_text).collect())
                .collect()
        })
        .collect()
}

fn ngs_generator(dir: &Path) -> ReportGenerator {
    let template = write_template(
        dir,
        &["Clinical Report", "Patient <<SampleID>>", "Somatic Variants", "Footer"],
    );
    ReportGenerator::from_template_path(ReportConfig::ngs_default(), &template).unwrap()
}

#[test]
fn test_ngs_pipeline_one_report_per_sample() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let workbook = write_ngs_workbook(dir.path());
    let generator = ngs_generator(dir.path());
    let dataset = load_dataset(&workbook, &SourceKind::Spreadsheet).unwrap();

    let out = dir.path().join("reports");
    let summary = generator
        .generate_all(&dataset, None, &out, GenerationMode::Sequential)
        .unwrap();

    assert!(summary.is_success());
    let paths: Vec<_> = summary.reports.iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec![out.join("S1.docx"), out.join("S2.docx")]);
    assert_eq!(summary.reports[0].tables_inserted, 2);

    let doc = TemplateDocument::open(&out.join("S1.docx")).unwrap();
    assert_eq!(
        doc.block_kinds(),
        vec!["p", "tbl", "p", "p", "tbl", "p", "sectPr"]
    );
    assert_eq!(
        doc.paragraph_texts(),
        vec!["Clinical Report", "Patient S1", "Somatic Variants", "Footer"]
    );

    let tables = tables(&doc);
    let patient = cell_texts(tables[0]);
    assert_eq!(patient.len(), 5);
    assert_eq!(patient[1], vec!["Sample ID", "S1", "S1"]);
    assert_eq!(patient[3], vec!["Run Date", "2024-01-05", "2024-01-05"]);

    let variants = cell_texts(tables[1]);
    assert_eq!(variants.len(), 3);
    assert_eq!(variants[0], vec!["Chrom", "Gene", "Variant-ID", "VAF", "HGVS Consequence"]);
    assert_eq!(variants[1], vec!["chr17", "TP53", "TP53_c.524G>A", "12.34", "p.R175H"]);
    assert_eq!(variants[2][3], "8");
}

#[test]
fn test_patient_table_distinct_rows() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let workbook = write_ngs_workbook(dir.path());
    let generator = ngs_generator(dir.path());
    let dataset = load_dataset(&workbook, &SourceKind::Spreadsheet).unwrap();

    let out = dir.path().join("reports");
    generator
        .generate_all(&dataset, None, &out, GenerationMode::Sequential)
        .unwrap();

    // S1 has two records with different record numbers: two value columns
    let doc = TemplateDocument::open(&out.join("S1.docx")).unwrap();
    let patient = cell_texts(tables(&doc)[0]);
    assert_eq!(patient[0], vec!["Record Number", "R100", "R102"]);
    assert_eq!(patient[4], vec!["Sample Type", "FFPE", "FFPE"]);

    let doc = TemplateDocument::open(&out.join("S2.docx")).unwrap();
    let patient = cell_texts(tables(&doc)[0]);
    assert_eq!(patient[1], vec!["Sample ID", "S2"]);
}

#[test]
fn test_reruns_are_byte_identical() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let workbook = write_ngs_workbook(dir.path());
    let generator = ngs_generator(dir.path());
    let dataset = load_dataset(&workbook, &SourceKind::Spreadsheet).unwrap();

    let first = dir.path().join("first");
    let second = dir.path().join("second");
    generator
        .generate_all(&dataset, None, &first, GenerationMode::Sequential)
        .unwrap();
    generator
        .generate_all(&dataset, None, &second, GenerationMode::Parallel)
        .unwrap();

    for name in ["S1.docx", "S2.docx"] {
        let a = std::fs::read(first.join(name)).unwrap();
        let b = std::fs::read(second.join(name)).unwrap();
        assert_eq!(a, b, "{} differs between runs", name);
    }
}

#[test]
fn test_write_failure_is_isolated() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let workbook = write_ngs_workbook(dir.path());
    let generator = ngs_generator(dir.path());
    let dataset = load_dataset(&workbook, &SourceKind::Spreadsheet).unwrap();

    // A directory in place of S1's output file makes that write fail
    let out = dir.path().join("reports");
    std::fs::create_dir_all(out.join("S1.docx")).unwrap();

    let summary = generator
        .generate_all(&dataset, None, &out, GenerationMode::Sequential)
        .unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].sample_id, "S1");
    assert!(matches!(summary.failures[0].error, ReportError::Write { .. }));
    assert_eq!(summary.reports[0].sample_id, "S2");
    assert!(out.join("S2.docx").is_file());
}

#[test]
fn test_qc_pipeline_with_html_metrics() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("multiqc_report.html");
    std::fs::write(
        &html,
        r#"<html><body>
             <div id="coverage-section"><span class="metric-value">98.7%</span></div>
           </body></html>"#,
    )
    .unwrap();

    let mut workbook = Workbook::new();
    let summary_sheet = workbook.add_worksheet();
    summary_sheet.set_name("Summary").unwrap();
    summary_sheet.write_string(0, 0, "Metric").unwrap();
    summary_sheet.write_string(0, 1, "Value").unwrap();
    summary_sheet.write_string(1, 0, "Reads").unwrap();
    summary_sheet.write_number(1, 1, 1500.0).unwrap();
    let empty_sheet = workbook.add_worksheet();
    empty_sheet.set_name("Notes").unwrap();
    let excel = dir.path().join("tables.xlsx");
    workbook.save(&excel).unwrap();

    let config = ReportConfig::multiqc_default();
    let metrics = load_dataset(&html, &SourceKind::Markup(config.extraction.clone())).unwrap();
    let tables_data = load_dataset(&excel, &SourceKind::Spreadsheet).unwrap();

    let template = write_template(
        dir.path(),
        &["Sample: <<SampleID>>", "Coverage: <<CoverageValue>>, Quality: <<QualityValue>>"],
    );
    let generator = ReportGenerator::from_template_path(config, &template).unwrap();

    let out = dir.path().join("out");
    let summary = generator
        .generate_groups(
            &[SampleGroup::standalone("Sample1")],
            &tables_data,
            Some(&metrics),
            &out,
            GenerationMode::Sequential,
        )
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.reports[0].path, out.join("report_Sample1.docx"));
    assert_eq!(summary.reports[0].tables_inserted, 1);

    let doc = TemplateDocument::open(&summary.reports[0].path).unwrap();
    assert_eq!(
        doc.paragraph_texts(),
        vec![
            "Sample: Sample1",
            "Coverage: 98.7%, Quality: N/A",
            "Table from Summary sheet:",
        ]
    );
    assert_eq!(doc.block_kinds(), vec!["p", "p", "p", "tbl", "sectPr"]);
    assert_eq!(
        cell_texts(tables(&doc)[0]),
        vec![vec!["Metric", "Value"], vec!["Reads", "1500"]]
    );
}

#[test]
fn test_fatal_input_errors() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.xlsx");
    let result = load_dataset(&missing, &SourceKind::Spreadsheet);
    assert!(matches!(result, Err(ReportError::Load { .. })));

    let not_docx = dir.path().join("template.docx");
    std::fs::write(&not_docx, "plain text").unwrap();
    let result = ReportGenerator::from_template_path(ReportConfig::ngs_default(), &not_docx);
    assert!(matches!(result, Err(ReportError::Template(_))));

    let result = ReportGenerator::from_template_path(ReportConfig::ngs_default(), &dir.path().join("none.docx"));
    assert!(matches!(result, Err(ReportError::Load { .. })));
}
