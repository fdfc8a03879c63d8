//! User-facing batch output

use anyhow::{bail, Result};
use clinical_report_core::BatchSummary;

/// Print one line per written report and a final summary
///
/// Returns an error when any sample failed, so the process exits non-zero.
pub fn report_summary(summary: &BatchSummary) -> Result<()> {
    for report in &summary.reports {
        println!("Report saved at {}", report.path.display());
    }
    for failure in &summary.failures {
        eprintln!("Sample {}: {}", failure.sample_id, failure.error);
    }

    println!(
        "{} of {} report(s) written",
        summary.reports.len(),
        summary.total()
    );

    if !summary.is_success() {
        bail!("{} sample(s) failed", summary.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinical_report_core::{GeneratedReport, ReportError, SampleFailure};
    use std::path::PathBuf;

    fn report(id: &str) -> GeneratedReport {
        GeneratedReport {
            sample_id: id.to_string(),
            path: PathBuf::from(format!("out/{}.docx", id)),
            tables_inserted: 2,
            placeholders_replaced: 1,
        }
    }

    #[test]
    fn test_summary_success() {
        let summary = BatchSummary {
            reports: vec![report("S1"), report("S2")],
            failures: Vec::new(),
        };
        assert!(report_summary(&summary).is_ok());
    }

    #[test]
    fn test_summary_with_failures() {
        let summary = BatchSummary {
            reports: vec![report("S1")],
            failures: vec![SampleFailure {
                sample_id: "S2".into(),
                error: ReportError::write("out/S2.docx", "permission denied"),
            }],
        };
        let err = report_summary(&summary).unwrap_err();
        assert_eq!(err.to_string(), "1 sample(s) failed");
    }
}
