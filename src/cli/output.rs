//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;

use crate::core::AnalysisReport;
use crate::detection::{Confidence, FusionOutcome};

/// Per-file report printed by the CLI
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: String,
    pub size_bytes: usize,
    /// MD5 of the file content, lowercase hex
    pub digest: String,
    /// RFC 3339 analysis time
    pub analyzed_at: String,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

/// A file that could not be read at all
#[derive(Debug, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Format one report for the terminal
pub fn format_report(file: &FileReport, verbose: bool) -> String {
    let result = &file.report.result;
    let mut output = String::new();

    let verdict = match file.report.outcome {
        FusionOutcome::Computed if result.ai_generated => "✗ LIKELY AI-GENERATED".red().to_string(),
        FusionOutcome::Computed => "✓ LIKELY AUTHENTIC".green().to_string(),
        FusionOutcome::Fallback => "? NO EVIDENCE".yellow().to_string(),
        FusionOutcome::FailClosed => "! ANALYSIS FAILED".red().to_string(),
    };

    output.push_str(&format!("{} {}\n", verdict, file.path.clone().bold()));
    output.push_str(&format!(
        "  Score: {:.3}  Confidence: {}\n",
        result.score,
        color_confidence(result.confidence)
    ));

    if file.report.outcome != FusionOutcome::Computed {
        output.push_str(&format!("  {}\n", file.report.outcome.description()));
    }

    if !result.details.models_agree {
        output.push_str(&format!("  {}\n", "Classifiers disagree".yellow()));
    }

    if verbose {
        output.push_str(&format!(
            "  Spectral entropy: {:.3}  Frequency score: {:.3}\n",
            result.details.spectral_entropy, result.details.frequency_score
        ));

        if let Some(std_dev) = file.report.std_dev {
            output.push_str(&format!("  Signal std dev: {:.4}\n", std_dev));
        }

        for signal in &file.report.signals {
            output.push_str(&format!("    • {}: {:.3}\n", signal.source, signal.value));
        }

        if let Some(heuristic) = &file.report.heuristic {
            for cue in &heuristic.evidence {
                output.push_str(&format!("    - {}\n", cue));
            }
        }

        for failure in &file.report.classifier_failures {
            output.push_str(&format!(
                "    {} {}: {}\n",
                "✗".red(),
                failure.model,
                failure.error
            ));
        }

        output.push_str(&format!(
            "  {}\n",
            format!("md5 {}  {} bytes  {}", file.digest, file.size_bytes, file.analyzed_at).dim()
        ));
    }

    output
}

fn color_confidence(confidence: Confidence) -> String {
    match confidence {
        Confidence::High => confidence.as_str().green().to_string(),
        Confidence::Medium => confidence.as_str().yellow().to_string(),
        Confidence::Low => confidence.as_str().red().to_string(),
    }
}

/// Print a report for the terminal
pub fn print_report(file: &FileReport, verbose: bool) {
    print!("{}", format_report(file, verbose));
}

pub fn print_failure(failure: &FileFailure) {
    println!("{} {}", "! UNREADABLE".red(), failure.path);
    println!("  {}", failure.error);
}

/// Print all reports as a single JSON document
pub fn print_json(reports: &[FileReport], failures: &[FileFailure]) -> serde_json::Result<()> {
    #[derive(Serialize)]
    struct Output<'a> {
        reports: &'a [FileReport],
        failures: &'a [FileFailure],
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&Output { reports, failures })?
    );
    Ok(())
}
