// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::Args;
pub use output::{format_report, print_failure, print_json, print_report, FileFailure, FileReport};

use anyhow::{Context, Result};
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::DetectionConfig;
use crate::core::{ClassifierRegistry, ImageAnalyzer};

/// Extensions picked up when scanning a directory
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Run the CLI
pub fn run(args: &Args) -> Result<()> {
    let base = match &args.config {
        Some(path) => DetectionConfig::from_json_file(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => DetectionConfig::default(),
    };
    let config = args.apply_overrides(base);

    // No model weights ship with the binary
    let analyzer = ImageAnalyzer::builder()
        .config(config)
        .registry(Arc::new(ClassifierRegistry::empty()))
        .build()
        .context("Building analyzer")?;

    let files = collect_image_files(&args.input)?;
    if files.is_empty() {
        if !args.json {
            println!("{}", "No image files found!".red());
        }
        return Ok(());
    }

    if !args.json {
        println!("Found {} image file(s)\n", files.len());
    }

    let progress = if args.json || files.len() < 2 {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    progress.set_style(progress_style());

    let results: Vec<std::result::Result<FileReport, FileFailure>> = files
        .par_iter()
        .map(|path| {
            let outcome = analyze_file(&analyzer, path);
            progress.inc(1);
            outcome.map_err(|e| FileFailure {
                path: path.display().to_string(),
                error: format!("{:#}", e),
            })
        })
        .collect();
    progress.finish_and_clear();

    let (reports, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_ok());
    let reports: Vec<FileReport> = reports.into_iter().filter_map(|r| r.ok()).collect();
    let failures: Vec<FileFailure> = failures.into_iter().filter_map(|r| r.err()).collect();

    if args.json {
        print_json(&reports, &failures)?;
    } else {
        for report in &reports {
            print_report(report, args.verbose);
            println!();
        }
        for failure in &failures {
            print_failure(failure);
            println!();
        }
        print_summary(&reports);
    }

    Ok(())
}

/// Read and analyze a single file
pub fn analyze_file(analyzer: &ImageAnalyzer, path: &Path) -> Result<FileReport> {
    let content =
        std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    let filename = path.file_name().and_then(|n| n.to_str());

    log::debug!("Analyzing {} ({} bytes)", path.display(), content.len());
    let report = analyzer.analyze_bytes(&content, filename);

    Ok(FileReport {
        path: path.display().to_string(),
        size_bytes: content.len(),
        digest: format!("{:x}", md5::compute(&content)),
        analyzed_at: chrono::Local::now().to_rfc3339(),
        report,
    })
}

/// Collect image files from a file or directory path
pub fn collect_image_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!("Input path does not exist: {}", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_image_extension(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn progress_style() -> ProgressStyle {
    match ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
        Ok(style) => style.progress_chars("##-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

fn print_summary(reports: &[FileReport]) {
    let flagged = reports.iter().filter(|r| r.report.result.ai_generated).count();
    let line = format!("{} of {} file(s) flagged as AI-generated", flagged, reports.len());
    if flagged > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}
