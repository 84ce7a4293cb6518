//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigBuilder, DetectionConfig, SignalKind};

#[derive(Parser, Debug)]
#[command(name = "imagecheckr")]
#[command(version, about = "Estimate whether images were synthetically generated")]
pub struct Args {
    /// Input image file or directory (scanned recursively)
    pub input: PathBuf,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Load detection settings from a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable a signal source (classifier, frequency, heuristic); can repeat
    #[arg(long = "disable", value_name = "SOURCE", value_parser = parse_signal_kind)]
    pub disabled: Vec<SignalKind>,

    /// Square size images are resized to before analysis
    #[arg(long, value_name = "PX")]
    pub size: Option<u32>,

    /// Per-classifier timeout in milliseconds
    #[arg(long, value_name = "MS", env = "IMAGECHECKR_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Verbose output with per-signal details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of a base configuration
    pub fn apply_overrides(&self, base: DetectionConfig) -> DetectionConfig {
        let mut builder = ConfigBuilder::from_config(base);

        for kind in &self.disabled {
            builder = builder.disable(*kind);
        }
        if let Some(size) = self.size {
            builder = builder.target_size(size);
        }
        if let Some(ms) = self.timeout_ms {
            builder = builder.classifier_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }
}

fn parse_signal_kind(name: &str) -> Result<SignalKind, String> {
    SignalKind::from_name(name).ok_or_else(|| {
        let valid: Vec<&str> = SignalKind::all().iter().map(|k| k.name()).collect();
        format!("unknown signal source '{}' (expected one of: {})", name, valid.join(", "))
    })
}
