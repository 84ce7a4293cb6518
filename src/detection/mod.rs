//! Detection module for ImageCheckr

mod fusion;
mod result;

pub use fusion::{FusionEngine, FusionError, FusionReport};
pub use result::{
    Confidence, DetectionDetails, DetectionResult, FusionOutcome, Signal, SignalSource,
};
