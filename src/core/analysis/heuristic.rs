// src/core/analysis/heuristic.rs
//
// Cheap, non-visual cues: file size, filename keywords and embedded metadata.
// Each cue is weak evidence on its own; absence of evidence scores 0.0.

use std::io::Cursor;

use serde::Serialize;

use crate::config::HeuristicConfig;
use crate::core::dsp::clamp01;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Kind of embedded metadata found in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    Exif,
    Xmp,
    Text,
}

/// Outcome of the metadata scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "kind")]
pub enum MetadataStatus {
    Present(MetadataKind),
    /// Container parsed cleanly but carries no metadata block
    Absent,
    /// Unknown or truncated container, or an EXIF block that does not parse
    Unparseable,
}

impl MetadataStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, MetadataStatus::Present(_))
    }
}

/// Which size heuristic fired, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCue {
    Large,
    Small,
}

/// Heuristic analysis results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicAnalysis {
    /// Sum of triggered cue weights, clamped to [0, 1]
    pub score: f64,
    pub size_cue: Option<SizeCue>,
    pub matched_keywords: Vec<String>,
    pub metadata: Option<MetadataStatus>,
    pub evidence: Vec<String>,
}

impl HeuristicAnalysis {
    fn empty() -> Self {
        Self {
            score: 0.0,
            size_cue: None,
            matched_keywords: Vec::new(),
            metadata: None,
            evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer {
    config: HeuristicConfig,
}

impl HeuristicAnalyzer {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, content: &[u8], filename: Option<&str>) -> HeuristicAnalysis {
        if content.is_empty() {
            return HeuristicAnalysis::empty();
        }

        let mut result = HeuristicAnalysis::empty();
        let mut score = 0.0;

        // Large and small ranges are disjoint
        let size = content.len();
        if size > self.config.large_file_bytes {
            score += self.config.large_file_weight;
            result.size_cue = Some(SizeCue::Large);
            result.evidence.push(format!("Unusually large file ({} bytes)", size));
        } else if size < self.config.small_file_bytes {
            score += self.config.small_file_weight;
            result.size_cue = Some(SizeCue::Small);
            result.evidence.push(format!("Unusually small file ({} bytes)", size));
        }

        if let Some(name) = filename {
            result.matched_keywords = match_keywords(name, &self.config.keywords);
            for keyword in &result.matched_keywords {
                score += self.config.keyword_weight;
                result.evidence.push(format!("Filename contains \"{}\"", keyword));
            }
        }

        if self.config.check_metadata {
            let status = inspect_metadata(content);
            if !status.is_present() {
                score += self.config.missing_metadata_weight;
                result.evidence.push(match status {
                    MetadataStatus::Absent => "No embedded metadata".to_string(),
                    _ => "Embedded metadata could not be parsed".to_string(),
                });
            }
            result.metadata = Some(status);
        }

        result.score = clamp01(score);
        log::debug!("Heuristic: score={:.3}, cues={:?}", result.score, result.evidence);
        result
    }
}

/// Case-insensitive substring matches of `keywords` within `filename`
pub fn match_keywords(filename: &str, keywords: &[String]) -> Vec<String> {
    let lower = filename.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
        .cloned()
        .collect()
}

/// Classify the embedded metadata of `content`.
///
/// EXIF is read with `kamadak-exif`, so a block only counts when its TIFF
/// structure parses. When the container parsed but holds no EXIF, XMP packets
/// and PNG text chunks still count as metadata.
pub fn inspect_metadata(content: &[u8]) -> MetadataStatus {
    match exif::Reader::new().read_from_container(&mut Cursor::new(content)) {
        Ok(exif) => {
            log::trace!("EXIF block with {} fields", exif.fields().count());
            MetadataStatus::Present(MetadataKind::Exif)
        }
        Err(exif::Error::NotFound(container)) => match find_auxiliary_metadata(content) {
            Some(kind) => MetadataStatus::Present(kind),
            None => {
                log::trace!("No metadata in {} container", container);
                MetadataStatus::Absent
            }
        },
        Err(err) => {
            log::debug!("Metadata unreadable: {}", err);
            MetadataStatus::Unparseable
        }
    }
}

/// XMP or text blocks in a container already known to be well formed
fn find_auxiliary_metadata(content: &[u8]) -> Option<MetadataKind> {
    if content.starts_with(&JPEG_SOI) {
        jpeg_xmp(content)
    } else if content.starts_with(&PNG_SIGNATURE) {
        png_text(content)
    } else if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        webp_xmp(content)
    } else {
        None
    }
}

fn jpeg_xmp(content: &[u8]) -> Option<MetadataKind> {
    let mut pos = 2;
    while pos + 4 <= content.len() && content[pos] == 0xFF {
        let marker = content[pos + 1];
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            // Header ends at start of scan or end of image
            0xDA | 0xD9 => return None,
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        let length = u16::from_be_bytes([content[pos + 2], content[pos + 3]]) as usize;
        let segment_end = pos + 2 + length;
        if length < 2 || segment_end > content.len() {
            return None;
        }
        if marker == 0xE1 && content[pos + 4..segment_end].starts_with(XMP_HEADER) {
            return Some(MetadataKind::Xmp);
        }
        pos = segment_end;
    }
    None
}

fn png_text(content: &[u8]) -> Option<MetadataKind> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= content.len() {
        let length = u32::from_be_bytes([
            content[pos],
            content[pos + 1],
            content[pos + 2],
            content[pos + 3],
        ]) as usize;

        match &content[pos + 4..pos + 8] {
            b"tEXt" | b"zTXt" | b"iTXt" => return Some(MetadataKind::Text),
            b"IEND" => return None,
            _ => {}
        }

        // data + CRC
        pos = pos.checked_add(12)?.checked_add(length)?;
    }
    None
}

fn webp_xmp(content: &[u8]) -> Option<MetadataKind> {
    let mut pos = 12;
    while pos + 8 <= content.len() {
        if &content[pos..pos + 4] == b"XMP " {
            return Some(MetadataKind::Xmp);
        }
        let size = u32::from_le_bytes([
            content[pos + 4],
            content[pos + 5],
            content[pos + 6],
            content[pos + 7],
        ]) as usize;

        // Chunks are padded to even length
        pos = pos.checked_add(8)?.checked_add(size + (size & 1))?;
    }
    None
}
