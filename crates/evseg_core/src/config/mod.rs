use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::GroupOrder;
use crate::chunking::ChunkingConfig;
use crate::error::AppError;
use crate::filter::{TopicConfig, TopicFilter};
use crate::segment::SegmentationConfig;

/// Item 1A.
pub const SECTION_RISK_FACTORS: &str = "RiskFactors";
/// Item 7.
pub const SECTION_MDA: &str = "MDA";

/// Everything a batch run needs besides its inputs. Missing keys in a config file take the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub segmentation: SegmentationConfig,
    pub topics: TopicConfig,
    pub group_order: GroupOrder,
    /// Section ids to segment for every entity, in processing order.
    pub sections: Vec<String>,
    /// Worker threads for the per-document stage. 1 runs inline.
    pub jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            segmentation: SegmentationConfig::default(),
            topics: TopicConfig::climate(),
            group_order: GroupOrder::FirstSeen,
            sections: vec![SECTION_RISK_FACTORS.to_string(), SECTION_MDA.to_string()],
            jobs: 1,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let cfg: PipelineConfig = serde_json::from_str(raw).map_err(|e| {
            AppError::new("CONFIG_DECODE_FAILED", "Failed to decode pipeline config JSON")
                .with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read pipeline config")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Self::from_json_str(&raw).map_err(|e| {
            let details = match e.details.as_deref() {
                Some(d) => format!("path={}; {d}", path.display()),
                None => format!("path={}", path.display()),
            };
            e.with_details(details)
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.chunking.validate()?;
        if self.segmentation.max_text_chars == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "segmentation.max_text_chars must be a positive integer",
            ));
        }
        if self.jobs == 0 {
            return Err(AppError::new("CONFIG_INVALID", "jobs must be at least 1"));
        }
        if self.sections.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "Section ids must not be blank",
            ));
        }
        // Surface bad patterns at load time rather than after segmentation.
        TopicFilter::new(&self.topics)?;
        Ok(())
    }
}
