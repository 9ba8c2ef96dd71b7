use std::path::PathBuf;

use serde::Deserialize;
use survex_core::ChoiceSet;
use tracing::warn;

pub const DEFAULT_VIDEO_DIR: &str = "videos";
pub const DEFAULT_CHOICES: [&str; 6] = ["ball", "human", "Swing/Pendulum", "mammal", "reptile", "tool"];

/// Choice sets outside this range still work but are flagged at startup.
pub const RECOMMENDED_CHOICES: std::ops::RangeInclusive<usize> = 5..=8;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub video_dir: PathBuf,
    /// Matched against the file suffix including the dot, case-sensitive.
    pub video_extensions: Vec<String>,
    pub choices: ChoiceSet,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from(DEFAULT_VIDEO_DIR),
            video_extensions: vec![".mp4".to_string()],
            choices: ChoiceSet::new(DEFAULT_CHOICES).expect("default choices are valid"),
        }
    }
}

impl ExperimentConfig {
    pub fn warn_on_unusual_settings(&self) {
        if !RECOMMENDED_CHOICES.contains(&self.choices.len()) {
            warn!(
                "{} choice labels configured, expected between {} and {}",
                self.choices.len(),
                RECOMMENDED_CHOICES.start(),
                RECOMMENDED_CHOICES.end()
            );
        }
        if self.video_extensions.is_empty() {
            warn!("No video extensions configured, the catalog will be empty");
        }
    }
}
