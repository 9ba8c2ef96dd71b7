use survex_core::{Stimulus, VideoStimulus};

#[derive(Debug, Clone, PartialEq)]
pub struct Trial<S: Stimulus = VideoStimulus> {
    /// 1-based position in the catalog
    pub index: usize,
    pub stimulus: S,
}

impl<S: Stimulus> Trial<S> {
    pub fn heading(&self) -> String {
        format!("Video {}", self.index)
    }
}
