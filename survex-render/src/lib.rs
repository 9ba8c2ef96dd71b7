pub mod render;

pub use render::{escape, media_url, HtmlRenderer, PageView, PhaseRenderer, TrialView};
