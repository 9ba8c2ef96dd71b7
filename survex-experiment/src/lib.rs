pub mod catalog;
pub mod config;
pub mod error;
pub mod recorder;
pub mod state;
pub mod trial;
pub use catalog::VideoCatalog;
pub use config::ExperimentConfig;
pub use error::ExperimentError;
pub use recorder::ResponseRecorder;
pub use state::{ExperimentEvent, ExperimentStateMachine};
pub use trial::Trial;
