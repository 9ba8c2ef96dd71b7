pub mod error;
pub mod participant;
pub mod phase;
pub mod record;
pub mod stimulus;
pub mod trial;

pub use error::ValidationError;
pub use participant::{ParticipantInfo, Spectacles, MAX_AGE, MIN_AGE};
pub use phase::{Phase, SurveyPhase};
pub use record::{CellValue, SubmissionRecord};
pub use stimulus::{Stimulus, VideoStimulus};
pub use trial::ChoiceSet;
