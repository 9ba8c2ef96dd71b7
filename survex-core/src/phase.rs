use serde::Serialize;
use std::fmt;

/// Defines survey phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + fmt::Debug + Default {
    fn next(&self, trial_count: usize) -> Option<Self>;

    /// 1-based trial index while a trial is on screen
    fn trial_index(&self) -> Option<usize> {
        None
    }

    fn is_welcome(&self) -> bool {
        false
    }

    fn is_trial(&self) -> bool {
        self.trial_index().is_some()
    }

    fn awaits_form(&self) -> bool {
        false
    }

    fn is_complete(&self) -> bool {
        false
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "trial", rename_all = "snake_case")]
pub enum SurveyPhase {
    #[default]
    NotStarted,
    InTrial(usize),
    AwaitingForm,
    Completed,
}

impl SurveyPhase {
    /// Derives the phase from a session's trial cursor.
    ///
    /// `current_index` is 0 before the start action, `1..=trial_count` while a
    /// trial is active and anything above `trial_count` once all trials are done.
    pub fn at(current_index: usize, trial_count: usize, completed: bool) -> Self {
        if completed {
            SurveyPhase::Completed
        } else if current_index == 0 {
            SurveyPhase::NotStarted
        } else if current_index <= trial_count {
            SurveyPhase::InTrial(current_index)
        } else {
            SurveyPhase::AwaitingForm
        }
    }
}

impl Phase for SurveyPhase {
    fn next(&self, trial_count: usize) -> Option<Self> {
        use SurveyPhase::*;
        Some(match *self {
            NotStarted if trial_count == 0 => AwaitingForm,
            NotStarted => InTrial(1),
            InTrial(i) if i < trial_count => InTrial(i + 1),
            InTrial(_) => AwaitingForm,
            AwaitingForm => Completed,
            Completed => return None,
        })
    }

    fn trial_index(&self) -> Option<usize> {
        match self {
            SurveyPhase::InTrial(i) => Some(*i),
            _ => None,
        }
    }

    fn is_welcome(&self) -> bool {
        matches!(self, SurveyPhase::NotStarted)
    }

    fn awaits_form(&self) -> bool {
        matches!(self, SurveyPhase::AwaitingForm)
    }

    fn is_complete(&self) -> bool {
        matches!(self, SurveyPhase::Completed)
    }
}

impl fmt::Display for SurveyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyPhase::NotStarted => write!(f, "not started"),
            SurveyPhase::InTrial(i) => write!(f, "trial {i}"),
            SurveyPhase::AwaitingForm => write!(f, "awaiting form"),
            SurveyPhase::Completed => write!(f, "completed"),
        }
    }
}
