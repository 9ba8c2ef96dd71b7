use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use survex_core::{ChoiceSet, ParticipantInfo, Phase, Stimulus, SubmissionRecord, SurveyPhase};
use survex_timing::Timer;
use tracing::{debug, info, warn};

use super::catalog::VideoCatalog;
use super::error::ExperimentError;
use super::recorder::ResponseRecorder;
use super::trial::Trial;

#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    ConsentChanged(bool),
    StartPressed,
    /// A choice posted from the page for the given 1-based trial.
    ChoiceSubmitted { trial: usize, label: String },
}

/// Per-participant session.
///
/// The trial cursor only moves forward; a restart means building a new
/// machine. The closing form is split in two steps so a failed remote append
/// leaves the session in `AwaitingForm`: [`prepare_submission`] builds the row
/// without mutating anything, and [`commit_submission`] marks the session
/// complete once the row has been delivered.
///
/// [`prepare_submission`]: ExperimentStateMachine::prepare_submission
/// [`commit_submission`]: ExperimentStateMachine::commit_submission
pub struct ExperimentStateMachine<T: Timer> {
    pub timer: T,
    catalog: Arc<VideoCatalog>,
    recorder: ResponseRecorder,
    current_trial_index: usize,
    consent_given: bool,
    started_at: Option<T::Timestamp>,
    participant: Option<ParticipantInfo>,
    record: Option<SubmissionRecord>,
    unsent: Option<SubmissionRecord>,
    completed: bool,
}

impl<T: Timer> ExperimentStateMachine<T> {
    pub fn new(catalog: Arc<VideoCatalog>, choices: ChoiceSet, timer: T) -> Self {
        Self {
            timer,
            catalog,
            recorder: ResponseRecorder::new(choices),
            current_trial_index: 0,
            consent_given: false,
            started_at: None,
            participant: None,
            record: None,
            unsent: None,
            completed: false,
        }
    }

    pub fn phase(&self) -> SurveyPhase {
        SurveyPhase::at(self.current_trial_index, self.catalog.len(), self.completed)
    }

    pub fn handle_event(&mut self, event: ExperimentEvent) -> Result<SurveyPhase, ExperimentError> {
        match event {
            ExperimentEvent::ConsentChanged(given) => {
                self.set_consent(given);
                Ok(self.phase())
            }
            ExperimentEvent::StartPressed => self.start(),
            ExperimentEvent::ChoiceSubmitted { trial, label } => self.submit_choice(trial, &label),
        }
    }

    pub fn set_consent(&mut self, given: bool) {
        if self.phase().is_welcome() {
            self.consent_given = given;
        }
    }

    pub fn start(&mut self) -> Result<SurveyPhase, ExperimentError> {
        let phase = self.phase();
        if !phase.is_welcome() {
            return Err(ExperimentError::WrongPhase {
                action: "start the experiment",
                phase,
            });
        }
        if !self.consent_given {
            warn!("Start requested without consent");
            return Err(ExperimentError::ConsentRequired);
        }

        self.recorder.clear();
        self.started_at = Some(self.timer.now());
        self.advance(phase);
        info!(
            "Experiment started with {} videos, now at {}",
            self.catalog.len(),
            self.phase()
        );
        Ok(self.phase())
    }

    /// Returns the active trial, failing if its video has gone missing.
    pub fn present_trial(&self) -> Result<Option<&Trial>, ExperimentError> {
        let Some(index) = self.phase().trial_index() else {
            return Ok(None);
        };
        let trial = self
            .catalog
            .get(index)
            .ok_or_else(|| ExperimentError::MissingMedia(self.catalog.root().to_path_buf()))?;
        if !trial.stimulus.is_available() {
            warn!("Video file not found: {}", trial.stimulus.source().display());
            return Err(ExperimentError::MissingMedia(trial.stimulus.source().to_path_buf()));
        }
        Ok(Some(trial))
    }

    /// Records `label` for `trial`, which must be the trial on screen. A post
    /// for a trial that was already passed is rejected as stale and changes
    /// nothing.
    pub fn submit_choice(&mut self, trial: usize, label: &str) -> Result<SurveyPhase, ExperimentError> {
        let phase = self.phase();
        let index = match phase.trial_index() {
            Some(index) if index == trial => index,
            _ if (1..self.current_trial_index).contains(&trial) => {
                debug!("Ignoring repeated answer for trial {} while {}", trial, phase);
                return Err(ExperimentError::StaleTrial(trial));
            }
            _ => {
                return Err(ExperimentError::WrongPhase {
                    action: "record a choice",
                    phase,
                });
            }
        };
        self.present_trial()?;
        self.recorder.record(index, label)?;
        self.advance(phase);
        debug!("Trial {} answered '{}', now at {}", index, label, self.phase());
        Ok(self.phase())
    }

    /// Builds the row for the closing form without changing the session.
    ///
    /// Returns `Ok(None)` when the participant has already been recorded, so
    /// a repeated form post is a no-op.
    pub fn prepare_submission(
        &self,
        participant: ParticipantInfo,
    ) -> Result<Option<SubmissionRecord>, ExperimentError> {
        if self.participant.is_some() {
            debug!("Closing form already submitted, ignoring");
            return Ok(None);
        }
        let phase = self.phase();
        if !phase.awaits_form() {
            return Err(ExperimentError::WrongPhase {
                action: "submit the participant form",
                phase,
            });
        }
        Ok(Some(SubmissionRecord {
            participant,
            responses: self.recorder.dense(self.catalog.len()),
            elapsed_secs: self.elapsed().as_secs_f64(),
        }))
    }

    /// Marks the session complete with a delivered record. Returns false if a
    /// participant was already recorded.
    pub fn commit_submission(&mut self, record: SubmissionRecord) -> bool {
        if self.participant.is_some() || !self.phase().awaits_form() {
            return false;
        }
        self.participant = Some(record.participant.clone());
        self.record = Some(record);
        self.unsent = None;
        self.completed = true;
        info!("Experiment completed with {} responses", self.recorder.len());
        true
    }

    /// Keeps a row whose delivery failed so it can still be exported.
    pub fn submission_failed(&mut self, record: SubmissionRecord) {
        if !self.completed {
            self.unsent = Some(record);
        }
    }

    /// The delivered record, or the last undelivered attempt.
    pub fn export_record(&self) -> Option<&SubmissionRecord> {
        self.record.as_ref().or(self.unsent.as_ref())
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|ts| self.timer.elapsed(ts))
            .unwrap_or_default()
    }

    pub fn current_trial_index(&self) -> usize {
        self.current_trial_index
    }

    pub fn trial_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn catalog(&self) -> &VideoCatalog {
        &self.catalog
    }

    pub fn choices(&self) -> &ChoiceSet {
        self.recorder.choices()
    }

    pub fn responses(&self) -> &BTreeMap<usize, String> {
        self.recorder.responses()
    }

    pub fn participant(&self) -> Option<&ParticipantInfo> {
        self.participant.as_ref()
    }

    pub fn consent_given(&self) -> bool {
        self.consent_given
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn advance(&mut self, from: SurveyPhase) {
        self.current_trial_index = match from.next(self.catalog.len()) {
            Some(SurveyPhase::InTrial(i)) => i,
            Some(SurveyPhase::AwaitingForm) => self.catalog.len() + 1,
            _ => self.current_trial_index,
        };
    }

    #[cfg(test)]
    fn skip_trial(&mut self) {
        let phase = self.phase();
        if phase.is_trial() {
            self.advance(phase);
        }
    }
}
