//! Finishing a workout
//!
//! `idle → checking-completeness → (blocked | awaiting-decision) → saving → done | failed`
//!
//! Nothing is persisted while the workout is blocked or a routine decision is pending. Writes
//! happen in a fixed order (routine, routine exercises, history, sets) and are not rolled back
//! if a later write fails.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    AchievedPR, CreateError, ExerciseID, HistoryService, Name, NewWorkoutHistory, Routine,
    RoutineID, RoutineService, SetRecord, WorkoutHistoryID, WorkoutSession,
};

pub const DEFAULT_WORKOUT_NAME: &str = "Workout";

#[derive(Debug, Clone, PartialEq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CompletionState {
    Idle,
    CheckingCompleteness,
    Blocked(CompletionBlocker),
    AwaitingDecision(RoutinePrompt),
    Saving,
    Done(CompletionSummary),
    Failed(String),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionBlocker {
    #[error("all sets must be completed before finishing the workout")]
    IncompleteSets,
    #[error("completed sets are missing reps or weight")]
    MissingValues,
}

/// Choices offered when the routine definition can be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RoutinePrompt {
    /// The session deviates from its saved routine: update, save as new or discard.
    UpdateOrSaveAsNew,
    /// The session has no saved routine yet: save under a name or discard.
    SaveAsNew,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutineDecision {
    Update,
    SaveAsNew(Name),
    Discard,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinishRequest {
    /// The user opted to persist the routine definition.
    pub save_routine: bool,
    pub decision: Option<RoutineDecision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub workout_history_id: WorkoutHistoryID,
    pub workout_name: String,
    /// Seconds.
    pub duration: u32,
    pub exercises: usize,
    pub sets: usize,
    pub total_reps: u32,
    pub weight_lifted: f32,
    pub prs: Vec<AchievedPR>,
}

impl CompletionSummary {
    pub fn serialized_prs(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.prs)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CompletionError {
    #[error(transparent)]
    Blocked(#[from] CompletionBlocker),
    #[error("routine decision required ({0})")]
    DecisionRequired(RoutinePrompt),
    #[error("decision not available for {0}")]
    InvalidDecision(RoutinePrompt),
    #[error("workout already completed")]
    AlreadyCompleted,
    #[error("failed to save routine: {0}")]
    Routine(CreateError),
    #[error("failed to save workout: {0}")]
    History(CreateError),
}

impl<S> WorkoutSession<S> {
    #[must_use]
    pub fn completion_state(&self) -> &CompletionState {
        &self.completion
    }

    /// Check that every set is completed and carries usable values.
    pub fn check_completeness(&self) -> Result<(), CompletionBlocker> {
        let sets = || self.blocks.iter().flat_map(|b| &b.sets);
        if sets().any(|s| !s.done) {
            return Err(CompletionBlocker::IncompleteSets);
        }
        if sets().any(|s| s.done && s.is_missing_values()) {
            return Err(CompletionBlocker::MissingValues);
        }
        Ok(())
    }

    #[must_use]
    pub fn routine_prompt(&self, save_routine: bool) -> Option<RoutinePrompt> {
        if !save_routine || self.blocks.is_empty() {
            return None;
        }
        match self.routine {
            Some(_) if self.is_modified() => Some(RoutinePrompt::UpdateOrSaveAsNew),
            Some(_) => None,
            None => Some(RoutinePrompt::SaveAsNew),
        }
    }

    fn transition(&mut self, state: CompletionState) {
        debug!("completion: {} -> {state}", self.completion);
        self.completion = state;
    }
}

impl<S: HistoryService + RoutineService> WorkoutSession<S> {
    /// Validate, persist and summarize the workout.
    ///
    /// A blocked or failed attempt leaves the session untouched, so the user can fix the
    /// workout or retry the whole action.
    pub async fn finish(
        &mut self,
        request: FinishRequest,
    ) -> Result<CompletionSummary, CompletionError> {
        if matches!(self.completion, CompletionState::Done(_)) {
            return Err(CompletionError::AlreadyCompleted);
        }

        self.transition(CompletionState::CheckingCompleteness);

        if let Err(blocker) = self.check_completeness() {
            self.transition(CompletionState::Blocked(blocker));
            return Err(blocker.into());
        }

        let decision = match (self.routine_prompt(request.save_routine), request.decision) {
            (None, _) => RoutineDecision::Discard,
            (Some(prompt), None) => {
                self.transition(CompletionState::AwaitingDecision(prompt));
                return Err(CompletionError::DecisionRequired(prompt));
            }
            (Some(prompt @ RoutinePrompt::SaveAsNew), Some(RoutineDecision::Update)) => {
                self.transition(CompletionState::AwaitingDecision(prompt));
                return Err(CompletionError::InvalidDecision(prompt));
            }
            (Some(_), Some(decision)) => decision,
        };

        self.transition(CompletionState::Saving);

        match self.save(decision).await {
            Ok(summary) => {
                info!(
                    "completed workout {} with {} sets",
                    summary.workout_history_id, summary.sets
                );
                self.transition(CompletionState::Done(summary.clone()));
                Ok(summary)
            }
            Err(err) => {
                self.transition(CompletionState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn save(
        &mut self,
        decision: RoutineDecision,
    ) -> Result<CompletionSummary, CompletionError> {
        let exercise_ids = self.exercise_ids();

        match decision {
            RoutineDecision::Update => {
                if let Some((id, name)) = self.routine.as_ref().map(|r| (r.id, r.name.clone())) {
                    self.service
                        .replace_routine_exercises(id, &exercise_ids)
                        .await
                        .map_err(CompletionError::Routine)?;
                    self.saved_routine(id, name, exercise_ids);
                }
            }
            RoutineDecision::SaveAsNew(name) => {
                let id = self
                    .service
                    .create_routine(self.profile_id, name.clone())
                    .await
                    .map_err(CompletionError::Routine)?;
                // Until its exercises are written, the stored routine is empty, so a retry is
                // offered to update it.
                self.routine = Some(Routine {
                    id,
                    name: name.clone(),
                    exercise_ids: vec![],
                });
                self.baseline.clear();
                self.service
                    .create_routine_exercises(id, &exercise_ids)
                    .await
                    .map_err(CompletionError::Routine)?;
                self.saved_routine(id, name, exercise_ids);
            }
            RoutineDecision::Discard => {}
        }

        let workout_history_id = self
            .service
            .create_workout_history(NewWorkoutHistory {
                profile_id: self.profile_id,
                workout_id: self.routine.as_ref().map(|r| r.id),
                duration_minutes: self.timer.minutes(),
                completed_at: Utc::now(),
            })
            .await
            .map_err(CompletionError::History)?;

        self.service
            .create_set_records(self.set_records(workout_history_id))
            .await
            .map_err(CompletionError::History)?;

        Ok(CompletionSummary {
            workout_history_id,
            workout_name: self
                .routine
                .as_ref()
                .map_or(DEFAULT_WORKOUT_NAME.to_string(), |r| r.name.to_string()),
            duration: self.timer.seconds(),
            exercises: self.blocks.len(),
            sets: self.completed_sets(),
            total_reps: self.total_reps(),
            weight_lifted: self.total_weight(),
            prs: self.achieved_prs().cloned().collect(),
        })
    }

    fn saved_routine(&mut self, id: RoutineID, name: Name, exercise_ids: Vec<ExerciseID>) {
        self.routine = Some(Routine {
            id,
            name,
            exercise_ids,
        });
        self.reset_baseline();
    }

    fn set_records(&self, workout_history_id: WorkoutHistoryID) -> Vec<SetRecord> {
        self.blocks
            .iter()
            .flat_map(|block| {
                block.sets.iter().map(move |set| SetRecord {
                    profile_id: self.profile_id,
                    workout_history_id,
                    exercise_id: block.exercise.id,
                    set_number: set.set_number,
                    reps: set.reps,
                    weight: set.weight,
                })
            })
            .collect()
    }
}
