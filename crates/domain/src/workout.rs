//! Workout session state
//!
//! The session owns the exercise blocks of the workout in progress. Every mutation that can
//! change a personal record re-derives the PR state of the affected block with
//! [`recompute_prs`].

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    CompletionState, ElapsedTimer, ExerciseID, ExerciseRef, ExerciseStats, HistoryService,
    ProfileID, Reps, Routine, SetHistory, Weight, parse_numeric_input,
};

/// One planned or performed set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetEntry {
    pub set_number: u32,
    pub reps: Reps,
    pub weight: Weight,
    pub done: bool,
    pub is_pr: bool,
    /// Set when completing this set produced a new record, until acknowledged.
    pub just_achieved: bool,
    pub previous_reps: Option<Reps>,
    pub previous_weight: Option<Weight>,
}

impl SetEntry {
    #[must_use]
    pub fn blank(set_number: u32) -> Self {
        Self {
            set_number,
            reps: Reps::UNSET,
            weight: Weight::UNSET,
            done: false,
            is_pr: false,
            just_achieved: false,
            previous_reps: None,
            previous_weight: None,
        }
    }

    #[must_use]
    pub fn from_history(set_number: u32, history: &SetHistory) -> Self {
        Self {
            previous_reps: Some(history.reps),
            previous_weight: Some(history.weight),
            ..Self::blank(set_number)
        }
    }

    /// A value was never entered and there is no previous value that makes 0 intentional.
    #[must_use]
    pub fn is_missing_values(&self) -> bool {
        (self.reps.is_unset() && self.previous_reps.is_none())
            || (self.weight.is_unset() && self.previous_weight.is_none())
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let reps = *self.reps as f32;
        reps * *self.weight
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseBlock {
    pub exercise: ExerciseRef,
    pub sets: Vec<SetEntry>,
}

impl ExerciseBlock {
    pub const DEFAULT_SETS: u32 = 3;

    #[must_use]
    pub fn new(exercise: ExerciseRef) -> Self {
        Self {
            exercise,
            sets: (1..=Self::DEFAULT_SETS).map(SetEntry::blank).collect(),
        }
    }

    /// One set per historical set with blank values, or the default sets without history.
    #[must_use]
    pub fn seeded(exercise: ExerciseRef, history: &[SetHistory]) -> Self {
        if history.is_empty() {
            return Self::new(exercise);
        }
        let mut history = history.to_vec();
        history.sort_by_key(|h| h.set_number);
        Self {
            exercise,
            sets: (1..)
                .zip(&history)
                .map(|(set_number, h)| SetEntry::from_history(set_number, h))
                .collect(),
        }
    }

    #[must_use]
    pub fn exercise_id(&self) -> ExerciseID {
        self.exercise.id
    }

    #[must_use]
    pub fn set(&self, set_number: u32) -> Option<&SetEntry> {
        self.sets.iter().find(|s| s.set_number == set_number)
    }

    fn set_mut(&mut self, set_number: u32) -> Option<&mut SetEntry> {
        self.sets.iter_mut().find(|s| s.set_number == set_number)
    }

    fn renumber(&mut self) {
        for (set_number, set) in (1..).zip(self.sets.iter_mut()) {
            set.set_number = set_number;
        }
    }

    #[must_use]
    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.done).count()
    }
}

/// What a new maximum has to beat for an exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PRBaseline {
    pub historical_max: Weight,
    pub first_time: bool,
}

impl PRBaseline {
    #[must_use]
    pub fn beats(&self, weight: Weight) -> bool {
        !weight.is_unset() && (self.first_time || weight > self.historical_max)
    }
}

impl From<Option<ExerciseStats>> for PRBaseline {
    fn from(value: Option<ExerciseStats>) -> Self {
        match value {
            Some(stats) => Self {
                historical_max: stats.max_weight,
                first_time: false,
            },
            None => Self {
                historical_max: Weight::UNSET,
                first_time: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievedPR {
    pub exercise_id: ExerciseID,
    pub exercise_name: String,
    pub new_weight: Weight,
    pub previous_weight: Weight,
}

/// Derive the PR flags of a block and the record it currently achieves, if any.
///
/// Every completed set at the session maximum that beats the baseline is flagged. A set that
/// loses its flag also loses its pending acknowledgment.
#[must_use]
pub fn recompute_prs(
    block: &ExerciseBlock,
    baseline: PRBaseline,
) -> (ExerciseBlock, Option<AchievedPR>) {
    let session_max = block
        .sets
        .iter()
        .filter(|s| s.done && !s.weight.is_unset())
        .map(|s| s.weight)
        .fold(None, |max: Option<Weight>, w| match max {
            Some(m) if m >= w => Some(m),
            _ => Some(w),
        });

    let mut updated = block.clone();
    for set in &mut updated.sets {
        set.is_pr = set.done
            && Some(set.weight) == session_max
            && baseline.beats(set.weight);
        set.just_achieved &= set.is_pr;
    }

    let achieved = session_max
        .filter(|max| baseline.beats(*max))
        .map(|max| AchievedPR {
            exercise_id: block.exercise.id,
            exercise_name: block.exercise.name.clone(),
            new_weight: max,
            previous_weight: baseline.historical_max,
        });

    (updated, achieved)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SetField {
    Reps,
    Weight,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WorkoutError {
    #[error("exercise {0} is not part of the workout")]
    UnknownExercise(ExerciseID),
    #[error("exercise {exercise_id} has no set {set_number}")]
    UnknownSet {
        exercise_id: ExerciseID,
        set_number: u32,
    },
    #[error("workout is already completed")]
    Completed,
}

/// Previously recorded performance of an exercise, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseHistory {
    pub last_performance: Vec<SetHistory>,
    pub stats: Option<ExerciseStats>,
}

pub struct WorkoutSession<S> {
    pub(crate) service: S,
    pub(crate) profile_id: ProfileID,
    pub(crate) routine: Option<Routine>,
    pub(crate) baseline: Vec<ExerciseID>,
    pub(crate) blocks: Vec<ExerciseBlock>,
    pub(crate) achieved_prs: IndexMap<ExerciseID, AchievedPR>,
    pub(crate) history: HashMap<ExerciseID, ExerciseHistory>,
    pub(crate) timer: ElapsedTimer,
    pub(crate) completion: CompletionState,
}

impl<S> WorkoutSession<S> {
    #[must_use]
    pub fn new(service: S, profile_id: ProfileID) -> Self {
        Self {
            service,
            profile_id,
            routine: None,
            baseline: vec![],
            blocks: vec![],
            achieved_prs: IndexMap::new(),
            history: HashMap::new(),
            timer: ElapsedTimer::new(),
            completion: CompletionState::Idle,
        }
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn profile_id(&self) -> ProfileID {
        self.profile_id
    }

    #[must_use]
    pub fn blocks(&self) -> &[ExerciseBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn block(&self, exercise_id: ExerciseID) -> Option<&ExerciseBlock> {
        self.blocks.iter().find(|b| b.exercise.id == exercise_id)
    }

    #[must_use]
    pub fn routine(&self) -> Option<&Routine> {
        self.routine.as_ref()
    }

    #[must_use]
    pub fn exercise_ids(&self) -> Vec<ExerciseID> {
        self.blocks.iter().map(ExerciseBlock::exercise_id).collect()
    }

    /// Records achieved so far, in the order they were first achieved.
    pub fn achieved_prs(&self) -> impl Iterator<Item = &AchievedPR> {
        self.achieved_prs.values()
    }

    #[must_use]
    pub fn achieved_pr(&self, exercise_id: ExerciseID) -> Option<&AchievedPR> {
        self.achieved_prs.get(&exercise_id)
    }

    #[must_use]
    pub fn timer(&self) -> &ElapsedTimer {
        &self.timer
    }

    pub fn tick(&mut self) {
        self.timer.tick();
    }

    #[must_use]
    pub fn completed_sets(&self) -> usize {
        self.blocks.iter().map(ExerciseBlock::completed_sets).sum()
    }

    #[must_use]
    pub fn total_reps(&self) -> u32 {
        self.done_sets().map(|s| *s.reps).sum()
    }

    /// Sum of reps × weight over completed sets.
    #[must_use]
    pub fn total_weight(&self) -> f32 {
        self.done_sets().fold(0.0, |total, s| total + s.volume())
    }

    fn done_sets(&self) -> impl Iterator<Item = &SetEntry> {
        self.blocks.iter().flat_map(|b| &b.sets).filter(|s| s.done)
    }

    /// Whether the exercise list differs from the routine the session was loaded from.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.routine.is_some() && self.exercise_ids() != self.baseline
    }

    pub(crate) fn reset_baseline(&mut self) {
        self.baseline = self.exercise_ids();
    }

    pub fn remove_exercise(&mut self, exercise_id: ExerciseID) -> Result<(), WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        self.blocks.remove(index);
        self.achieved_prs.shift_remove(&exercise_id);
        debug!("removed exercise {exercise_id}");
        Ok(())
    }

    pub fn add_set(&mut self, exercise_id: ExerciseID) -> Result<&ExerciseBlock, WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        let block = &mut self.blocks[index];
        let set_number = u32::try_from(block.sets.len()).unwrap_or(u32::MAX - 1) + 1;
        block.sets.push(SetEntry::blank(set_number));
        Ok(&self.blocks[index])
    }

    pub fn remove_set(
        &mut self,
        exercise_id: ExerciseID,
        set_number: u32,
    ) -> Result<&ExerciseBlock, WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        let block = &mut self.blocks[index];
        let position = block
            .sets
            .iter()
            .position(|s| s.set_number == set_number)
            .ok_or(WorkoutError::UnknownSet {
                exercise_id,
                set_number,
            })?;
        block.sets.remove(position);
        block.renumber();
        self.recompute(index);
        Ok(&self.blocks[index])
    }

    pub fn update_set_field(
        &mut self,
        exercise_id: ExerciseID,
        set_number: u32,
        field: SetField,
        raw: &str,
    ) -> Result<&SetEntry, WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        let value = parse_numeric_input(raw);
        let set = self.set_mut(index, set_number)?;
        set.just_achieved = false;
        match field {
            SetField::Reps => set.reps = Reps::new(value),
            SetField::Weight => {
                set.weight = Weight::from(value);
                self.recompute(index);
            }
        }
        self.blocks[index]
            .set(set_number)
            .ok_or(WorkoutError::UnknownSet {
                exercise_id,
                set_number,
            })
    }

    /// Flip the completion of a set.
    ///
    /// Returns whether completing the set achieved a new record.
    pub fn toggle_set_done(
        &mut self,
        exercise_id: ExerciseID,
        set_number: u32,
    ) -> Result<bool, WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        let baseline = self.pr_baseline(exercise_id);
        let best_completed = self.blocks[index]
            .sets
            .iter()
            .filter(|s| s.done && s.set_number != set_number && baseline.beats(s.weight))
            .map(|s| s.weight)
            .fold(Weight::UNSET, |max, w| if w > max { w } else { max });

        let set = self.set_mut(index, set_number)?;
        set.done = !set.done;
        let weight = set.weight;
        let achieved = if set.done {
            let eligible = baseline.beats(set.weight) && set.weight >= best_completed;
            set.just_achieved = eligible;
            eligible
        } else {
            set.is_pr = false;
            set.just_achieved = false;
            false
        };

        self.recompute(index);

        if achieved {
            debug!(
                "new record for exercise {exercise_id}: {weight} (previous {})",
                baseline.historical_max
            );
        }

        Ok(achieved)
    }

    /// Acknowledge the one-shot record notification of a set.
    pub fn clear_transient_flag(
        &mut self,
        exercise_id: ExerciseID,
        set_number: u32,
    ) -> Result<(), WorkoutError> {
        self.ensure_in_progress()?;
        let index = self.block_index(exercise_id)?;
        self.set_mut(index, set_number)?.just_achieved = false;
        Ok(())
    }

    #[must_use]
    pub fn pr_baseline(&self, exercise_id: ExerciseID) -> PRBaseline {
        PRBaseline::from(self.history.get(&exercise_id).and_then(|h| h.stats))
    }

    fn recompute(&mut self, index: usize) {
        let exercise_id = self.blocks[index].exercise.id;
        let (block, achieved) = recompute_prs(&self.blocks[index], self.pr_baseline(exercise_id));
        self.blocks[index] = block;
        match achieved {
            Some(pr) => {
                self.achieved_prs.insert(exercise_id, pr);
            }
            None => {
                self.achieved_prs.shift_remove(&exercise_id);
            }
        }
    }

    fn ensure_in_progress(&self) -> Result<(), WorkoutError> {
        if matches!(self.completion, CompletionState::Done(_)) {
            return Err(WorkoutError::Completed);
        }
        Ok(())
    }

    fn block_index(&self, exercise_id: ExerciseID) -> Result<usize, WorkoutError> {
        self.blocks
            .iter()
            .position(|b| b.exercise.id == exercise_id)
            .ok_or(WorkoutError::UnknownExercise(exercise_id))
    }

    fn set_mut(&mut self, index: usize, set_number: u32) -> Result<&mut SetEntry, WorkoutError> {
        let block = &mut self.blocks[index];
        let exercise_id = block.exercise.id;
        block.set_mut(set_number).ok_or(WorkoutError::UnknownSet {
            exercise_id,
            set_number,
        })
    }
}

impl<S: HistoryService> WorkoutSession<S> {
    /// Start the session with one block per planned exercise.
    ///
    /// History for all planned exercises is requested in a single batch. Without a plan the
    /// session starts empty.
    pub async fn load_session(&mut self, plan: Option<&[ExerciseRef]>) -> &[ExerciseBlock] {
        self.blocks.clear();
        self.achieved_prs.clear();
        self.completion = CompletionState::Idle;

        if let Some(plan) = plan {
            let ids = plan.iter().map(|e| e.id).collect::<Vec<_>>();
            self.fetch_history(&ids).await;
            for exercise in plan {
                if self.block_index(exercise.id).is_ok() {
                    warn!("ignoring duplicate exercise {} in plan", exercise.id);
                    continue;
                }
                let block = self.seeded_block(exercise.clone());
                self.blocks.push(block);
            }
        }

        self.reset_baseline();
        debug!("loaded session with {} exercises", self.blocks.len());
        &self.blocks
    }

    /// Load a saved routine, resolving its exercises against the catalog.
    pub async fn load_routine(
        &mut self,
        routine: Routine,
        catalog: &[ExerciseRef],
    ) -> &[ExerciseBlock] {
        let plan = routine
            .exercise_ids
            .iter()
            .filter_map(|id| {
                let exercise = catalog.iter().find(|e| e.id == *id).cloned();
                if exercise.is_none() {
                    warn!("routine {} references unknown exercise {id}", routine.id);
                }
                exercise
            })
            .collect::<Vec<_>>();
        self.routine = Some(routine);
        self.load_session(Some(plan.as_slice())).await
    }

    /// Add the exercise, or remove it if it is already part of the workout.
    pub async fn add_exercise(
        &mut self,
        exercise: ExerciseRef,
    ) -> Result<&[ExerciseBlock], WorkoutError> {
        if self.block_index(exercise.id).is_ok() {
            self.remove_exercise(exercise.id)?;
            return Ok(&self.blocks);
        }

        self.ensure_in_progress()?;
        self.fetch_history(&[exercise.id]).await;
        debug!("added exercise {}", exercise.id);
        let block = self.seeded_block(exercise);
        self.blocks.push(block);
        Ok(&self.blocks)
    }

    fn seeded_block(&self, exercise: ExerciseRef) -> ExerciseBlock {
        match self.history.get(&exercise.id) {
            Some(history) => ExerciseBlock::seeded(exercise, &history.last_performance),
            None => ExerciseBlock::new(exercise),
        }
    }

    async fn fetch_history(&mut self, exercise_ids: &[ExerciseID]) {
        let missing = exercise_ids
            .iter()
            .filter(|id| !self.history.contains_key(id))
            .copied()
            .collect::<Vec<_>>();

        if missing.is_empty() {
            return;
        }

        let mut last_performance = match self
            .service
            .get_last_performance(self.profile_id, &missing)
            .await
        {
            Ok(last_performance) => last_performance,
            Err(err) => {
                warn!("using default sets, failed to fetch last performance: {err}");
                BTreeMap::new()
            }
        };

        for exercise_id in missing {
            let stats = match self
                .service
                .get_exercise_stats(self.profile_id, exercise_id)
                .await
            {
                Ok(stats) => stats,
                Err(err) => {
                    warn!("treating exercise {exercise_id} as new, failed to fetch stats: {err}");
                    None
                }
            };
            self.history.insert(
                exercise_id,
                ExerciseHistory {
                    last_performance: last_performance.remove(&exercise_id).unwrap_or_default(),
                    stats,
                },
            );
        }
    }
}
