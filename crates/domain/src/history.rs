use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

use crate::{CreateError, ExerciseID, ProfileID, ReadError, Reps, RoutineID, Weight};

#[allow(async_fn_in_trait)]
pub trait HistoryService {
    async fn get_last_performance(
        &self,
        profile_id: ProfileID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Vec<SetHistory>>, ReadError>;
    async fn get_exercise_stats(
        &self,
        profile_id: ProfileID,
        exercise_id: ExerciseID,
    ) -> Result<Option<ExerciseStats>, ReadError>;
    async fn get_workout_histories(
        &self,
        profile_id: ProfileID,
    ) -> Result<Vec<WorkoutHistory>, ReadError>;
    async fn create_workout_history(
        &self,
        workout_history: NewWorkoutHistory,
    ) -> Result<WorkoutHistoryID, CreateError>;
    async fn create_set_records(&self, records: Vec<SetRecord>) -> Result<(), CreateError>;
}

#[allow(async_fn_in_trait)]
pub trait HistoryRepository {
    /// Sets of the most recent completed session per exercise, ordered by set number.
    ///
    /// Exercises that were never performed are absent from the result.
    async fn read_last_performance(
        &self,
        profile_id: ProfileID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Vec<SetHistory>>, ReadError>;
    async fn read_exercise_stats(
        &self,
        profile_id: ProfileID,
        exercise_id: ExerciseID,
    ) -> Result<Option<ExerciseStats>, ReadError>;
    async fn read_workout_histories(
        &self,
        profile_id: ProfileID,
    ) -> Result<Vec<WorkoutHistory>, ReadError>;
    async fn create_workout_history(
        &self,
        workout_history: NewWorkoutHistory,
    ) -> Result<WorkoutHistoryID, CreateError>;
    async fn create_set_records(&self, records: Vec<SetRecord>) -> Result<(), CreateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetHistory {
    pub set_number: u32,
    pub reps: Reps,
    pub weight: Weight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStats {
    pub max_weight: Weight,
}

#[derive(
    Deref, Display, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct WorkoutHistoryID(u32);

impl From<u32> for WorkoutHistoryID {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkoutHistory {
    pub profile_id: ProfileID,
    pub workout_id: Option<RoutineID>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutHistory {
    pub id: WorkoutHistoryID,
    pub workout_id: Option<RoutineID>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub profile_id: ProfileID,
    pub workout_history_id: WorkoutHistoryID,
    pub exercise_id: ExerciseID,
    pub set_number: u32,
    pub reps: Reps,
    pub weight: Weight,
}
