use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

use crate::{CreateError, DeleteError, ExerciseID, Name, ProfileID, ReadError};

#[allow(async_fn_in_trait)]
pub trait RoutineService {
    async fn get_routine(&self, id: RoutineID) -> Result<Routine, ReadError>;
    async fn create_routine(&self, profile_id: ProfileID, name: Name)
    -> Result<RoutineID, CreateError>;
    async fn replace_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError>;
    async fn create_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError>;
}

#[allow(async_fn_in_trait)]
pub trait RoutineRepository {
    async fn read_routine(&self, id: RoutineID) -> Result<Routine, ReadError>;
    async fn create_routine(&self, profile_id: ProfileID, name: Name)
    -> Result<RoutineID, CreateError>;
    /// Insert one row per exercise, numbering `exercise_order` from 1 in the given order.
    async fn create_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError>;
    async fn delete_routine_exercises(&self, id: RoutineID) -> Result<(), DeleteError>;
}

/// A named, reusable, ordered list of exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: RoutineID,
    pub name: Name,
    pub exercise_ids: Vec<ExerciseID>,
}

#[derive(
    Deref, Display, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RoutineID(u32);

impl From<u32> for RoutineID {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineExercise {
    pub workout_id: RoutineID,
    pub exercise_lib_id: ExerciseID,
    pub exercise_order: u32,
}

/// Rows linking a routine to its exercises in the order they are performed.
#[must_use]
pub fn routine_exercises(id: RoutineID, exercise_ids: &[ExerciseID]) -> Vec<RoutineExercise> {
    (1..)
        .zip(exercise_ids)
        .map(|(exercise_order, exercise_id)| RoutineExercise {
            workout_id: id,
            exercise_lib_id: *exercise_id,
            exercise_order,
        })
        .collect()
}
