use std::collections::BTreeMap;

use log::{debug, error};

use crate::{
    CreateError, ExerciseID, ExerciseRef, ExerciseRepository, ExerciseService, ExerciseStats,
    HistoryRepository, HistoryService, Name, NewWorkoutHistory, ProfileID, ReadError, Routine,
    RoutineID, RoutineRepository, RoutineService, SetHistory, SetRecord, WorkoutHistory,
    WorkoutHistoryID,
};

pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func.await;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(crate::StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

impl<R: ExerciseRepository> ExerciseService for Service<R> {
    async fn get_exercises(&self) -> Result<Vec<ExerciseRef>, ReadError> {
        log_on_error!(
            self.repository.read_exercises(),
            ReadError,
            "get",
            "exercises"
        )
    }
}

impl<R: HistoryRepository> HistoryService for Service<R> {
    async fn get_last_performance(
        &self,
        profile_id: ProfileID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Vec<SetHistory>>, ReadError> {
        log_on_error!(
            self.repository
                .read_last_performance(profile_id, exercise_ids),
            ReadError,
            "get",
            "last performance"
        )
    }

    async fn get_exercise_stats(
        &self,
        profile_id: ProfileID,
        exercise_id: ExerciseID,
    ) -> Result<Option<ExerciseStats>, ReadError> {
        log_on_error!(
            self.repository.read_exercise_stats(profile_id, exercise_id),
            ReadError,
            "get",
            "exercise stats"
        )
    }

    async fn get_workout_histories(
        &self,
        profile_id: ProfileID,
    ) -> Result<Vec<WorkoutHistory>, ReadError> {
        log_on_error!(
            self.repository.read_workout_histories(profile_id),
            ReadError,
            "get",
            "workout histories"
        )
    }

    async fn create_workout_history(
        &self,
        workout_history: NewWorkoutHistory,
    ) -> Result<WorkoutHistoryID, CreateError> {
        log_on_error!(
            self.repository.create_workout_history(workout_history),
            CreateError,
            "create",
            "workout history"
        )
    }

    async fn create_set_records(&self, records: Vec<SetRecord>) -> Result<(), CreateError> {
        log_on_error!(
            self.repository.create_set_records(records),
            CreateError,
            "create",
            "set records"
        )
    }
}

impl<R: RoutineRepository> RoutineService for Service<R> {
    async fn get_routine(&self, id: RoutineID) -> Result<Routine, ReadError> {
        log_on_error!(
            self.repository.read_routine(id),
            ReadError,
            "get",
            "routine"
        )
    }

    async fn create_routine(
        &self,
        profile_id: ProfileID,
        name: Name,
    ) -> Result<RoutineID, CreateError> {
        log_on_error!(
            self.repository.create_routine(profile_id, name),
            CreateError,
            "create",
            "routine"
        )
    }

    async fn replace_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError> {
        let result = async {
            self.repository.delete_routine_exercises(id).await?;
            self.repository
                .create_routine_exercises(id, exercise_ids)
                .await
        };
        log_on_error!(result, CreateError, "replace", "routine exercises")
    }

    async fn create_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError> {
        log_on_error!(
            self.repository.create_routine_exercises(id, exercise_ids),
            CreateError,
            "create",
            "routine exercises"
        )
    }
}
