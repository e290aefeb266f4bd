use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

use crate::{
    CreateError, DeleteError, ExerciseID, ExerciseRef, ExerciseStats, HistoryRepository, Name,
    NewWorkoutHistory, ProfileID, ReadError, Reps, Routine, RoutineID, RoutineRepository,
    SetHistory, SetRecord, StorageError, Weight, WorkoutHistory, WorkoutHistoryID,
};

/// Repository double recording every call and failing on request.
#[derive(Default)]
pub struct FakeRepository {
    pub last_performance: BTreeMap<ExerciseID, Vec<SetHistory>>,
    pub stats: BTreeMap<ExerciseID, ExerciseStats>,
    pub routines: RefCell<BTreeMap<RoutineID, Routine>>,
    pub fail_reads: bool,
    pub fail_writes: RefCell<BTreeSet<&'static str>>,
    pub calls: RefCell<Vec<String>>,
    pub histories: RefCell<Vec<NewWorkoutHistory>>,
    pub set_records: RefCell<Vec<SetRecord>>,
}

impl FakeRepository {
    pub fn with_history(
        mut self,
        exercise_id: u32,
        sets: &[(u32, f32)],
        max_weight: Option<f32>,
    ) -> Self {
        self.last_performance.insert(
            exercise_id.into(),
            (1..)
                .zip(sets)
                .map(|(set_number, (reps, weight))| SetHistory {
                    set_number,
                    reps: Reps::new(*reps),
                    weight: Weight::new(*weight).unwrap(),
                })
                .collect(),
        );
        if let Some(max_weight) = max_weight {
            self.stats.insert(
                exercise_id.into(),
                ExerciseStats {
                    max_weight: Weight::new(max_weight).unwrap(),
                },
            );
        }
        self
    }

    pub fn with_stats(mut self, exercise_id: u32, max_weight: f32) -> Self {
        self.stats.insert(
            exercise_id.into(),
            ExerciseStats {
                max_weight: Weight::new(max_weight).unwrap(),
            },
        );
        self
    }

    pub fn with_routine(self, id: u32, name: &str, exercise_ids: &[u32]) -> Self {
        self.routines.borrow_mut().insert(
            id.into(),
            Routine {
                id: id.into(),
                name: Name::new(name).unwrap(),
                exercise_ids: exercise_ids.iter().map(|id| (*id).into()).collect(),
            },
        );
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn fail_write(&self, operation: &'static str) {
        self.fail_writes.borrow_mut().insert(operation);
    }

    pub fn succeed_writes(&self) {
        self.fail_writes.borrow_mut().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn check_read(&self) -> Result<(), ReadError> {
        if self.fail_reads {
            return Err(StorageError::NoConnection.into());
        }
        Ok(())
    }

    fn check_write(&self, operation: &'static str) -> Result<(), StorageError> {
        if self.fail_writes.borrow().contains(operation) {
            return Err(StorageError::Other(format!("{operation} rejected").into()));
        }
        Ok(())
    }
}

pub fn exercise(id: u32) -> ExerciseRef {
    ExerciseRef::new(id, &format!("Exercise {id}"))
}

impl HistoryRepository for FakeRepository {
    async fn read_last_performance(
        &self,
        _profile_id: ProfileID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Vec<SetHistory>>, ReadError> {
        self.record(format!(
            "read_last_performance {}",
            exercise_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        ));
        self.check_read()?;
        Ok(self
            .last_performance
            .iter()
            .filter(|(id, _)| exercise_ids.contains(id))
            .map(|(id, sets)| (*id, sets.clone()))
            .collect())
    }

    async fn read_exercise_stats(
        &self,
        _profile_id: ProfileID,
        exercise_id: ExerciseID,
    ) -> Result<Option<ExerciseStats>, ReadError> {
        self.record(format!("read_exercise_stats {exercise_id}"));
        self.check_read()?;
        Ok(self.stats.get(&exercise_id).copied())
    }

    async fn read_workout_histories(
        &self,
        _profile_id: ProfileID,
    ) -> Result<Vec<WorkoutHistory>, ReadError> {
        self.check_read()?;
        Ok(vec![])
    }

    async fn create_workout_history(
        &self,
        workout_history: NewWorkoutHistory,
    ) -> Result<WorkoutHistoryID, CreateError> {
        self.record(String::from("create_workout_history"));
        self.check_write("create_workout_history")?;
        let mut histories = self.histories.borrow_mut();
        histories.push(workout_history);
        Ok(u32::try_from(histories.len()).unwrap().into())
    }

    async fn create_set_records(&self, records: Vec<SetRecord>) -> Result<(), CreateError> {
        self.record(format!("create_set_records {}", records.len()));
        self.check_write("create_set_records")?;
        self.set_records.borrow_mut().extend(records);
        Ok(())
    }
}

impl RoutineRepository for FakeRepository {
    async fn read_routine(&self, id: RoutineID) -> Result<Routine, ReadError> {
        self.check_read()?;
        self.routines
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound)
    }

    async fn create_routine(
        &self,
        _profile_id: ProfileID,
        name: Name,
    ) -> Result<RoutineID, CreateError> {
        self.record(format!("create_routine {name}"));
        self.check_write("create_routine")?;
        let mut routines = self.routines.borrow_mut();
        let id = RoutineID::from(routines.keys().last().map_or(1, |id| **id + 1));
        routines.insert(
            id,
            Routine {
                id,
                name,
                exercise_ids: vec![],
            },
        );
        Ok(id)
    }

    async fn create_routine_exercises(
        &self,
        id: RoutineID,
        exercise_ids: &[ExerciseID],
    ) -> Result<(), CreateError> {
        self.record(format!("create_routine_exercises {id}"));
        self.check_write("create_routine_exercises")?;
        if let Some(routine) = self.routines.borrow_mut().get_mut(&id) {
            routine.exercise_ids.extend_from_slice(exercise_ids);
        }
        Ok(())
    }

    async fn delete_routine_exercises(&self, id: RoutineID) -> Result<(), DeleteError> {
        self.record(format!("delete_routine_exercises {id}"));
        self.check_write("delete_routine_exercises")?;
        if let Some(routine) = self.routines.borrow_mut().get_mut(&id) {
            routine.exercise_ids.clear();
        }
        Ok(())
    }
}
