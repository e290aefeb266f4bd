//! In-memory storage
//!
//! Keeps the catalog, routines and workout history of all profiles in process memory. Last
//! performance and exercise stats are derived from the recorded sets. The whole state can be
//! exported to and restored from JSON to keep it between runs.

use std::{cell::RefCell, collections::BTreeMap};

use liftlog_domain as domain;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Default)]
pub struct InMemory {
    state: RefCell<State>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct State {
    exercises: Vec<domain::ExerciseRef>,
    routines: BTreeMap<domain::RoutineID, Routine>,
    routine_exercises: Vec<domain::RoutineExercise>,
    histories: BTreeMap<domain::WorkoutHistoryID, History>,
    sets: Vec<domain::SetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Routine {
    profile_id: domain::ProfileID,
    name: domain::Name,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct History {
    profile_id: domain::ProfileID,
    workout_id: Option<domain::RoutineID>,
    duration_minutes: u32,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl InMemory {
    #[must_use]
    pub fn new(exercises: Vec<domain::ExerciseRef>) -> Self {
        Self {
            state: RefCell::new(State {
                exercises,
                ..State::default()
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            state: RefCell::new(serde_json::from_str(json)?),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.state.borrow())
    }

    /// Sets of the latest workout of the profile that contains the exercise.
    fn last_performance(
        state: &State,
        profile_id: domain::ProfileID,
        exercise_id: domain::ExerciseID,
    ) -> Option<Vec<domain::SetHistory>> {
        let latest = state
            .sets
            .iter()
            .filter(|s| s.profile_id == profile_id && s.exercise_id == exercise_id)
            .filter_map(|s| {
                state
                    .histories
                    .get(&s.workout_history_id)
                    .map(|h| (h.completed_at, s.workout_history_id))
            })
            .max()?
            .1;

        let mut sets = state
            .sets
            .iter()
            .filter(|s| s.workout_history_id == latest && s.exercise_id == exercise_id)
            .map(|s| domain::SetHistory {
                set_number: s.set_number,
                reps: s.reps,
                weight: s.weight,
            })
            .collect::<Vec<_>>();
        sets.sort_by_key(|s| s.set_number);
        Some(sets)
    }

    fn next_id<K: Copy + std::ops::Deref<Target = u32>, V>(map: &BTreeMap<K, V>) -> u32 {
        map.keys().last().map_or(1, |id| **id + 1)
    }
}

impl domain::ExerciseRepository for InMemory {
    async fn read_exercises(&self) -> Result<Vec<domain::ExerciseRef>, domain::ReadError> {
        let mut exercises = self.state.borrow().exercises.clone();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }
}

impl domain::HistoryRepository for InMemory {
    async fn read_last_performance(
        &self,
        profile_id: domain::ProfileID,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<BTreeMap<domain::ExerciseID, Vec<domain::SetHistory>>, domain::ReadError> {
        let state = self.state.borrow();
        Ok(exercise_ids
            .iter()
            .filter_map(|id| Self::last_performance(&state, profile_id, *id).map(|s| (*id, s)))
            .collect())
    }

    async fn read_exercise_stats(
        &self,
        profile_id: domain::ProfileID,
        exercise_id: domain::ExerciseID,
    ) -> Result<Option<domain::ExerciseStats>, domain::ReadError> {
        Ok(self
            .state
            .borrow()
            .sets
            .iter()
            .filter(|s| s.profile_id == profile_id && s.exercise_id == exercise_id)
            .map(|s| s.weight)
            .reduce(|max, w| if w > max { w } else { max })
            .map(|max_weight| domain::ExerciseStats { max_weight }))
    }

    async fn read_workout_histories(
        &self,
        profile_id: domain::ProfileID,
    ) -> Result<Vec<domain::WorkoutHistory>, domain::ReadError> {
        let mut histories = self
            .state
            .borrow()
            .histories
            .iter()
            .filter(|(_, h)| h.profile_id == profile_id)
            .map(|(id, h)| domain::WorkoutHistory {
                id: *id,
                workout_id: h.workout_id,
                duration_minutes: h.duration_minutes,
                completed_at: h.completed_at,
            })
            .collect::<Vec<_>>();
        histories.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(histories)
    }

    async fn create_workout_history(
        &self,
        workout_history: domain::NewWorkoutHistory,
    ) -> Result<domain::WorkoutHistoryID, domain::CreateError> {
        let mut state = self.state.borrow_mut();
        if let Some(workout_id) = workout_history.workout_id {
            if !state.routines.contains_key(&workout_id) {
                return Err(domain::CreateError::Other(
                    format!("unknown routine {workout_id}").into(),
                ));
            }
        }
        let id = domain::WorkoutHistoryID::from(Self::next_id(&state.histories));
        state.histories.insert(
            id,
            History {
                profile_id: workout_history.profile_id,
                workout_id: workout_history.workout_id,
                duration_minutes: workout_history.duration_minutes,
                completed_at: workout_history.completed_at,
            },
        );
        debug!("stored workout history {id}");
        Ok(id)
    }

    async fn create_set_records(
        &self,
        records: Vec<domain::SetRecord>,
    ) -> Result<(), domain::CreateError> {
        let mut state = self.state.borrow_mut();
        if let Some(record) = records
            .iter()
            .find(|r| !state.histories.contains_key(&r.workout_history_id))
        {
            return Err(domain::CreateError::Other(
                format!("unknown workout history {}", record.workout_history_id).into(),
            ));
        }
        state.sets.extend(records);
        Ok(())
    }
}

impl domain::RoutineRepository for InMemory {
    async fn read_routine(
        &self,
        id: domain::RoutineID,
    ) -> Result<domain::Routine, domain::ReadError> {
        let state = self.state.borrow();
        let routine = state.routines.get(&id).ok_or(domain::ReadError::NotFound)?;
        let mut exercises = state
            .routine_exercises
            .iter()
            .filter(|e| e.workout_id == id)
            .collect::<Vec<_>>();
        exercises.sort_by_key(|e| e.exercise_order);
        Ok(domain::Routine {
            id,
            name: routine.name.clone(),
            exercise_ids: exercises.iter().map(|e| e.exercise_lib_id).collect(),
        })
    }

    async fn create_routine(
        &self,
        profile_id: domain::ProfileID,
        name: domain::Name,
    ) -> Result<domain::RoutineID, domain::CreateError> {
        let mut state = self.state.borrow_mut();
        if state
            .routines
            .values()
            .any(|r| r.profile_id == profile_id && r.name == name)
        {
            return Err(domain::CreateError::Conflict);
        }
        let id = domain::RoutineID::from(Self::next_id(&state.routines));
        state.routines.insert(id, Routine { profile_id, name });
        Ok(id)
    }

    async fn create_routine_exercises(
        &self,
        id: domain::RoutineID,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<(), domain::CreateError> {
        let mut state = self.state.borrow_mut();
        if !state.routines.contains_key(&id) {
            return Err(domain::CreateError::Other(
                format!("unknown routine {id}").into(),
            ));
        }
        state
            .routine_exercises
            .extend(domain::routine_exercises(id, exercise_ids));
        Ok(())
    }

    async fn delete_routine_exercises(
        &self,
        id: domain::RoutineID,
    ) -> Result<(), domain::DeleteError> {
        self.state
            .borrow_mut()
            .routine_exercises
            .retain(|e| e.workout_id != id);
        Ok(())
    }
}
