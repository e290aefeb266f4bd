//! Supabase REST
//!
//! Talks to the PostgREST interface of a Supabase project. Requests go through a [`SendRequest`]
//! implementation, so the transport can be replaced in tests.

use std::collections::BTreeMap;

use liftlog_domain as domain;
use log::debug;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Table or RPC path relative to `/rest/v1/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Value of the `Prefer` header.
    pub prefer: Option<&'static str>,
}

impl Request {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: vec![],
            body: None,
            prefer: None,
        }
    }

    fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    fn post(path: &str, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Post, path)
        }
    }

    fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path)
    }

    fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn prefer(mut self, prefer: &'static str) -> Self {
        self.prefer = Some(prefer);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

#[allow(async_fn_in_trait)]
pub trait SendRequest {
    async fn send_request(&self, request: Request) -> Result<Response, domain::StorageError>;
}

pub struct ReqwestSendRequest {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl ReqwestSendRequest {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, access_token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: access_token.map(ToString::to_string),
        }
    }
}

impl SendRequest for ReqwestSendRequest {
    async fn send_request(&self, request: Request) -> Result<Response, domain::StorageError> {
        let url = format!("{}/rest/v1/{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, &url)
            .query(&request.query)
            .header("apikey", &self.api_key)
            .bearer_auth(self.access_token.as_ref().unwrap_or(&self.api_key));
        if let Some(prefer) = request.prefer {
            builder = builder.header("Prefer", prefer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                domain::StorageError::NoConnection
            } else {
                domain::StorageError::Other(Box::new(err))
            }
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| domain::StorageError::Other(Box::new(err)))?;

        Ok(Response { status, body })
    }
}

#[derive(thiserror::Error, Debug)]
enum RESTError {
    #[error("conflict")]
    Conflict,
    #[error(transparent)]
    Storage(#[from] domain::StorageError),
}

impl From<RESTError> for domain::ReadError {
    fn from(value: RESTError) -> Self {
        match value {
            RESTError::Conflict => domain::ReadError::Other("conflict".into()),
            RESTError::Storage(storage) => domain::ReadError::Storage(storage),
        }
    }
}

impl From<RESTError> for domain::CreateError {
    fn from(value: RESTError) -> Self {
        match value {
            RESTError::Conflict => domain::CreateError::Conflict,
            RESTError::Storage(storage) => domain::CreateError::Storage(storage),
        }
    }
}

impl From<RESTError> for domain::DeleteError {
    fn from(value: RESTError) -> Self {
        match value {
            RESTError::Conflict => domain::DeleteError::Other("conflict".into()),
            RESTError::Storage(storage) => domain::DeleteError::Storage(storage),
        }
    }
}

pub struct REST<S: SendRequest> {
    sender: S,
}

impl<S: SendRequest> REST<S> {
    pub const fn new(sender: S) -> Self {
        Self { sender }
    }

    async fn send(&self, request: Request) -> Result<Response, RESTError> {
        debug!("{} {}", request.method, request.path);
        let response = self.sender.send_request(request).await?;
        match response.status {
            200..=299 => Ok(response),
            401 | 403 => Err(domain::StorageError::NoSession.into()),
            409 => Err(RESTError::Conflict),
            status => Err(domain::StorageError::Other(
                format!("{status} {}", response.body.trim()).into(),
            )
            .into()),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: Request) -> Result<T, RESTError> {
        let response = self.send(request).await?;
        serde_json::from_str(&response.body).map_err(|err| {
            domain::StorageError::Other(format!("deserialization failed: {err}").into()).into()
        })
    }

    async fn fetch_id(&self, request: Request) -> Result<u32, RESTError> {
        self.fetch::<Vec<Id>>(request)
            .await?
            .first()
            .map(|row| row.id)
            .ok_or_else(|| domain::StorageError::Other("empty response".into()).into())
    }

    async fn fetch_no_content(&self, request: Request) -> Result<(), RESTError> {
        self.send(request).await.map(|_| ())
    }
}

#[derive(Deserialize)]
struct Id {
    id: u32,
}

#[derive(Deserialize)]
struct LastPerformance {
    exercise_id: domain::ExerciseID,
    set_number: u32,
    reps: domain::Reps,
    weight: domain::Weight,
}

#[derive(Deserialize)]
struct ExerciseStats {
    max_weight: domain::Weight,
}

#[derive(Deserialize)]
struct Routine {
    id: domain::RoutineID,
    workout_name: domain::Name,
    #[serde(default)]
    workout_exercises: Vec<RoutineExercise>,
}

#[derive(Deserialize)]
struct RoutineExercise {
    exercise_lib_id: domain::ExerciseID,
    exercise_order: u32,
}

impl From<Routine> for domain::Routine {
    fn from(mut value: Routine) -> Self {
        value.workout_exercises.sort_by_key(|e| e.exercise_order);
        Self {
            id: value.id,
            name: value.workout_name,
            exercise_ids: value
                .workout_exercises
                .iter()
                .map(|e| e.exercise_lib_id)
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct NewRoutine {
    profile_id: domain::ProfileID,
    workout_name: domain::Name,
}

impl<S: SendRequest> domain::ExerciseRepository for REST<S> {
    async fn read_exercises(&self) -> Result<Vec<domain::ExerciseRef>, domain::ReadError> {
        Ok(self
            .fetch(
                Request::get("exercise_library")
                    .query("select", "id,name,category,equipment")
                    .query("order", "name.asc"),
            )
            .await?)
    }
}

impl<S: SendRequest> domain::HistoryRepository for REST<S> {
    async fn read_last_performance(
        &self,
        profile_id: domain::ProfileID,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<BTreeMap<domain::ExerciseID, Vec<domain::SetHistory>>, domain::ReadError> {
        if exercise_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let rows: Vec<LastPerformance> = self
            .fetch(Request::post(
                "rpc/get_last_performance",
                json!({
                    "p_profile_id": profile_id,
                    "p_exercise_ids": exercise_ids,
                }),
            ))
            .await?;

        let mut result: BTreeMap<domain::ExerciseID, Vec<domain::SetHistory>> = BTreeMap::new();
        for row in rows {
            result
                .entry(row.exercise_id)
                .or_default()
                .push(domain::SetHistory {
                    set_number: row.set_number,
                    reps: row.reps,
                    weight: row.weight,
                });
        }
        for sets in result.values_mut() {
            sets.sort_by_key(|s| s.set_number);
        }
        Ok(result)
    }

    async fn read_exercise_stats(
        &self,
        profile_id: domain::ProfileID,
        exercise_id: domain::ExerciseID,
    ) -> Result<Option<domain::ExerciseStats>, domain::ReadError> {
        let rows: Vec<ExerciseStats> = self
            .fetch(
                Request::get("exercise_stats")
                    .query("select", "max_weight")
                    .query("profile_id", format!("eq.{profile_id}"))
                    .query("exercise_id", format!("eq.{exercise_id}")),
            )
            .await?;
        Ok(rows.first().map(|row| domain::ExerciseStats {
            max_weight: row.max_weight,
        }))
    }

    async fn read_workout_histories(
        &self,
        profile_id: domain::ProfileID,
    ) -> Result<Vec<domain::WorkoutHistory>, domain::ReadError> {
        Ok(self
            .fetch(
                Request::get("workout_history")
                    .query("select", "id,workout_id,duration_minutes,completed_at")
                    .query("profile_id", format!("eq.{profile_id}"))
                    .query("order", "completed_at.desc"),
            )
            .await?)
    }

    async fn create_workout_history(
        &self,
        workout_history: domain::NewWorkoutHistory,
    ) -> Result<domain::WorkoutHistoryID, domain::CreateError> {
        let body = serde_json::to_value(&workout_history)
            .map_err(|err| domain::CreateError::Other(Box::new(err)))?;
        Ok(self
            .fetch_id(
                Request::post("workout_history", body)
                    .query("select", "id")
                    .prefer("return=representation"),
            )
            .await?
            .into())
    }

    async fn create_set_records(
        &self,
        records: Vec<domain::SetRecord>,
    ) -> Result<(), domain::CreateError> {
        if records.is_empty() {
            return Ok(());
        }
        let body =
            serde_json::to_value(&records).map_err(|err| domain::CreateError::Other(Box::new(err)))?;
        Ok(self
            .fetch_no_content(Request::post("workout_sets", body).prefer("return=minimal"))
            .await?)
    }
}

impl<S: SendRequest> domain::RoutineRepository for REST<S> {
    async fn read_routine(
        &self,
        id: domain::RoutineID,
    ) -> Result<domain::Routine, domain::ReadError> {
        let rows: Vec<Routine> = self
            .fetch(
                Request::get("workouts")
                    .query(
                        "select",
                        "id,workout_name,workout_exercises(exercise_lib_id,exercise_order)",
                    )
                    .query("id", format!("eq.{id}")),
            )
            .await?;
        rows.into_iter()
            .next()
            .map(domain::Routine::from)
            .ok_or(domain::ReadError::NotFound)
    }

    async fn create_routine(
        &self,
        profile_id: domain::ProfileID,
        name: domain::Name,
    ) -> Result<domain::RoutineID, domain::CreateError> {
        let body = serde_json::to_value(NewRoutine {
            profile_id,
            workout_name: name,
        })
        .map_err(|err| domain::CreateError::Other(Box::new(err)))?;
        Ok(self
            .fetch_id(
                Request::post("workouts", body)
                    .query("select", "id")
                    .prefer("return=representation"),
            )
            .await?
            .into())
    }

    async fn create_routine_exercises(
        &self,
        id: domain::RoutineID,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<(), domain::CreateError> {
        if exercise_ids.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_value(domain::routine_exercises(id, exercise_ids))
            .map_err(|err| domain::CreateError::Other(Box::new(err)))?;
        Ok(self
            .fetch_no_content(Request::post("workout_exercises", body).prefer("return=minimal"))
            .await?)
    }

    async fn delete_routine_exercises(
        &self,
        id: domain::RoutineID,
    ) -> Result<(), domain::DeleteError> {
        Ok(self
            .fetch_no_content(
                Request::delete("workout_exercises").query("workout_id", format!("eq.{id}")),
            )
            .await?)
    }
}
