use std::fmt;

use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

use crate::ReadError;

#[allow(async_fn_in_trait)]
pub trait ExerciseService {
    async fn get_exercises(&self) -> Result<Vec<ExerciseRef>, ReadError>;
}

#[allow(async_fn_in_trait)]
pub trait ExerciseRepository {
    async fn read_exercises(&self) -> Result<Vec<ExerciseRef>, ReadError>;
}

/// Catalog entry of the exercise library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
    pub id: ExerciseID,
    pub name: String,
    pub category: Option<String>,
    pub equipment: Option<String>,
}

impl ExerciseRef {
    #[must_use]
    pub fn new(id: impl Into<ExerciseID>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            category: None,
            equipment: None,
        }
    }

    #[must_use]
    pub fn matches(&self, query: &str, category: Option<&str>) -> bool {
        let query = query.trim().to_lowercase();
        if !query.is_empty() && !self.name.to_lowercase().contains(&query) {
            return false;
        }
        match category {
            Some(category) => self
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category.trim())),
            None => true,
        }
    }
}

/// Filter the catalog by a name substring and an optional category, ordered by name.
#[must_use]
pub fn search<'a>(
    exercises: &'a [ExerciseRef],
    query: &str,
    category: Option<&str>,
) -> Vec<&'a ExerciseRef> {
    let mut result = exercises
        .iter()
        .filter(|e| e.matches(query, category))
        .collect::<Vec<_>>();
    result.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    result
}

#[derive(
    Deref, Display, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ExerciseID(u32);

impl From<u32> for ExerciseID {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(
    Deref, Display, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Reps(u32);

impl Reps {
    pub const UNSET: Reps = Reps(0);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl From<u32> for Reps {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Weight(f32);

impl Weight {
    pub const UNSET: Weight = Weight(0.0);

    pub fn new(value: f32) -> Result<Self, WeightError> {
        if value.is_nan() || value.is_infinite() {
            return Err(WeightError::NotFinite);
        }

        if value < 0.0 {
            return Err(WeightError::Negative);
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn is_unset(self) -> bool {
        self.0 == 0.0
    }
}

impl From<u32> for Weight {
    fn from(value: u32) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Self(value as f32)
    }
}

impl TryFrom<f32> for Weight {
    type Error = WeightError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Weight::new(value)
    }
}

impl From<Weight> for f32 {
    fn from(value: Weight) -> Self {
        value.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{:.1}", self.0)
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("Weight must not be negative")]
    Negative,
    #[error("Weight must be a finite number")]
    NotFinite,
}

/// Parse free text typed into a reps or weight field.
///
/// Every non-digit character is dropped. Empty or overflowing input yields 0.
#[must_use]
pub fn parse_numeric_input(raw: &str) -> u32 {
    let digits = raw.chars().filter(char::is_ascii_digit).collect::<String>();
    digits.parse::<u32>().unwrap_or(0)
}
