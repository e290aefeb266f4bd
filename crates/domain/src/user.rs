use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the authenticated user as issued by the auth provider.
#[derive(
    Deref, Display, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ProfileID(Uuid);

impl ProfileID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ProfileID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ProfileID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}
