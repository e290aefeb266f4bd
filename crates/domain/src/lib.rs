#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod completion;
mod error;
mod exercise;
mod history;
mod name;
mod routine;
mod service;
mod timer;
mod user;
mod workout;

pub use completion::*;
pub use error::*;
pub use exercise::*;
pub use history::*;
pub use name::*;
pub use routine::*;
pub use service::*;
pub use timer::*;
pub use user::*;
pub use workout::*;

#[cfg(test)]
mod tests {
    pub mod fake;
}
