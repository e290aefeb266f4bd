#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod command;
pub mod log;
pub mod settings;
