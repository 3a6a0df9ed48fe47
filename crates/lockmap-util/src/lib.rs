#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for lockmap.
//!
//! Pure helpers with no logging/tracing dependencies.

pub mod digest;
pub mod fs;
