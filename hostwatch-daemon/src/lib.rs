//! Hostwatch daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `hostwatch-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod controller;
pub mod logging;
pub mod workers;
