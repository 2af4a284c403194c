//! Cross-matching of periodic-source candidates recorded in several
//! observation files.
//!
//! Records from different files that agree in period and dispersion within
//! a relative tolerance are linked, and linked records are collected into
//! transitively closed groups. Each group is exported to its own file,
//! summarised in a combined report and plotted.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod matching;
pub mod plot;
