//! HTTP voice activity detection service.
//!
//! Uploaded audio is decoded, scored frame by frame and turned into speech
//! segments with summary statistics.

pub mod api_types;
pub mod audio;
pub mod client;
pub mod config_manager;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod vad;

pub use client::{DetectOptions, VadClient};
pub use config_manager::Config;
pub use error::VadError;
pub use state::AppState;
