pub mod main;
pub mod system;
pub mod utils;
pub mod vad;

pub use main::Config;
pub use system::ServerConfig;
pub use vad::{DetectionDefaults, EnergyScorerConfig, ModelConfig, SileroScorerConfig};
