use thiserror::Error;
use trialrig_core::ConfigError;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("trial did not finish within {horizon_ms} ms of virtual time")]
    Stalled { horizon_ms: u64 },

    #[error("trial finished without emitting a record")]
    MissingRecord,

    #[error("failed to export record: {0}")]
    Export(#[from] serde_json::Error),
}
