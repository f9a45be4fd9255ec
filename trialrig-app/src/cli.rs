use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use trialrig_experiment::SimulationMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Session file (JSON)
    #[arg(value_name = "SESSION_PATH")]
    pub session_path: PathBuf,

    /// Where sealed trial records are written
    #[arg(long, default_value = "experiment_results.json")]
    pub out: PathBuf,

    /// Simulation mode (overrides the session file)
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Random seed (overrides the session file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pace visual simulation against the wall clock
    #[arg(long, default_value_t = false)]
    pub realtime: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    DataOnly,
    Visual,
}

impl From<Mode> for SimulationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::DataOnly => SimulationMode::DataOnly,
            Mode::Visual => SimulationMode::Visual,
        }
    }
}
