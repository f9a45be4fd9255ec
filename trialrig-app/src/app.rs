use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use trialrig_experiment::{SessionConfig, run_session};

use crate::cli::Args;

pub struct App {
    args: Args,
    session: SessionConfig,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let file = File::open(&args.session_path)
            .with_context(|| format!("cannot open session {}", args.session_path.display()))?;
        let mut session: SessionConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid session {}", args.session_path.display()))?;

        if let Some(mode) = args.mode {
            session.simulation.mode = mode.into();
        }
        if args.seed.is_some() {
            session.seed = args.seed;
        }
        if args.realtime {
            session.simulation.realtime = true;
        }

        Ok(Self { args, session })
    }

    pub fn run(self) -> Result<()> {
        info!(
            "Running {} trial(s) in {:?} mode",
            self.session.trials.len(),
            self.session.simulation.mode
        );
        let outcome = run_session(&self.session).context("session failed")?;
        outcome.summary.log();

        let file = File::create(&self.args.out)
            .with_context(|| format!("cannot create {}", self.args.out.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &outcome.exported)
            .context("failed to write results")?;
        info!("Results saved to {}", self.args.out.display());

        Ok(())
    }
}
