mod app;
mod cli;

use clap::Parser;

pub use app::App;
pub use cli::Args;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = App::new(Args::parse())?;
    app.run()?;

    Ok(())
}
