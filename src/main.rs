use clap::Parser;

use rusty_crossmatch::app::CrossMatchApp;
use rusty_crossmatch::config::{Args, RunConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = RunConfig::resolve(&args)?;
    log::debug!("Run configuration: {config:?}");

    let report = CrossMatchApp::new(config).run()?;
    if report.groups > 0 {
        log::info!(
            "{} of {} records grouped into {} groups",
            report.grouped_records,
            report.records,
            report.groups
        );
    }
    Ok(())
}
