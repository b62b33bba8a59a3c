use anyhow::Result;
use clap::Parser;

use rampr_stats::cli::Cli;

fn main() -> Result<()> {
    rampr_stats::app::run(Cli::parse())
}
