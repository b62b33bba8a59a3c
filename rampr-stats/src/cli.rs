use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "rampr-stats",
    version,
    about = "Aggregate rampr result-*.csv files and print a LaTeX table of response times"
)]
pub struct Cli {
    /// Directory containing the result-<session>-<run>.csv files
    pub directory: PathBuf,
}
