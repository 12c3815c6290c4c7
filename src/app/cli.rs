use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "./mdtree-output";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert a folder of Markdown files into a mirrored folder of HTML pages",
    disable_version_flag = true
)]
pub struct Cli {
    /// Folder containing the Markdown sources
    pub input: PathBuf,

    /// Folder the HTML tree is written to
    #[arg(default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// JSON or TOML config file (defaults to <config dir>/mdtree/config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Patterns for files or directories to leave out (e.g., 'drafts/**')
    #[arg(long, num_args = 1..)]
    pub exclude: Option<Vec<String>>,

    /// Stop at the first file that fails to convert
    #[arg(long)]
    pub fail_fast: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),
}
