//! tgconf cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tgconf ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a terragrunt configuration
    ///
    /// Reads HCL from stdin unless a file is provided (via --file)
    #[command(alias = "eval")]
    Evaluate(EvaluateCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct EvaluateCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Terraform command the configuration is evaluated for
    ///
    /// Mock outputs are only used if the command is listed in
    /// mock_outputs_allowed_terraform_commands (or no list is given).
    #[clap(long = "terraform-command")]
    pub terraform_command: Option<String>,

    /// Directory containing dependency outputs
    ///
    /// The outputs of dependency "<name>" are read from <dir>/<name>.json,
    /// in the format written by `terraform output -json`.
    /// Without this, only mock outputs are available.
    #[clap(short = 'o', long = "outputs-dir")]
    pub outputs_dir: Option<PathBuf>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load a file
    #[clap(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Filename used in error messages when reading from stdin
    #[clap(long = "filename", conflicts_with("file"))]
    pub filename: Option<String>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Print the document after labeling bare include blocks
    Normalized,
    /// Print the dependencies as seen by the first pass
    Dependencies,
}
