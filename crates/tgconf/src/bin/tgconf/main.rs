mod cli;
mod outputs;

use tgconf::document::{Document, DEFAULT_FILENAME};
use tgconf::{Evaluator, ResolvedConfiguration};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TGCONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Evaluate(eval_cli) => evaluate(eval_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn evaluate(cli: cli::EvaluateCommand) -> anyhow::Result<()> {
    let document = load(&cli.input)?;

    let mut evaluator = Evaluator::new(document.filename());
    if let Some(command) = cli.terraform_command {
        evaluator = evaluator.with_terraform_command(command);
    }
    if let Some(directory) = cli.outputs_dir {
        anyhow::ensure!(
            directory.is_dir(),
            "outputs directory {} does not exist",
            directory.display()
        );
        evaluator = evaluator.with_retriever(outputs::DirectoryOutputs::new(directory));
    }

    let config = evaluator.evaluate_document(document)?;

    output(&cli.output, &config)?;
    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Document> {
    if let Some(path) = &input.file {
        return Ok(Document::load_file(path)?);
    }

    let stdin = std::io::read_to_string(std::io::stdin())?;
    let filename = input.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
    Ok(Document::parse(stdin.as_bytes(), filename)?)
}

fn output(output: &cli::OutputArgs, config: &ResolvedConfiguration) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), config)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), config)?,
    };

    Ok(())
}

/// (tgconf-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    let document = tgconf::normalize::normalized(load(&cli.input)?)?;

    match cli.command {
        Normalized => print!("{}", document.source()),
        Dependencies => {
            let (_, dependencies) = Evaluator::new(document.filename())
                .resolve_dependencies(&document, &Default::default())?;
            serde_json::to_writer_pretty(std::io::stdout(), &dependencies)?;
        }
    }

    Ok(())
}
