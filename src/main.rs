use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use mini_shell_rs::config::{ConfigLoader, Config};
use mini_shell_rs::error::ShellError;
use mini_shell_rs::executor::DefaultExecutor;
use mini_shell_rs::logging;
use mini_shell_rs::prompt::ShellPrompt;
use mini_shell_rs::repl::Shell;

#[derive(Debug, Parser)]
#[command(name = "msh", version, about = "A small line-oriented command interpreter")]
struct Cli {
    /// Echo every line read back before running it
    #[arg(short = 'x', long = "echo")]
    echo: bool,

    /// key=value configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), ShellError> {
    let mut config: Config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::default_config(),
    };
    if cli.echo {
        config.echo_input = true;
    }
    logging::init(&config.log_level);
    tracing::debug!(?config, "starting");

    let mut prompt = ShellPrompt::stdin(config.prompt.clone());
    let mut shell = Shell::new(config, DefaultExecutor::new());
    shell.run(&mut prompt, &mut io::stdout())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("msh: {}", err);
            ExitCode::FAILURE
        }
    }
}
