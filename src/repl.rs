use std::io::{BufRead, Write};
use tracing::{debug, info};
use crate::ast::Pipeline;
use crate::config::Config;
use crate::error::ShellError;
use crate::executor::{BackgroundJob, Executor, JobState, LaunchReport, PathResolver};
use crate::lexer::split_words;
use crate::parser::{DefaultParser, Parser};
use crate::prompt::ShellPrompt;

const GREETING: &str = "Type \"help\" if you are lost";
const FAREWELL: &str = "Cya later! :)";
const HELP: &str = "\
I run programs found in the search path, or by their path:
 prog [args...]
 prog [args...] > file      (>> appends)
 prog [args...] < file
 prog1 [args...] | prog2 [args...]
 ... &                      (run in background)
Quote with ' or \", escape with \\, and # starts a comment.
 help
 quit";

/// What happened to one line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Blank or comment-only line.
    Empty,
    Help,
    Quit,
    Launched(LaunchReport),
}

pub struct Shell<E: Executor> {
    config: Config,
    resolver: PathResolver,
    executor: E,
}

impl<E: Executor> Shell<E> {
    pub fn new(config: Config, executor: E) -> Self {
        let resolver = PathResolver::with_search_dirs(config.search_path.clone());
        Shell { config, resolver, executor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Parses one line and, if it names programs, launches them.
    pub fn eval(&mut self, line: &str) -> Result<Outcome, ShellError> {
        match line.trim() {
            "quit" => return Ok(Outcome::Quit),
            "help" => return Ok(Outcome::Help),
            _ => {}
        }

        let words = split_words(line)?;
        if words.is_empty() {
            return Ok(Outcome::Empty);
        }
        let pipeline: Pipeline = DefaultParser::new(&words, &self.resolver).parse()?;
        let report = self.executor.exec(&pipeline)?;
        Ok(Outcome::Launched(report))
    }

    /// Reads and evaluates lines until `quit` or end of input. Per-line
    /// errors are reported and the loop goes on; only terminal I/O errors
    /// end it early.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        prompt: &mut ShellPrompt<R>,
        out: &mut W,
    ) -> Result<(), ShellError> {
        writeln!(out, "{}", GREETING)?;
        writeln!(out, "{}", HELP)?;
        loop {
            let reaped = self.executor.sweep_background();
            print_reaped(out, &reaped)?;

            prompt.show_prompt(out)?;
            let Some(line) = prompt.read_line()? else {
                writeln!(out)?;
                info!("end of input");
                return Ok(());
            };
            if self.config.echo_input {
                writeln!(out, "{}", line)?;
            }

            match self.eval(&line) {
                Ok(Outcome::Empty) => {}
                Ok(Outcome::Help) => writeln!(out, "{}", HELP)?,
                Ok(Outcome::Quit) => {
                    writeln!(out, "{}", FAREWELL)?;
                    return Ok(());
                }
                Ok(Outcome::Launched(report)) => print_report(out, &report)?,
                Err(err) => {
                    debug!(%line, "line rejected");
                    eprintln!("msh: {}", err);
                }
            }
        }
    }
}

fn print_report(out: &mut impl Write, report: &LaunchReport) -> std::io::Result<()> {
    match report {
        LaunchReport::Foreground(exits) => {
            for exit in exits {
                writeln!(out, "Process {} finished with status {}", exit.pid, exit.state)?;
            }
        }
        LaunchReport::Background(pids) => {
            for pid in pids {
                writeln!(out, "Process {} run in background", pid)?;
            }
        }
    }
    Ok(())
}

fn print_reaped(out: &mut impl Write, jobs: &[BackgroundJob]) -> std::io::Result<()> {
    for job in jobs {
        if let JobState::Reaped(state) = job.state {
            writeln!(out, "Process {} finished with status {}", job.pid, state)?;
        }
    }
    Ok(())
}
