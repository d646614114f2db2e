use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate, // >
    Append,   // >>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: PathBuf,
    pub mode: OutputMode,
}

/// One program invocation. `argv[0]` holds the resolved executable path once
/// the parser is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub input: Option<PathBuf>,
    pub output: Option<OutputRedirect>,
}

impl Command {
    pub fn new(argv: Vec<String>) -> Self {
        Command {
            argv,
            input: None,
            output: None,
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub left: Command,
    pub right: Option<Command>,
    pub background: bool,
}

impl Pipeline {
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        std::iter::once(&self.left).chain(self.right.as_ref())
    }

    pub fn is_piped(&self) -> bool {
        self.right.is_some()
    }
}
