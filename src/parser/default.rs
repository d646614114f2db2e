use std::path::PathBuf;
use tracing::debug;
use crate::ast::{Command, OutputMode, OutputRedirect, Pipeline};
use crate::executor::PathResolver;
use crate::parser::{ParseError, Parser};

const PIPE: &str = "|";
const BACKGROUND: &str = "&";
const REDIRECT_IN: &str = "<";

/// Turns the word list of one line into a resolved [`Pipeline`].
pub struct DefaultParser<'a> {
    words: &'a [String],
    resolver: &'a PathResolver,
}

impl<'a> DefaultParser<'a> {
    pub fn new(words: &'a [String], resolver: &'a PathResolver) -> Self {
        Self { words, resolver }
    }

    fn resolve(&self, mut cmd: Command) -> Result<Command, ParseError> {
        cmd.argv = self.resolver.resolve_argv(&cmd.argv)?;
        Ok(cmd)
    }
}

impl<'a> Parser for DefaultParser<'a> {
    fn parse(&mut self) -> Result<Pipeline, ParseError> {
        let mut words = self.words;
        if words.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        let background = words.last().is_some_and(|w| w == BACKGROUND);
        if background {
            words = &words[..words.len() - 1];
        }

        let (left, right) = split_pipe(words)?;
        let left = self.resolve(parse_command(left)?)?;
        let right = match right {
            Some(words) => Some(self.resolve(parse_command(words)?)?),
            None => None,
        };

        let pipeline = Pipeline { left, right, background };
        debug!(?pipeline, "parsed");
        Ok(pipeline)
    }
}

fn split_pipe(words: &[String]) -> Result<(&[String], Option<&[String]>), ParseError> {
    let mut bars = words.iter().enumerate().filter(|(_, w)| *w == PIPE).map(|(i, _)| i);
    let Some(at) = bars.next() else {
        return Ok((words, None));
    };
    if bars.next().is_some() {
        return Err(ParseError::TooManyPipes);
    }
    Ok((&words[..at], Some(&words[at + 1..])))
}

/// Peels redirections off the tail of one side: output, then input, then
/// output again if it was not found the first time.
fn parse_command(words: &[String]) -> Result<Command, ParseError> {
    let mut words = words.to_vec();
    let mut output = take_output(&mut words);
    let input = take_tail(&mut words, |op| op == REDIRECT_IN);
    if output.is_none() {
        output = take_output(&mut words);
    }

    if words.is_empty() {
        return Err(ParseError::MissingCommand);
    }
    Ok(Command { argv: words, input: input.map(PathBuf::from), output })
}

fn take_output(words: &mut Vec<String>) -> Option<OutputRedirect> {
    let mut mode = OutputMode::Truncate;
    let path = take_tail(words, |op| match op {
        ">" => true,
        ">>" => {
            mode = OutputMode::Append;
            true
        }
        _ => false,
    })?;
    Some(OutputRedirect { path: PathBuf::from(path), mode })
}

/// Removes `<op> <target>` from the end of `words` when at least one word
/// would be left in front of it.
fn take_tail(words: &mut Vec<String>, mut is_op: impl FnMut(&str) -> bool) -> Option<String> {
    let n = words.len();
    if n < 3 || !is_op(&words[n - 2]) {
        return None;
    }
    let target = words.pop();
    words.pop();
    target
}
