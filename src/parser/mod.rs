pub mod default;

use thiserror::Error;
use crate::ast::Pipeline;
use crate::executor::ResolveError;

pub use default::DefaultParser;

pub trait Parser {
    fn parse(&mut self) -> Result<Pipeline, ParseError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Input is empty")]
    EmptyLine,
    #[error("missing command")]
    MissingCommand,
    #[error("only one pipe per line is supported")]
    TooManyPipes,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
