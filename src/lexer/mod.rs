mod lexer;
mod token;

pub use lexer::{LexError, Lexer, unescape};
pub use token::{Token, TokenKind};

/// Splits a line into argument words. No special symbols are recognized, so
/// operators such as `|` or `>` only come out as their own words when they
/// are separated by blanks.
///
/// A lexical error anywhere in the line discards every word found so far.
pub fn split_words(line: &str) -> Result<Vec<String>, LexError> {
    let mut lexer = Lexer::new(line, &[]);
    let mut words = Vec::new();
    loop {
        let token = lexer.next_token()?;
        if !token.is_word() {
            break;
        }
        words.push(token.text.clone());
    }
    Ok(words)
}
