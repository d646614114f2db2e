use thiserror::Error;
use super::token::{Token, TokenKind};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LexError {
    #[error("no matching quote {0} for the string starting at position {1}")]
    UnterminatedQuote(char, usize),
    #[error("line can't end in '\\' (position {0})")]
    TrailingBackslash(usize),
    #[error("invalid escape '\\{0}' outside of quoted string at position {1}")]
    InvalidEscape(char, usize),
}

/// Splits one line into words and caller-registered special symbols.
///
/// The lexer produces one token per call to [`Lexer::next_token`]. Once an
/// error has been reported it sticks: every later call returns the same error
/// without moving the cursor.
pub struct Lexer {
    line: String,
    pos: usize,
    error: Option<LexError>,
    token: Token,
    specials: Vec<String>,
}

impl Lexer {
    /// `specials` is tried in order at every position, so a symbol that is a
    /// prefix of another one must be listed after it.
    pub fn new(line: &str, specials: &[&str]) -> Self {
        Lexer {
            line: line.to_string(),
            pos: 0,
            error: None,
            token: Token::none(0),
            specials: specials.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn error(&self) -> Option<&LexError> {
        self.error.as_ref()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn next_token(&mut self) -> Result<&Token, LexError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match self.scan() {
            Ok(token) => {
                self.token = token;
                Ok(&self.token)
            }
            Err(err) => {
                self.token = Token::none(self.pos);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Collects tokens up to and including the terminating `None` token.
    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?.clone();
            let done = token.is_none();
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        let bytes = self.line.as_bytes();
        let len = bytes.len();
        let mut pos = self.pos;

        while pos < len && is_blank(bytes[pos]) {
            pos += 1;
        }
        if pos >= len {
            self.pos = len;
            return Ok(Token::none(len));
        }

        let start = pos;
        if bytes[start] == b'#' {
            // A comment swallows the rest of the line
            self.pos = len;
            return Ok(Token::none(start));
        }

        if let Some(i) = match_special(&self.specials, &bytes[start..]) {
            let end = start + self.specials[i].len();
            self.pos = end;
            return Ok(Token {
                kind: TokenKind::Special(i),
                text: self.specials[i].clone(),
                span: (start, end),
            });
        }

        let (raw_start, raw_end, next) = match bytes[start] {
            quote @ (b'\'' | b'"') => {
                let mut p = start + 1;
                while p < len && bytes[p] != quote {
                    // A backslash hides the next byte from the quote search
                    p += if bytes[p] == b'\\' && p + 1 < len { 2 } else { 1 };
                }
                if p >= len {
                    return Err(LexError::UnterminatedQuote(quote as char, start));
                }
                (start + 1, p, p + 1)
            }
            _ => {
                let mut p = start;
                while p < len {
                    let b = bytes[p];
                    if is_blank(b) || b == b'#' {
                        break;
                    }
                    if match_special(&self.specials, &bytes[p..]).is_some() {
                        break;
                    }
                    if b == b'\\' {
                        match bytes.get(p + 1) {
                            Some(b' ' | b'\t' | b'\\' | b'#' | b'\'' | b'"') => {
                                p += 2;
                                continue;
                            }
                            Some(_) => {
                                let ch = self.line[p + 1..].chars().next().unwrap_or_default();
                                return Err(LexError::InvalidEscape(ch, p));
                            }
                            None => return Err(LexError::TrailingBackslash(p)),
                        }
                    }
                    p += 1;
                }
                (start, p, p)
            }
        };

        let text = unescape(&self.line[raw_start..raw_end], raw_start)?;
        self.pos = next;
        Ok(Token {
            kind: TokenKind::Word,
            text,
            span: (start, next),
        })
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn match_special(specials: &[String], rest: &[u8]) -> Option<usize> {
    specials
        .iter()
        .position(|s| !s.is_empty() && rest.starts_with(s.as_bytes()))
}

/// Resolves backslash escapes in a word whose extent is already known.
/// `offset` is where `raw` starts in the line, for error positions.
pub fn unescape(raw: &str, offset: usize) -> Result<String, LexError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err(LexError::TrailingBackslash(offset + i)),
            Some((_, 'n')) => out.push('\n'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, 't')) => out.push('\t'),
            Some((_, other)) => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, text: &str, span: (usize, usize)) -> Token {
        Token {
            kind,
            text: text.to_string(),
            span,
        }
    }

    fn words(line: &str) -> Vec<String> {
        let mut lexer = Lexer::new(line, &[]);
        lexer
            .tokenize_all()
            .unwrap()
            .into_iter()
            .filter(|t| t.is_word())
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_tokenize_simple_words() {
        let mut lexer = Lexer::new("echo hello", &[]);
        let tokens = lexer.tokenize_all().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "echo", (0, 4)),
                token(TokenKind::Word, "hello", (5, 10)),
                token(TokenKind::None, "", (10, 10)),
            ]
        );
    }

    #[test]
    fn test_plain_lines_match_blank_splitting() {
        for line in ["ls -l /tmp", "  a\tb   c  ", "", "one", "x\t\ty"] {
            let expected: Vec<String> = line.split_whitespace().map(String::from).collect();
            assert_eq!(words(line), expected, "line: {:?}", line);
        }
    }

    #[test]
    fn test_tokenize_specials() {
        let mut lexer = Lexer::new("ls|wc>>out", &[">>", ">", "|"]);
        let tokens = lexer.tokenize_all().unwrap();
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Word, "ls", (0, 2)),
                token(TokenKind::Special(2), "|", (2, 3)),
                token(TokenKind::Word, "wc", (3, 5)),
                token(TokenKind::Special(0), ">>", (5, 7)),
                token(TokenKind::Word, "out", (7, 10)),
                token(TokenKind::None, "", (10, 10)),
            ]
        );
    }

    #[test]
    fn test_first_listed_special_wins() {
        let mut lexer = Lexer::new("a >> b", &[">", ">>"]);
        let kinds: Vec<TokenKind> = lexer.tokenize_all().unwrap().into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Word,
                TokenKind::Special(0),
                TokenKind::Special(0),
                TokenKind::Word,
                TokenKind::None,
            ]
        );
    }

    #[test]
    fn test_empty_special_never_matches() {
        assert_eq!(
            Lexer::new("a b", &[""]).tokenize_all().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_quoted_words() {
        assert_eq!(words("ls 'foo bar'"), vec!["ls", "foo bar"]);
        assert_eq!(words("echo 'foo' \"bar baz\" qux"), vec!["echo", "foo", "bar baz", "qux"]);
        assert_eq!(words("''"), vec![""]);
    }

    #[test]
    fn test_escapes_inside_quotes() {
        assert_eq!(
            words("\"Ada\\n\\t \\\"Bob\\'\" Cal"),
            vec!["Ada\n\t \"Bob'", "Cal"]
        );
        assert_eq!(words(r"'a\rb\\c\qd'"), vec!["a\rb\\cqd"]);
        assert_eq!(words(r"'it\'s'"), vec!["it's"]);
    }

    #[test]
    fn test_escapes_outside_quotes() {
        assert_eq!(words(r"Ada\ Bob \ Cal\ "), vec!["Ada Bob", " Cal "]);
        assert_eq!(words(r"a\#b a\'b a\\b"), vec!["a#b", "a'b", "a\\b"]);
    }

    #[test]
    fn test_comment() {
        assert_eq!(words("Ada#Bob"), vec!["Ada"]);
        assert_eq!(words("# nothing here"), Vec::<String>::new());
        assert_eq!(words("ls 'a#b' # trailing"), vec!["ls", "a#b"]);
    }

    #[test]
    fn test_non_ascii_words() {
        assert_eq!(words("héllo 'wörld ü'"), vec!["héllo", "wörld ü"]);
    }

    #[test]
    fn test_unterminated_single_quote() {
        let mut lexer = Lexer::new("echo 'foo", &[]);
        assert_eq!(lexer.tokenize_all(), Err(LexError::UnterminatedQuote('\'', 5)));
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let mut lexer = Lexer::new(r#"echo "foo\""#, &[]);
        assert_eq!(lexer.tokenize_all(), Err(LexError::UnterminatedQuote('"', 5)));
    }

    #[test]
    fn test_trailing_backslash() {
        let mut lexer = Lexer::new("abc\\", &[]);
        assert_eq!(lexer.tokenize_all(), Err(LexError::TrailingBackslash(3)));
    }

    #[test]
    fn test_invalid_escape_outside_quotes() {
        let mut lexer = Lexer::new(r"a\qb", &[]);
        assert_eq!(lexer.tokenize_all(), Err(LexError::InvalidEscape('q', 1)));
    }

    #[test]
    fn test_error_is_sticky() {
        let mut lexer = Lexer::new("ok 'broken", &[]);
        assert_eq!(lexer.next_token().unwrap().text, "ok");
        let err = lexer.next_token().unwrap_err();
        let pos = lexer.position();
        assert_eq!(lexer.next_token(), Err(err.clone()));
        assert_eq!(lexer.position(), pos);
        assert_eq!(lexer.error(), Some(&err));
        assert!(lexer.token().is_none());
    }

    #[test]
    fn test_unescape_rules() {
        assert_eq!(unescape(r#"\n\r\t\'\"\\\x"#, 0).unwrap(), "\n\r\t'\"\\x");
        assert_eq!(unescape(r"ab\", 4), Err(LexError::TrailingBackslash(6)));
    }
}
