#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    None,           // End of line or comment
    Word,           // Unescaped, quote-stripped text
    Special(usize), // Index into the lexer's special symbol list
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: (usize, usize), // Byte range in the source line [start, end)
}

impl Token {
    pub fn none(pos: usize) -> Self {
        Token {
            kind: TokenKind::None,
            text: String::new(),
            span: (pos, pos),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == TokenKind::None
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}
