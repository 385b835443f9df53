use std::fmt;

/// Keywords of the code language. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Then,
    Else,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        if word.eq_ignore_ascii_case("IF") {
            Some(Keyword::If)
        } else if word.eq_ignore_ascii_case("THEN") {
            Some(Keyword::Then)
        } else if word.eq_ignore_ascii_case("ELSE") {
            Some(Keyword::Else)
        } else {
            None
        }
    }
}

/// Comparison operators usable in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a token is, with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `{`
    CodeOpen,
    /// `}`
    CodeClose,
    /// Text outside code sections, with `%` escapes resolved.
    LiteralText(String),
    Identifier(String),
    Keyword(Keyword),
    /// A numeric literal; `base` is 2, 8, 10 or 16.
    Number { value: f64, base: u32 },
    /// A quoted string inside code, with `%` escapes resolved.
    String(String),
    Comparator(Comparator),
    /// A character that cannot start any code token. Rejected by the parser.
    Unknown(char),
}

/// One lexical unit.
///
/// `raw` includes any whitespace skipped right before the token, and
/// `start` points at the beginning of that whitespace, so concatenating
/// the `raw` of every token reproduces the scanned input.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_code_close(&self) -> bool {
        matches!(self.kind, TokenKind::CodeClose)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}
