use crate::token::*;

/// Escape character for braces, itself, and quotes inside strings.
const ESCAPE: char = '%';

/// Lexer state: tracks position in the input string and code nesting.
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    tokens: Vec<Token>,
}

/// Scan a template string into tokens.
///
/// Never fails: an unterminated code section or string simply ends at the
/// end of input, and stray characters inside code come out as
/// [`TokenKind::Unknown`] for the parser to reject.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        input,
        pos: 0,
        depth: 0,
        tokens: Vec::new(),
    };

    while lexer.pos < lexer.input.len() {
        lexer.scan_literal();
        if lexer.peek_char() == Some('{') {
            let start = lexer.pos;
            lexer.advance(1);
            lexer.push(TokenKind::CodeOpen, start);
            lexer.depth = 1;
            lexer.scan_code();
        }
    }

    lexer.tokens
}

impl<'a> Lexer<'a> {
    // ── Helpers ──────────────────────────────────────────────────────

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            raw: self.input[start..self.pos].to_string(),
            start,
            end: self.pos,
        });
    }

    // ── Literal mode ────────────────────────────────────────────────

    fn scan_literal(&mut self) {
        let start = self.pos;
        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '{' => break,
                ESCAPE => {
                    self.advance(1);
                    match self.peek_char() {
                        Some(next @ ('{' | '}' | ESCAPE)) => {
                            self.advance(next.len_utf8());
                            value.push(next);
                        }
                        _ => value.push(ESCAPE),
                    }
                }
                _ => {
                    self.advance(ch.len_utf8());
                    value.push(ch);
                }
            }
        }
        if self.pos > start {
            self.push(TokenKind::LiteralText(value), start);
        }
    }

    // ── Code mode ───────────────────────────────────────────────────

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.advance(ch.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Scan tokens until the code section that was just opened is closed.
    /// Nested `{` inside code opens a nested block.
    fn scan_code(&mut self) {
        loop {
            let start = self.pos;
            self.skip_ws();
            let ch = match self.peek_char() {
                Some(ch) => ch,
                // Unterminated: trailing padding is dropped.
                None => return,
            };

            let kind = match ch {
                '}' => {
                    self.advance(1);
                    self.depth -= 1;
                    self.push(TokenKind::CodeClose, start);
                    if self.depth == 0 {
                        return;
                    }
                    continue;
                }
                '{' => {
                    self.advance(1);
                    self.depth += 1;
                    TokenKind::CodeOpen
                }
                '\'' | '"' => TokenKind::String(self.scan_string(ch)),
                '=' | '!' | '<' | '>' => self.scan_comparator(ch),
                _ if self.can_begin_number() => self.scan_number(),
                _ if ch.is_alphabetic() || ch == '_' => self.scan_word(),
                _ => {
                    self.advance(ch.len_utf8());
                    TokenKind::Unknown(ch)
                }
            };
            self.push(kind, start);
        }
    }

    fn scan_string(&mut self, quote: char) -> String {
        self.advance(quote.len_utf8());
        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            self.advance(ch.len_utf8());
            if ch == quote {
                break;
            }
            if ch == ESCAPE {
                match self.peek_char() {
                    Some(next) if next == quote || next == ESCAPE => {
                        self.advance(next.len_utf8());
                        value.push(next);
                    }
                    _ => value.push(ESCAPE),
                }
            } else {
                value.push(ch);
            }
        }
        value
    }

    fn scan_comparator(&mut self, ch: char) -> TokenKind {
        let (op, len) = match ch {
            '=' => (Comparator::Eq, 1),
            '!' if self.starts_with("!=") => (Comparator::Ne, 2),
            '<' if self.starts_with("<=") => (Comparator::Le, 2),
            '<' => (Comparator::Lt, 1),
            '>' if self.starts_with(">=") => (Comparator::Ge, 2),
            '>' => (Comparator::Gt, 1),
            _ => {
                self.advance(ch.len_utf8());
                return TokenKind::Unknown(ch);
            }
        };
        self.advance(len);
        TokenKind::Comparator(op)
    }

    // ── Numbers ─────────────────────────────────────────────────────

    fn can_begin_number(&self) -> bool {
        let digit_at = |n: usize| self.peek_nth(n).is_some_and(|c| c.is_ascii_digit());
        match self.peek_char() {
            Some(ch) if ch.is_ascii_digit() => true,
            Some('.') => digit_at(1),
            Some('+' | '-') => digit_at(1) || (self.peek_nth(1) == Some('.') && digit_at(2)),
            _ => false,
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let base = match self.peek_nth(1) {
            _ if self.peek_char() != Some('0') => 10,
            Some('x' | 'X') => 16,
            Some('o' | 'O') => 8,
            Some('b' | 'B') => 2,
            _ => 10,
        };
        if base == 10 {
            self.scan_decimal()
        } else {
            self.scan_radix(base)
        }
    }

    /// `0x`, `0o` or `0b` followed by digits of that base (any case).
    fn scan_radix(&mut self, base: u32) -> TokenKind {
        self.advance(2);
        let mut value = 0.0;
        while let Some(digit) = self.peek_char().and_then(|c| c.to_digit(base)) {
            value = value * f64::from(base) + f64::from(digit);
            self.advance(1);
        }
        TokenKind::Number { value, base }
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    fn scan_decimal(&mut self) -> TokenKind {
        let start = self.pos;

        if let Some('+' | '-') = self.peek_char() {
            self.advance(1);
        }
        self.consume_digits();

        // Fraction only when a digit follows the dot
        if self.peek_char() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
            self.consume_digits();
        }

        // Exponent only when digits follow, optionally after a sign
        if let Some('e' | 'E') = self.peek_char() {
            let exp_digits = match self.peek_nth(1) {
                Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exp_digits {
                self.advance(1);
                if let Some('+' | '-') = self.peek_char() {
                    self.advance(1);
                }
                self.consume_digits();
            }
        }

        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        TokenKind::Number { value, base: 10 }
    }

    // ── Words ───────────────────────────────────────────────────────

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance(ch.len_utf8());
            } else {
                break;
            }
        }
        let word = &self.input[start..self.pos];
        match Keyword::from_word(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word.to_string()),
        }
    }
}

/// Padding between code tokens.
fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}
