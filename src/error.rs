use thiserror::Error;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

impl Position {
    /// Locate a byte offset in `input`. Offsets past the end clamp to the end.
    pub fn locate(input: &str, offset: usize) -> Self {
        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }
        let consumed = &input[..offset];
        let line = consumed.matches('\n').count();
        let last_newline = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = consumed[last_newline..].chars().count();
        Position {
            line,
            column,
            offset,
        }
    }
}

/// Every failure the crate reports.
///
/// "No match" is deliberately absent: `Format::captures` returns an empty
/// mapping instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A template that cannot be compiled. `start..end` is a byte span in
    /// the template source (or in the token offsets, for pre-tokenized input).
    #[error("{message}")]
    MalformedTemplate {
        message: String,
        start: usize,
        end: usize,
    },

    #[error("Unknown unit \"{0}\"")]
    UnknownUnit(String),

    #[error("Invalid unit \"{name}\": {reason}")]
    InvalidUnit { name: String, reason: String },
}

impl TimeError {
    pub fn malformed(message: impl Into<String>, start: usize, end: usize) -> Self {
        TimeError::MalformedTemplate {
            message: message.into(),
            start,
            end,
        }
    }

    pub fn invalid_unit(name: &str, reason: impl Into<String>) -> Self {
        TimeError::InvalidUnit {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TimeError::InvalidInput(_) => "invalid-input",
            TimeError::MalformedTemplate { .. } => "template-syntax-error",
            TimeError::UnknownUnit(_) => "unknown-unit",
            TimeError::InvalidUnit { .. } => "invalid-unit",
        }
    }

    /// The byte span of a template error, if this is one.
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            TimeError::MalformedTemplate { start, end, .. } => Some((*start, *end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_first_line() {
        let pos = Position::locate("abc{x}", 3);
        assert_eq!(pos.line, 0);
        assert_eq!(pos.column, 3);
        assert_eq!(pos.offset, 3);
    }

    #[test]
    fn locate_after_newline() {
        let pos = Position::locate("ab\ncd{", 5);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 2);
    }

    #[test]
    fn locate_clamps_past_end() {
        let pos = Position::locate("ab", 10);
        assert_eq!(pos.offset, 2);
        assert_eq!(pos.column, 2);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(TimeError::malformed("x", 0, 1).code(), "template-syntax-error");
        assert_eq!(TimeError::UnknownUnit("fortnight".into()).code(), "unknown-unit");
        assert_eq!(
            TimeError::invalid_unit("millisecond", "already defined").to_string(),
            "Invalid unit \"millisecond\": already defined"
        );
    }
}
