//! Duration templates: a small language that renders named time magnitudes
//! into text and matches text back into those magnitudes, plus a registry
//! of time units for converting between them.
//!
//! ```
//! use timestring::{Format, Record};
//!
//! let format = Format::new("{hrs} {IF hrs = 1 THEN 'hour' ELSE 'hours'}").unwrap();
//! let data = Record::from([("hrs".to_string(), 2.0)]);
//! assert_eq!(format.render(&data), "2 hours");
//! assert_eq!(format.captures("1 hour")["hrs"].as_number(), Some(1.0));
//! ```

pub mod ast;
pub mod error;
pub mod format;
pub mod from_json;
pub mod interpreter;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod units;
pub mod validate;
pub mod value;

pub use ast::Template;
pub use error::{Position, TimeError};
pub use format::{Format, FormatCatalog};
pub use from_json::load_units;
pub use lexer::tokenize;
pub use parser::parse;
pub use token::{Token, TokenKind};
pub use units::{Unit, UnitDefinition, UnitRegistry, UnitUpdate, ROOT_UNIT};
pub use validate::{validate_references, ValidationError};
pub use value::{Captured, Captures, Record};

/// Tokenize, parse and compile template source in one step.
pub fn compile(source: &str) -> Result<Format, TimeError> {
    Format::new(source)
}
