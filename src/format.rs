use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::ast::{Node, Template};
use crate::error::TimeError;
use crate::interpreter;
use crate::parser::parse;
use crate::value::{format_number, Captured, Captures, Record};

/// Grammar shared by every reference capture and by capture coercion:
/// sign, digits, optional fraction, optional exponent.
pub const NUMBER_PATTERN: &str = r"[+-]?(?:[0-9]*\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?";

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", NUMBER_PATTERN)).expect("number pattern is valid")
});

/// Read `text` as a number only when it fits the capture grammar, so words
/// like `inf` or `NaN` stay text.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    if NUMBER.is_match(text) {
        text.parse().ok()
    } else {
        None
    }
}

/// A compiled template: renders records to text and matches text back
/// into records.
///
/// The match pattern and the reference list are derived from the same
/// walk over the syntax tree the renderer evaluates, so the capture groups
/// line up with what `render` prints.
#[derive(Clone)]
pub struct Format {
    template: Template,
    pattern: String,
    regex: Regex,
    references: Vec<String>,
}

/// Pattern text and reference names, accumulated in source order.
#[derive(Default)]
struct Fragment {
    pattern: String,
    references: Vec<String>,
}

impl Fragment {
    fn compile(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::StringLiteral(text) => self.pattern.push_str(&regex::escape(text)),
                Node::IntegerLiteral(n) => self.pattern.push_str(&regex::escape(&format_number(*n))),
                Node::NamedReference(name) => {
                    self.pattern.push('(');
                    self.pattern.push_str(NUMBER_PATTERN);
                    self.pattern.push(')');
                    self.references.push(name.clone());
                }
                Node::BooleanExpression(_) => self.pattern.push_str("(?:true|false)"),
                Node::TemplateBlock(children) => self.compile(children),
                // Consequent is tried first
                Node::ConditionalStatement(cond) => {
                    self.pattern.push_str("(?:");
                    self.compile(&cond.consequent.body);
                    self.pattern.push('|');
                    self.compile(&cond.alternate.body);
                    self.pattern.push(')');
                }
            }
        }
    }
}

impl Format {
    /// Compile template source.
    pub fn new(source: &str) -> Result<Self, TimeError> {
        // Pattern errors have no single culprit, so they cover the whole source
        Self::from_template(parse(source)?).map_err(|err| match err {
            TimeError::MalformedTemplate { message, .. } => {
                TimeError::malformed(message, 0, source.len())
            }
            other => other,
        })
    }

    /// Compile an already-parsed template.
    pub fn from_template(template: Template) -> Result<Self, TimeError> {
        let mut fragment = Fragment::default();
        fragment.compile(&template.body);

        let regex = Regex::new(&format!("(?:{})$", fragment.pattern)).map_err(|err| {
            TimeError::malformed(format!("Template cannot be matched: {}", err), 0, 0)
        })?;

        debug!(
            pattern = %fragment.pattern,
            references = fragment.references.len(),
            "compiled format"
        );

        Ok(Format {
            template,
            pattern: fragment.pattern,
            regex,
            references: fragment.references,
        })
    }

    /// Render a record. Names missing from the record render as nothing.
    pub fn render(&self, data: &Record) -> String {
        interpreter::render(&self.template, data)
    }

    /// Match the end of `input` against the template and recover the
    /// referenced values. Leading text is skipped; an input whose end does
    /// not match yields an empty mapping.
    ///
    /// When a name is captured more than once the last capture wins;
    /// references in a branch that did not match are skipped.
    pub fn captures(&self, input: &str) -> Captures {
        let mut out = Captures::new();
        if let Some(caps) = self.regex.captures(input) {
            for (name, group) in self.references.iter().zip(caps.iter().skip(1)) {
                if let Some(m) = group {
                    out.insert(name.clone(), coerce(m.as_str()));
                }
            }
        }
        out
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// The unanchored match pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Reference names in capture-group order. A name appears once per
    /// occurrence in the template.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

fn coerce(text: &str) -> Captured {
    match parse_number(text) {
        Some(n) => Captured::Number(n),
        None => Captured::Text(text.to_string()),
    }
}

impl FromStr for Format {
    type Err = TimeError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Format::new(source)
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Format")
            .field("pattern", &self.pattern)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

/// Formats registered under names, shared by reference.
#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    formats: HashMap<String, Arc<Format>>,
}

impl FormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source` and register it under `key`, replacing any format
    /// already there. Nothing is registered if compilation fails.
    pub fn define(&mut self, key: &str, source: &str) -> Result<Arc<Format>, TimeError> {
        let format = Format::new(source)?;
        Ok(self.insert(key, format))
    }

    pub fn insert(&mut self, key: impl Into<String>, format: Format) -> Arc<Format> {
        let format = Arc::new(format);
        self.formats.insert(key.into(), Arc::clone(&format));
        format
    }

    pub fn get(&self, key: &str) -> Option<Arc<Format>> {
        self.formats.get(key).cloned()
    }

    pub fn remove(&mut self, key: &str) -> Option<Arc<Format>> {
        self.formats.remove(key)
    }

    /// Registered names, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, f64)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn numbers(pairs: &[(&str, f64)]) -> Captures {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Captured::Number(*v)))
            .collect()
    }

    #[test]
    fn literal_template_is_identity() {
        let format = Format::new("2 hours (approx.) *").unwrap();
        assert_eq!(format.render(&Record::new()), "2 hours (approx.) *");
        assert!(format.is_match("2 hours (approx.) *"));
        assert!(format.captures("2 hours (approx.) *").is_empty());
        assert!(format.references().is_empty());
    }

    #[test]
    fn reference_pattern() {
        let format = Format::new("{hrs}h").unwrap();
        assert_eq!(format.pattern(), format!("({})h", NUMBER_PATTERN));
        assert_eq!(format.references(), ["hrs".to_string()]);
    }

    #[test]
    fn round_trip() {
        let format = Format::new("{hrs} {IF hrs = 1 THEN 'hour' ELSE 'hours'} {mins}m").unwrap();
        for data in [
            record(&[("hrs", 1.0), ("mins", 5.0)]),
            record(&[("hrs", 2.0), ("mins", 0.5)]),
            record(&[("hrs", -3.0), ("mins", 12.0)]),
        ] {
            let text = format.render(&data);
            let back = format.captures(&text);
            let expected: Captures = data
                .iter()
                .map(|(k, v)| (k.clone(), Captured::Number(*v)))
                .collect();
            assert_eq!(back, expected, "round trip through {:?}", text);
        }
    }

    #[test]
    fn no_match_is_empty() {
        let format = Format::new("{secs}s").unwrap();
        assert!(format.captures("five seconds").is_empty());
        assert!(format.captures("5s trailing").is_empty());
    }

    #[test]
    fn leading_text_is_skipped() {
        let format = Format::new("{secs}s").unwrap();
        assert_eq!(format.captures("leading 5s"), numbers(&[("secs", 5.0)]));
        assert_eq!(format.captures("t-minus -3s"), numbers(&[("secs", -3.0)]));
        assert!(format.is_match("about 1.5s"));
    }

    #[test]
    fn number_grammar() {
        let format = Format::new("{x}").unwrap();
        assert_eq!(format.captures("+.5"), numbers(&[("x", 0.5)]));
        assert_eq!(format.captures("-2e3"), numbers(&[("x", -2000.0)]));
        assert!(format.captures("2.").is_empty());
        assert!(format.captures("").is_empty());
    }

    #[test]
    fn alternation_branches_and_references() {
        let format =
            Format::new("{IF long THEN days ' days ' hrs ' hours' ELSE hrs 'h'}").unwrap();
        assert_eq!(
            format.references(),
            ["days".to_string(), "hrs".to_string(), "hrs".to_string()]
        );
        assert_eq!(
            format.captures("2 days 3 hours"),
            numbers(&[("days", 2.0), ("hrs", 3.0)])
        );
        assert_eq!(format.captures("7h"), numbers(&[("hrs", 7.0)]));
    }

    #[test]
    fn duplicate_names_last_writer_wins() {
        let format = Format::new("{a}-{a}").unwrap();
        assert_eq!(format.captures("1-2"), numbers(&[("a", 2.0)]));
    }

    #[test]
    fn consequent_preferred_on_tie() {
        let format = Format::new("{IF x THEN 'a' n ELSE 'a' m}").unwrap();
        assert_eq!(format.captures("a4"), numbers(&[("n", 4.0)]));
    }

    #[test]
    fn literals_in_code_are_matched_as_rendered() {
        let format = Format::new("{1.50 ' x ' 0x10}").unwrap();
        assert_eq!(format.render(&Record::new()), "1.5 x 16");
        assert!(format.is_match("1.5 x 16"));
    }

    #[test]
    fn bare_comparison_matches_boolean_text() {
        let format = Format::new("{a > 1}:{a}").unwrap();
        let text = format.render(&record(&[("a", 3.0)]));
        assert_eq!(text, "true:3");
        assert_eq!(format.captures(&text), numbers(&[("a", 3.0)]));
    }

    #[test]
    fn from_str_and_from_template_agree() {
        let parsed: Format = "{a} and {b}".parse().unwrap();
        let built = Format::from_template(parse("{a} and {b}").unwrap()).unwrap();
        assert_eq!(parsed.pattern(), built.pattern());
        assert_eq!(parsed.template(), built.template());
    }

    #[test]
    fn malformed_template_fails_to_compile() {
        let err = Format::new("{= 1}").unwrap_err();
        assert_eq!(err.code(), "template-syntax-error");
    }

    #[test]
    fn pattern_errors_cover_the_template() {
        // Nested conditionals nest groups past the regex engine's limit
        let depth = 300;
        let source = format!(
            "{}'x'{}",
            "{IF a THEN ".repeat(depth),
            "}".repeat(depth)
        );
        let err = Format::new(&source).unwrap_err();
        assert_eq!(err.code(), "template-syntax-error");
        assert_eq!(err.span(), Some((0, source.len())));
    }

    #[test]
    fn number_reading_follows_capture_grammar() {
        assert_eq!(parse_number("-2.5e1"), Some(-25.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("2."), None);
    }

    #[test]
    fn format_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Format>();
        assert_send_sync::<FormatCatalog>();
    }

    #[test]
    fn catalog_define_and_replace() {
        let mut catalog = FormatCatalog::new();
        let short = catalog.define("short", "{hrs}h").unwrap();
        assert_eq!(short.render(&record(&[("hrs", 2.0)])), "2h");

        catalog.define("short", "{hrs} hours").unwrap();
        let replaced = catalog.get("short").unwrap();
        assert_eq!(replaced.render(&record(&[("hrs", 2.0)])), "2 hours");
        // Earlier handles keep the format they were given
        assert_eq!(short.render(&record(&[("hrs", 2.0)])), "2h");

        assert!(catalog.define("broken", "{<}").is_err());
        assert_eq!(catalog.keys(), vec!["short"]);
        assert!(catalog.remove("short").is_some());
        assert!(catalog.get("short").is_none());
    }
}
