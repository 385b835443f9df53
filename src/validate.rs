use crate::format::Format;
use crate::units::UnitRegistry;

/// A problem found while checking a format against a unit registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    /// Reference name the error is about.
    pub reference: String,
    /// Position of the reference in `Format::references`.
    pub index: usize,
    /// Machine-readable error code.
    pub code: &'static str,
}

/// Check that every name a format references is a unit (or alias) the
/// registry knows, so captured values can be converted.
///
/// Returns an empty vec when all references resolve. A name referenced
/// several times is reported once, at its first occurrence.
pub fn validate_references(format: &Format, registry: &UnitRegistry) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = Vec::new();

    for (index, name) in format.references().iter().enumerate() {
        if registry.exists(name) || errors.iter().any(|e| &e.reference == name) {
            continue;
        }
        errors.push(ValidationError {
            message: format!("Reference \"{}\" does not name a known unit", name),
            reference: name.clone(),
            index,
            code: "unknown-unit",
        });
    }

    errors
}
