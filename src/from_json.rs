use serde::Deserialize;

use crate::error::TimeError;
use crate::units::{UnitDefinition, UnitRegistry};

/// A unit file holds one definition or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitFile {
    Many(Vec<UnitDefinition>),
    One(UnitDefinition),
}

/// Parse unit definitions from JSON, e.g.
///
/// ```json
/// [{"name": "week", "base": "day", "scale": 7, "aliases": ["wk", "weeks"]}]
/// ```
pub fn parse_units(input: &str) -> Result<Vec<UnitDefinition>, TimeError> {
    let file: UnitFile = serde_json::from_str(input)
        .map_err(|err| TimeError::InvalidInput(format!("Bad unit definitions: {}", err)))?;
    Ok(match file {
        UnitFile::Many(definitions) => definitions,
        UnitFile::One(definition) => vec![definition],
    })
}

/// Define every unit in `input`, in order, so later entries may be based on
/// earlier ones. Returns the names defined.
///
/// Either every definition is applied or none is.
pub fn load_units(input: &str, registry: &mut UnitRegistry) -> Result<Vec<String>, TimeError> {
    let definitions = parse_units(input)?;
    let mut staged = registry.clone();
    let mut names = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let name = definition.name.clone();
        staged.define(definition)?;
        names.push(name);
    }

    *registry = staged;
    Ok(names)
}
