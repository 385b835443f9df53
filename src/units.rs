//! Time units: a forest rooted at `millisecond`, where every other unit is
//! a scale of exactly one already-registered unit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TimeError;

/// The only unit without a base.
pub const ROOT_UNIT: &str = "millisecond";

/// Units every default registry starts with: name, base, scale, aliases.
const BUILTIN_UNITS: &[(&str, &str, f64, &[&str])] = &[
    ("second", ROOT_UNIT, 1000.0, &["s", "sec", "secs", "seconds"]),
    ("minute", "second", 60.0, &["min", "mins", "minutes"]),
    ("hour", "minute", 60.0, &["h", "hr", "hrs", "hours"]),
    ("day", "hour", 24.0, &["d", "days"]),
];

/// A registered unit: `scale` of its `base`. Returned by value, so
/// callers never hold a reference into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub base: Option<String>,
    pub scale: f64,
}

/// A new unit. `base` defaults to the root unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl UnitDefinition {
    pub fn new(name: impl Into<String>, scale: f64) -> Self {
        UnitDefinition {
            name: name.into(),
            scale,
            ..Default::default()
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Changes to an existing unit. Fields left `None` are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitUpdate {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Registry of time units and their aliases.
///
/// Mutation takes `&mut self`; to share a registry between threads, wrap it
/// in a `RwLock` so writers are serialized and readers share.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<String, Unit>,
    /// alias -> canonical unit name
    aliases: HashMap<String, String>,
}

impl UnitRegistry {
    /// A registry holding only the root unit.
    pub fn new() -> Self {
        let mut units = HashMap::new();
        units.insert(
            ROOT_UNIT.to_string(),
            Unit {
                base: None,
                scale: 1.0,
            },
        );
        UnitRegistry {
            units,
            aliases: HashMap::new(),
        }
    }

    /// Resolve a unit or alias to the canonical unit name.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.units.get_key_value(name) {
            return Some(key.as_str());
        }
        self.aliases.get(name).map(String::as_str)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.units.contains_key(name) || self.aliases.contains_key(name)
    }

    /// A copy of a unit's entry. Aliases resolve to their unit.
    pub fn unit(&self, name: &str) -> Result<Unit, TimeError> {
        self.canonical(name)
            .and_then(|canonical| self.units.get(canonical))
            .cloned()
            .ok_or_else(|| TimeError::UnknownUnit(name.to_string()))
    }

    /// Every unit and alias name, sorted.
    pub fn all(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .units
            .keys()
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    /// Register a new unit, then its aliases.
    pub fn define(&mut self, definition: UnitDefinition) -> Result<(), TimeError> {
        let UnitDefinition {
            name,
            base,
            scale,
            alias,
            aliases,
        } = definition;

        if name.is_empty() || starts_with_digit(&name) {
            return Err(TimeError::invalid_unit(
                &name,
                "names must be non-empty and not start with a digit",
            ));
        }
        if self.exists(&name) {
            return Err(TimeError::invalid_unit(&name, "already defined"));
        }
        check_scale(&name, scale)?;

        let base_name = base.as_deref().unwrap_or(ROOT_UNIT);
        let base = self
            .canonical(base_name)
            .ok_or_else(|| {
                TimeError::invalid_unit(&name, format!("base unit \"{}\" is not defined", base_name))
            })?
            .to_string();
        // Units left behind by `trash` may still name `name` as their base
        if self.chain_contains(&base, &name) {
            return Err(TimeError::invalid_unit(
                &name,
                format!("basing it on \"{}\" would create a cycle", base),
            ));
        }

        debug!(unit = %name, base = %base, scale, "defined unit");
        self.units.insert(
            name.clone(),
            Unit {
                base: Some(base),
                scale,
            },
        );
        self.alias(&name, alias.into_iter().chain(aliases))?;
        Ok(())
    }

    /// Add aliases for an existing unit (or for the unit an alias names).
    ///
    /// Candidates that are empty, start with a digit, or are already taken
    /// are skipped. Returns the aliases that were added.
    pub fn alias<I, S>(&mut self, name: &str, candidates: I) -> Result<Vec<String>, TimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = self
            .canonical(name)
            .ok_or_else(|| TimeError::UnknownUnit(name.to_string()))?
            .to_string();

        let mut accepted = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if candidate.is_empty() || starts_with_digit(candidate) || self.exists(candidate) {
                debug!(alias = candidate, unit = %canonical, "alias skipped");
                continue;
            }
            self.aliases
                .insert(candidate.to_string(), canonical.clone());
            accepted.push(candidate.to_string());
        }
        Ok(accepted)
    }

    /// Change an existing unit's base or scale and add aliases. A failed
    /// update changes nothing.
    pub fn update(&mut self, update: UnitUpdate) -> Result<(), TimeError> {
        let name = self
            .canonical(&update.name)
            .ok_or_else(|| TimeError::UnknownUnit(update.name.clone()))?
            .to_string();
        let mut unit = self.unit(&name)?;

        if name == ROOT_UNIT && (update.base.is_some() || update.scale.is_some()) {
            return Err(TimeError::invalid_unit(
                &name,
                "the root unit's base and scale are fixed",
            ));
        }

        if let Some(scale) = update.scale {
            check_scale(&name, scale)?;
            unit.scale = scale;
        }

        if let Some(base_name) = &update.base {
            let base = self
                .canonical(base_name)
                .ok_or_else(|| {
                    TimeError::invalid_unit(
                        &name,
                        format!("base unit \"{}\" is not defined", base_name),
                    )
                })?
                .to_string();
            if self.chain_contains(&base, &name) {
                return Err(TimeError::invalid_unit(
                    &name,
                    format!("basing it on \"{}\" would create a cycle", base),
                ));
            }
            unit.base = Some(base);
        }

        debug!(unit = %name, base = ?unit.base, scale = unit.scale, "updated unit");
        self.units.insert(name.clone(), unit);
        self.alias(&name, update.alias.into_iter().chain(update.aliases))?;
        Ok(())
    }

    /// Remove a unit together with its aliases, or a single alias. The root
    /// unit and unknown names are left alone. Units based on a removed unit
    /// stay registered but no longer convert.
    pub fn trash(&mut self, name: &str) {
        if name == ROOT_UNIT {
            return;
        }
        if self.aliases.remove(name).is_some() {
            debug!(alias = name, "trashed alias");
            return;
        }
        if self.units.remove(name).is_some() {
            self.aliases.retain(|_, target| target != name);
            debug!(unit = name, "trashed unit");
        }
    }

    /// Convert `value` from one unit to another.
    pub fn convert(&self, value: f64, from: &str, to: &str) -> Result<f64, TimeError> {
        let numerator = self.scale_to_root(from)?;
        let divisor = self.scale_to_root(to)?;
        Ok(value * numerator / divisor)
    }

    /// Product of the scales along `name`'s base chain, i.e. how many root
    /// units one `name` is.
    pub fn scale_to_root(&self, name: &str) -> Result<f64, TimeError> {
        let mut current = self
            .canonical(name)
            .ok_or_else(|| TimeError::UnknownUnit(name.to_string()))?;
        let mut factor = 1.0;

        // A chain longer than the registry has revisited a unit
        for _ in 0..=self.units.len() {
            let unit = self
                .units
                .get(current)
                .ok_or_else(|| TimeError::UnknownUnit(current.to_string()))?;
            factor *= unit.scale;
            match &unit.base {
                Some(base) => current = base.as_str(),
                None => return Ok(factor),
            }
        }

        Err(TimeError::invalid_unit(name, "base chain forms a cycle"))
    }

    /// Whether `target` appears on the base chain starting at `start`
    /// (including `start` itself).
    fn chain_contains(&self, start: &str, target: &str) -> bool {
        let mut current = start;
        for _ in 0..=self.units.len() {
            if current == target {
                return true;
            }
            match self.units.get(current).and_then(|u| u.base.as_deref()) {
                Some(base) => current = base,
                None => return false,
            }
        }
        true
    }
}

impl Default for UnitRegistry {
    /// The root plus second, minute, hour and day with their common aliases.
    fn default() -> Self {
        let mut registry = UnitRegistry::new();
        for (name, base, scale, aliases) in BUILTIN_UNITS {
            registry.units.insert(
                name.to_string(),
                Unit {
                    base: Some(base.to_string()),
                    scale: *scale,
                },
            );
            for alias in *aliases {
                registry
                    .aliases
                    .insert(alias.to_string(), name.to_string());
            }
        }
        registry
    }
}

fn starts_with_digit(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn check_scale(name: &str, scale: f64) -> Result<(), TimeError> {
    if !scale.is_finite() || scale == 0.0 {
        return Err(TimeError::invalid_unit(
            name,
            format!("scale must be a finite, non-zero number (got {})", scale),
        ));
    }
    Ok(())
}
