//! Core types for the variable system.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Predefined constants every resolution run starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    Pi,
    En,
}

impl Constant {
    pub const ALL: [Constant; 2] = [Constant::Pi, Constant::En];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pi => "PI",
            Self::En => "EN",
        }
    }

    // Truncated values, not the std consts.
    #[allow(clippy::approx_constant)]
    pub fn value(&self) -> f64 {
        match self {
            Self::Pi => 3.14159,
            Self::En => 2.71828,
        }
    }

    /// Look up a constant by (case-insensitive) name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A variable with its resolved value, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVariable {
    pub name: String,
    pub value: f64,
}

impl std::fmt::Display for ResolvedVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {:.6}", self.name, self.value)
    }
}

/// Resolved values plus the set of names known to be defined.
///
/// Names are stored uppercased. The value table and the defined set are
/// only ever written together through [`VariableStore::define`], so their
/// key sets stay identical.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableStore {
    /// Values indexed by uppercase name
    values: BTreeMap<String, f64>,
    /// Readiness index used by the resolver
    #[serde(skip)]
    defined: HashSet<String>,
}

impl VariableStore {
    /// Create an empty variable store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `PI` and `EN`
    pub fn with_constants() -> Self {
        let mut store = Self::new();
        for constant in Constant::ALL {
            store.define(constant.name(), constant.value());
        }
        store
    }

    /// Record a resolved value. Returns the previous value if the name was
    /// already defined.
    pub fn define(&mut self, name: &str, value: f64) -> Option<f64> {
        let key = name.to_ascii_uppercase();
        self.defined.insert(key.clone());
        self.values.insert(key, value)
    }

    /// Get a value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(&name.to_ascii_uppercase())
    }

    pub fn is_constant(&self, name: &str) -> bool {
        Constant::from_name(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All entries in name order, constants included
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Non-constant entries sorted by name
    pub fn resolved(&self) -> Vec<ResolvedVariable> {
        self.iter()
            .filter(|(name, _)| !self.is_constant(name))
            .map(|(name, value)| ResolvedVariable {
                name: name.to_string(),
                value,
            })
            .collect()
    }

    /// Rebuild the defined index (call after deserialization)
    pub fn rebuild_index(&mut self) {
        self.defined = self.values.keys().cloned().collect();
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (name, value) in iter {
            store.define(name.as_ref(), value);
        }
        store
    }
}
