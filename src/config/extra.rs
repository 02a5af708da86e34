use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Open map of named settings that have no dedicated field. They are
/// recorded with the run but only a few (such as `anneal_lr`) are read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraSettings(BTreeMap<String, Value>);

impl ExtraSettings {
    pub fn new() -> Self {
        ExtraSettings::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A missing or non-boolean entry reads as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// `name: value` lines in name order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().map(|(name, value)| match value {
            Value::String(s) => format!("{name}: {s}"),
            other => format!("{name}: {other}"),
        })
    }
}
