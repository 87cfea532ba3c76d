use std::path::Path;

use once_cell::sync::Lazy;
use toml::value::Table;
use toml::Value;

use crate::error::{StoreError, StoreResult};

static DEFAULTS: Lazy<Value> = Lazy::new(|| {
    include_str!("default.toml")
        .parse()
        .expect("embedded default configuration is valid TOML")
});

/// Configuration store navigated by "/"-separated paths.
///
/// Ships with embedded defaults holding all SQL templates, sub-manager lists
/// and resource URLs; values loaded from files are deep-merged over them.
#[derive(Debug, Clone)]
pub struct Config {
    root: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: DEFAULTS.clone(),
        }
    }
}

impl Config {
    /// Loads a TOML file and merges it over the embedded defaults
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Cannot read \"{}\": {}", path.display(), e)))?;
        let value: Value = text
            .parse()
            .map_err(|e| StoreError::Config(format!("Cannot parse \"{}\": {}", path.display(), e)))?;

        let mut config = Self::default();
        config.merge(value);
        Ok(config)
    }

    /// Deep-merges the given values over the current ones
    pub fn merge(&mut self, other: Value) {
        merge_value(&mut self.root, other);
    }

    /// Sets a single value, creating intermediate tables as needed
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(root) = self.root.as_table_mut() {
            set_inner(root, &segments, value);
        }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        self.lookup(path)?.as_str()
    }

    pub fn string_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.string(path).unwrap_or(default)
    }

    /// String list at the given path, empty when absent
    pub fn list(&self, path: &str) -> Vec<String> {
        match self.lookup(path).and_then(Value::as_array) {
            Some(values) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// SQL template at the given path; missing templates are setup faults
    pub fn sql(&self, path: &str) -> StoreResult<&str> {
        self.string(path)
            .ok_or_else(|| StoreError::Config(format!("No SQL statement configured for \"{}\"", path)))
    }

    /// Configured database resources as (name, url) pairs
    pub fn resources(&self) -> Vec<(String, String)> {
        match self.lookup("resources").and_then(Value::as_table) {
            Some(table) => table
                .iter()
                .filter_map(|(name, value)| {
                    value.as_str().map(|url| (name.clone(), url.to_string()))
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

fn merge_value(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Table(base), Value::Table(other)) => {
            for (key, value) in other {
                match base.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}

fn set_inner(table: &mut Table, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            table.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = table
                .entry((*head).to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Some(child) = entry.as_table_mut() {
                set_inner(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_contains_sql_templates() {
        let config = Config::default();

        for operation in ["insert", "update", "delete", "search", "count", "newid"] {
            let address = format!("customer/manager/address/standard/{}", operation);
            let property = format!("customer/manager/property/type/standard/{}", operation);

            assert!(config.sql(&address).is_ok(), "missing {}", address);
            assert!(config.sql(&property).is_ok(), "missing {}", property);
        }
    }

    #[test]
    fn missing_sql_template_is_a_config_error() {
        let config = Config::default();

        match config.sql("customer/manager/address/standard/nope") {
            Err(StoreError::Config(msg)) => assert!(msg.contains("nope")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn merge_overrides_nested_values_and_keeps_others() {
        let mut config = Config::default();
        let overlay: Value = r#"
            [customer.manager.address.standard]
            newid = 'SELECT 42 AS "id"'
        "#
        .parse()
        .unwrap();

        config.merge(overlay);

        assert_eq!(
            config.string("customer/manager/address/standard/newid"),
            Some(r#"SELECT 42 AS "id""#)
        );
        assert!(config.sql("customer/manager/address/standard/insert").is_ok());
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut config = Config::default();
        config.set(
            "customer/manager/property/type/submanagers",
            Value::Array(vec![Value::String("custom".into())]),
        );

        assert_eq!(
            config.list("customer/manager/property/type/submanagers"),
            vec!["custom".to_string()]
        );
    }

    #[test]
    fn resources_lists_configured_urls() {
        let config = Config::default();
        let resources = config.resources();

        assert!(resources.iter().any(|(name, _)| name == "db"));
    }
}
