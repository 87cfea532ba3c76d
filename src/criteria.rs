use std::collections::HashMap;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// SQL parameter type of a search attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Str,
    /// Bound as text in the shared "%Y-%m-%d %H:%M:%S" storage format
    DateTime,
}

/// Declarative mapping from a logical field name to its physical column.
///
/// The dotted code ("customer.address.city") is the only name callers use;
/// the internal code carries the aliased column the SQL templates expect.
/// Non-public attributes exist for internal bookkeeping columns and are
/// excluded from interfaces exposed to end users.
#[derive(Debug, Clone)]
pub struct SearchAttribute {
    pub code: String,
    pub internal_code: String,
    pub label: String,
    pub param_type: ParamType,
    pub public: bool,
    /// JOIN fragments required whenever this attribute is referenced
    pub internal_deps: Vec<String>,
}

impl SearchAttribute {
    pub fn new(code: &str, internal_code: &str, label: &str, param_type: ParamType) -> Self {
        Self {
            code: code.to_string(),
            internal_code: internal_code.to_string(),
            label: label.to_string(),
            param_type,
            public: true,
            internal_deps: Vec::new(),
        }
    }

    /// Marks the attribute as internal bookkeeping, hidden from public lists
    pub fn internal(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.internal_deps = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

/// A typed value bound to a positional statement placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl SqlValue {
    /// Coerces a JSON value according to the attribute parameter type
    pub fn coerce(value: &Value, param_type: ParamType) -> StoreResult<Self> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        match param_type {
            ParamType::Int => value
                .as_i64()
                .map(SqlValue::Int)
                .ok_or_else(|| StoreError::InvalidData(format!("Expected integer, got {}", value))),
            ParamType::Float => value
                .as_f64()
                .map(SqlValue::Float)
                .ok_or_else(|| StoreError::InvalidData(format!("Expected float, got {}", value))),
            ParamType::Str | ParamType::DateTime => value
                .as_str()
                .map(|s| SqlValue::Text(s.to_string()))
                .ok_or_else(|| StoreError::InvalidData(format!("Expected string, got {}", value))),
        }
    }
}

/// Comparison operators usable in conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

/// Condition tree combined into the ":cond" part of a search template
#[derive(Debug, Clone)]
pub enum Condition {
    Compare {
        op: CompareOp,
        key: String,
        value: Value,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(op: CompareOp, key: &str, value: Value) -> Self {
        Condition::Compare {
            op,
            key: key.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Structured search request translated into templated SQL
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    conditions: Vec<Condition>,
    sortations: Vec<(String, SortDirection)>,
    start: u64,
    size: u64,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            sortations: Vec::new(),
            start: 0,
            size: 100,
        }
    }

    /// Adds a comparison; all top-level conditions are combined with AND
    pub fn compare(mut self, op: CompareOp, key: &str, value: Value) -> Self {
        self.conditions.push(Condition::compare(op, key, value));
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn sort_by(mut self, key: &str, direction: SortDirection) -> Self {
        self.sortations.push((key.to_string(), direction));
        self
    }

    /// Result window: offset and maximum number of records
    pub fn slice(mut self, start: u64, size: u64) -> Self {
        self.start = start;
        self.size = size;
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sortations(&self) -> &[(String, SortDirection)] {
        &self.sortations
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) type AttributeMap<'a> = HashMap<&'a str, &'a SearchAttribute>;

pub(crate) fn attribute_map(attrs: &[SearchAttribute]) -> AttributeMap<'_> {
    attrs.iter().map(|attr| (attr.code.as_str(), attr)).collect()
}

/// Renders the condition list into a SQL fragment plus its ordered binds
pub(crate) fn render_conditions(
    conditions: &[Condition],
    attrs: &AttributeMap<'_>,
) -> StoreResult<(String, Vec<SqlValue>)> {
    if conditions.is_empty() {
        return Ok(("1 = 1".to_string(), Vec::new()));
    }

    let mut params = Vec::new();
    let parts = conditions
        .iter()
        .map(|condition| render_condition(condition, attrs, &mut params))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok((parts.join(" AND "), params))
}

fn render_condition(
    condition: &Condition,
    attrs: &AttributeMap<'_>,
    params: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    match condition {
        Condition::Compare { op, key, value } => {
            let attr = attrs
                .get(key.as_str())
                .ok_or_else(|| StoreError::Config(format!("Unknown search key \"{}\"", key)))?;
            let value = SqlValue::coerce(value, attr.param_type)?;

            if value == SqlValue::Null {
                return match op {
                    CompareOp::Eq => Ok(format!("{} IS NULL", attr.internal_code)),
                    CompareOp::Ne => Ok(format!("{} IS NOT NULL", attr.internal_code)),
                    _ => Err(StoreError::InvalidData(format!(
                        "Null value for \"{}\" supports only equality checks",
                        key
                    ))),
                };
            }

            params.push(value);
            Ok(format!("{} {} ?", attr.internal_code, op.sql()))
        }
        Condition::And(list) => render_combined(list, " AND ", attrs, params),
        Condition::Or(list) => render_combined(list, " OR ", attrs, params),
        Condition::Not(inner) => {
            let inner = render_condition(inner, attrs, params)?;
            Ok(format!("NOT ( {} )", inner))
        }
    }
}

fn render_combined(
    list: &[Condition],
    separator: &str,
    attrs: &AttributeMap<'_>,
    params: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    if list.is_empty() {
        return Ok("1 = 1".to_string());
    }

    let parts = list
        .iter()
        .map(|condition| render_condition(condition, attrs, params))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(format!("( {} )", parts.join(separator)))
}

/// Renders the ":order" part, defaulting to the given key
pub(crate) fn render_sortation(
    criteria: &SearchCriteria,
    attrs: &AttributeMap<'_>,
    default_key: &str,
) -> StoreResult<String> {
    if criteria.sortations().is_empty() {
        let attr = attrs.get(default_key).ok_or_else(|| {
            StoreError::Config(format!("Unknown search key \"{}\"", default_key))
        })?;
        return Ok(attr.internal_code.clone());
    }

    let parts = criteria
        .sortations()
        .iter()
        .map(|(key, direction)| {
            let attr = attrs
                .get(key.as_str())
                .ok_or_else(|| StoreError::Config(format!("Unknown search key \"{}\"", key)))?;
            let direction = match direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            Ok(format!("{} {}", attr.internal_code, direction))
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(parts.join(", "))
}

/// Collects the JOIN fragments of every referenced attribute, deduplicated
/// in first-use order
pub(crate) fn collect_joins(criteria: &SearchCriteria, attrs: &AttributeMap<'_>) -> String {
    let mut keys = Vec::new();
    for condition in criteria.conditions() {
        condition_keys(condition, &mut keys);
    }
    for (key, _) in criteria.sortations() {
        keys.push(key.clone());
    }

    let mut joins: Vec<&str> = Vec::new();
    for key in &keys {
        if let Some(attr) = attrs.get(key.as_str()) {
            for dep in &attr.internal_deps {
                if !joins.contains(&dep.as_str()) {
                    joins.push(dep);
                }
            }
        }
    }

    joins.join("\n")
}

fn condition_keys(condition: &Condition, keys: &mut Vec<String>) {
    match condition {
        Condition::Compare { key, .. } => keys.push(key.clone()),
        Condition::And(list) | Condition::Or(list) => {
            for inner in list {
                condition_keys(inner, keys);
            }
        }
        Condition::Not(inner) => condition_keys(inner, keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs() -> Vec<SearchAttribute> {
        vec![
            SearchAttribute::new("test.id", "t.\"id\"", "ID", ParamType::Int).internal(),
            SearchAttribute::new("test.city", "t.\"city\"", "City", ParamType::Str),
            SearchAttribute::new("test.longitude", "t.\"longitude\"", "Longitude", ParamType::Float),
            SearchAttribute::new("test.ref", "r.\"value\"", "Reference", ParamType::Str)
                .with_deps(&["LEFT JOIN \"refs\" r ON ( r.\"parentid\" = t.\"id\" )"]),
        ]
    }

    #[test]
    fn renders_comparisons_with_positional_binds() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let criteria = SearchCriteria::new()
            .compare(CompareOp::Eq, "test.city", json!("Hamburg"))
            .compare(CompareOp::Gt, "test.id", json!(5));

        let (sql, params) = render_conditions(criteria.conditions(), &map).unwrap();

        assert_eq!(sql, "t.\"city\" = ? AND t.\"id\" > ?");
        assert_eq!(
            params,
            vec![SqlValue::Text("Hamburg".to_string()), SqlValue::Int(5)]
        );
    }

    #[test]
    fn renders_nested_combinations() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let condition = Condition::Or(vec![
            Condition::compare(CompareOp::Like, "test.city", json!("Ham%")),
            Condition::Not(Box::new(Condition::compare(
                CompareOp::Eq,
                "test.id",
                json!(1),
            ))),
        ]);

        let (sql, params) = render_conditions(&[condition], &map).unwrap();

        assert_eq!(sql, "( t.\"city\" LIKE ? OR NOT ( t.\"id\" = ? ) )");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let criteria = SearchCriteria::new().compare(CompareOp::Eq, "test.unknown", json!(1));

        match render_conditions(criteria.conditions(), &map) {
            Err(StoreError::Config(msg)) => assert!(msg.contains("test.unknown")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn null_values_render_as_is_null_checks() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let criteria = SearchCriteria::new().compare(CompareOp::Eq, "test.city", Value::Null);

        let (sql, params) = render_conditions(criteria.conditions(), &map).unwrap();

        assert_eq!(sql, "t.\"city\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn type_mismatch_is_invalid_data() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let criteria = SearchCriteria::new().compare(CompareOp::Eq, "test.id", json!("five"));

        assert!(matches!(
            render_conditions(criteria.conditions(), &map),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn joins_are_collected_once_per_dependency() {
        let attrs = attrs();
        let map = attribute_map(&attrs);
        let criteria = SearchCriteria::new()
            .compare(CompareOp::Eq, "test.ref", json!("a"))
            .compare(CompareOp::Ne, "test.ref", json!("b"))
            .sort_by("test.ref", SortDirection::Asc);

        let joins = collect_joins(&criteria, &map);

        assert_eq!(joins.matches("LEFT JOIN").count(), 1);
    }

    #[test]
    fn sortation_falls_back_to_the_default_key() {
        let attrs = attrs();
        let map = attribute_map(&attrs);

        let order = render_sortation(&SearchCriteria::new(), &map, "test.id").unwrap();
        assert_eq!(order, "t.\"id\"");

        let order = render_sortation(
            &SearchCriteria::new().sort_by("test.city", SortDirection::Desc),
            &map,
            "test.id",
        )
        .unwrap();
        assert_eq!(order, "t.\"city\" DESC");
    }
}
