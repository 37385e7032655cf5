use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A record as exchanged with the hosted data store: a flat JSON object.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Record not found: {table}/{id}")]
    NotFound { table: String, id: String },
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Store unavailable: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Salons,
    Services,
    Bookings,
    Reviews,
    Staff,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Users,
        Table::Salons,
        Table::Services,
        Table::Bookings,
        Table::Reviews,
        Table::Staff,
    ];

    /// Table names double as the permission resource tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Salons => "salons",
            Table::Services => "services",
            Table::Bookings => "bookings",
            Table::Reviews => "reviews",
            Table::Staff => "staff",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Gte { field: String, value: Value },
    Lte { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn in_values<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. }
            | Filter::In { field, .. }
            | Filter::Gte { field, .. }
            | Filter::Lte { field, .. } => field,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq { value, .. } => actual == value,
            Filter::In { values, .. } => values.iter().any(|v| v == actual),
            Filter::Gte { value, .. } => matches!(
                compare_values(actual, value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lte { value, .. } => matches!(
                compare_values(actual, value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Conjunction of filters. An empty set matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Vec<Filter>);

impl Filters {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.0.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.0.iter().all(|f| f.matches(row))
    }
}

impl From<Vec<Filter>> for Filters {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl IntoIterator for Filters {
    type Item = Filter;
    type IntoIter = std::vec::IntoIter<Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// One write of an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert { table: Table, row: Row },
    Update { table: Table, id: String, patch: Row },
    /// Adds `by` to a numeric field against the row as it is when the batch applies.
    Increment { table: Table, id: String, field: String, by: Decimal },
}

impl Mutation {
    pub fn increment(table: Table, id: impl Into<String>, field: impl Into<String>, by: impl Into<Decimal>) -> Self {
        Mutation::Increment {
            table,
            id: id.into(),
            field: field.into(),
            by: by.into(),
        }
    }
}

/// Query interface of the hosted backend.
///
/// Every call is one request/response round trip. Errors are returned as-is; retry policy belongs to the caller.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn query(&self, table: Table, filters: &Filters, order: Option<&OrderBy>) -> StoreResult<Vec<Row>>;

    /// Inserts a row; the store assigns `id` when the row has none.
    async fn insert(&self, table: Table, row: Row) -> StoreResult<Row>;

    /// Merges `patch` into the row with the given id and returns the updated row.
    async fn update(&self, table: Table, id: &str, patch: Row) -> StoreResult<Row>;

    /// Applies every mutation or none of them. Returns the written rows in batch order.
    async fn apply(&self, batch: Vec<Mutation>) -> StoreResult<Vec<Row>>;
}

/// Orders two JSON scalars: numbers numerically, strings lexically (ISO dates sort correctly).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// New value of a counter field after adding `by`.
///
/// Decimal strings (how money serializes) stay strings; JSON numbers and missing fields
/// come back as numbers, integral when the sum is.
pub fn increment_value(current: Option<&Value>, by: Decimal) -> StoreResult<Value> {
    let malformed = |v: &Value| StoreError::Malformed(format!("cannot increment {}", v));

    match current {
        None | Some(Value::Null) => Ok(number_value(by)),
        Some(Value::Number(n)) => {
            let base = match n.as_i64() {
                Some(i) => Decimal::from(i),
                None => n
                    .as_f64()
                    .and_then(|f| Decimal::try_from(f).ok())
                    .ok_or_else(|| malformed(&Value::Number(n.clone())))?,
            };
            Ok(number_value(base + by))
        }
        Some(Value::String(s)) => {
            let base: Decimal = s.parse().map_err(|_| malformed(&Value::String(s.clone())))?;
            Ok(Value::String((base + by).normalize().to_string()))
        }
        Some(other) => Err(malformed(other)),
    }
}

fn number_value(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    value.to_f64().map(Value::from).unwrap_or(Value::Null)
}

pub fn to_row<T: Serialize>(value: &T) -> StoreResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Malformed(format!("expected an object, got {}", other))),
        Err(e) => Err(StoreError::Malformed(e.to_string())),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Malformed(e.to_string()))
}

/// Builds a patch from a `json!` object literal.
pub fn patch(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    filters: &Filters,
    order: Option<&OrderBy>,
) -> StoreResult<Vec<T>> {
    store
        .query(table, filters, order)
        .await?
        .into_iter()
        .map(from_row)
        .collect()
}

pub async fn fetch_by_id<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    id: &str,
) -> StoreResult<Option<T>> {
    let filters = Filters::new().with(Filter::eq("id", id));
    match store.query(table, &filters, None).await?.into_iter().next() {
        Some(row) => from_row(row).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        patch(value)
    }

    #[test]
    fn test_eq_and_in_filters() {
        let r = row(json!({"salon_id": "s1", "status": "confirmed"}));
        assert!(Filter::eq("salon_id", "s1").matches(&r));
        assert!(!Filter::eq("salon_id", "s2").matches(&r));
        assert!(Filter::in_values("status", ["pending_confirmation", "confirmed"]).matches(&r));
        assert!(!Filter::in_values("status", Vec::<String>::new()).matches(&r));
    }

    #[test]
    fn test_missing_field_only_matches_null() {
        let r = row(json!({"id": "b1"}));
        assert!(Filter::eq("customer_id", Value::Null).matches(&r));
        assert!(!Filter::eq("customer_id", "u1").matches(&r));
    }

    #[test]
    fn test_range_filters_on_iso_dates() {
        let r = row(json!({"booking_date": "2024-06-20"}));
        assert!(Filter::gte("booking_date", "2024-06-20").matches(&r));
        assert!(Filter::lte("booking_date", "2024-06-30").matches(&r));
        assert!(!Filter::gte("booking_date", "2024-06-21").matches(&r));
        // Mismatched types never compare
        assert!(!Filter::gte("booking_date", 5).matches(&r));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let r = row(json!({"salon_id": "s1", "customer_id": "u1"}));
        let both = Filters::new()
            .with(Filter::eq("salon_id", "s1"))
            .with(Filter::eq("customer_id", "u1"));
        assert!(both.matches(&r));
        let clash = both.with(Filter::eq("customer_id", "u2"));
        assert!(!clash.matches(&r));
        assert!(Filters::new().matches(&r));
    }

    #[test]
    fn test_table_names_match_permission_resources() {
        use crate::domain::entities::resources::{BOOKINGS, REVIEWS, SALONS, SERVICES, STAFF, USERS};
        assert_eq!(Table::ALL.map(|t| t.as_str()), [USERS, SALONS, SERVICES, BOOKINGS, REVIEWS, STAFF]);
    }

    #[test]
    fn test_increment_value_keeps_representation() {
        assert_eq!(increment_value(Some(&json!(3)), Decimal::ONE).unwrap(), json!(4));
        assert_eq!(increment_value(Some(&json!(0)), Decimal::NEGATIVE_ONE).unwrap(), json!(-1));
        assert_eq!(increment_value(None, Decimal::from(5)).unwrap(), json!(5));
        assert_eq!(
            increment_value(Some(&json!("40")), Decimal::new(2550, 2)).unwrap(),
            json!("65.5")
        );
        assert_eq!(increment_value(Some(&json!("0")), Decimal::from(40)).unwrap(), json!("40"));
        assert!(matches!(
            increment_value(Some(&json!("forty")), Decimal::ONE),
            Err(StoreError::Malformed(_))
        ));
        assert!(increment_value(Some(&json!(true)), Decimal::ONE).is_err());
    }
}
