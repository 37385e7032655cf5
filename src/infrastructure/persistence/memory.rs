use crate::domain::ports::data_store::{
    compare_values, increment_value, DataStore, Filters, Mutation, OrderBy, Row, StoreError, StoreResult, Table,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Unique constraint over `fields`, restricted to rows matching `when` (a partial index).
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    pub name: String,
    pub table: Table,
    pub fields: Vec<String>,
    pub when: Filters,
}

impl UniqueIndex {
    pub fn new(name: impl Into<String>, table: Table, fields: &[&str], when: Filters) -> Self {
        Self {
            name: name.into(),
            table,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            when,
        }
    }

    fn key(&self, row: &Row) -> Vec<Value> {
        self.fields
            .iter()
            .map(|f| row.get(f).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn covers(&self, row: &Row) -> bool {
        self.when.matches(row)
    }
}

type Tables = HashMap<Table, Vec<Row>>;

/// In-process data store. Each call takes the lock once, so a batch is applied atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    indexes: Vec<UniqueIndex>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unique_index(mut self, index: UniqueIndex) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
            .map_or(0, Vec::len)
    }

    fn check_indexes(&self, tables: &Tables, table: Table, candidate: &Row) -> StoreResult<()> {
        let candidate_id = candidate.get("id");
        let rows = match tables.get(&table) {
            Some(rows) => rows,
            None => return Ok(()),
        };

        for index in self.indexes.iter().filter(|i| i.table == table) {
            if !index.covers(candidate) {
                continue;
            }
            let key = index.key(candidate);
            let clash = rows
                .iter()
                .filter(|r| r.get("id") != candidate_id)
                .any(|r| index.covers(r) && index.key(r) == key);
            if clash {
                return Err(StoreError::Constraint(format!(
                    "duplicate key value violates unique index {}",
                    index.name
                )));
            }
        }
        Ok(())
    }

    fn insert_into(&self, tables: &mut Tables, table: Table, mut row: Row) -> StoreResult<Row> {
        let id = match row.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                row.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let exists = tables
            .get(&table)
            .is_some_and(|rows| rows.iter().any(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str())));
        if exists {
            return Err(StoreError::Constraint(format!("duplicate primary key {}/{}", table, id)));
        }

        self.check_indexes(tables, table, &row)?;
        tables.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    fn update_in(&self, tables: &mut Tables, table: Table, id: &str, patch: Row) -> StoreResult<Row> {
        let not_found = || StoreError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        };

        let position = tables
            .get(&table)
            .and_then(|rows| rows.iter().position(|r| r.get("id").and_then(Value::as_str) == Some(id)))
            .ok_or_else(not_found)?;

        let mut updated = tables
            .get(&table)
            .and_then(|rows| rows.get(position))
            .cloned()
            .ok_or_else(not_found)?;
        for (field, value) in patch {
            if field != "id" {
                updated.insert(field, value);
            }
        }

        self.check_indexes(tables, table, &updated)?;

        let slot = tables
            .get_mut(&table)
            .and_then(|rows| rows.get_mut(position))
            .ok_or_else(not_found)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn increment_in(
        &self,
        tables: &mut Tables,
        table: Table,
        id: &str,
        field: &str,
        by: Decimal,
    ) -> StoreResult<Row> {
        let current = tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|r| r.get("id").and_then(Value::as_str) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;

        let mut delta = Row::new();
        delta.insert(field.to_string(), increment_value(current.get(field), by)?);
        self.update_in(tables, table, id, delta)
    }
}

fn sort_rows(rows: &mut [Row], order: &OrderBy) {
    rows.sort_by(|a, b| {
        let left = a.get(&order.field).unwrap_or(&Value::Null);
        let right = b.get(&order.field).unwrap_or(&Value::Null);
        let ordering = match (left, right) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => compare_values(left, right).unwrap_or(Ordering::Equal),
        };
        if order.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn query(&self, table: Table, filters: &Filters, order: Option<&OrderBy>) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filters.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            sort_rows(&mut rows, order);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> StoreResult<Row> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        self.insert_into(&mut tables, table, row)
    }

    async fn update(&self, table: Table, id: &str, patch: Row) -> StoreResult<Row> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        self.update_in(&mut tables, table, id, patch)
    }

    async fn apply(&self, batch: Vec<Mutation>) -> StoreResult<Vec<Row>> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        // Work on a copy so a failing mutation leaves the store untouched
        let mut staged = tables.clone();
        let mut written = Vec::with_capacity(batch.len());
        for mutation in batch {
            let row = match mutation {
                Mutation::Insert { table, row } => self.insert_into(&mut staged, table, row)?,
                Mutation::Update { table, id, patch } => self.update_in(&mut staged, table, &id, patch)?,
                Mutation::Increment { table, id, field, by } => {
                    self.increment_in(&mut staged, table, &id, &field, by)?
                }
            };
            written.push(row);
        }

        *tables = staged;
        Ok(written)
    }
}
