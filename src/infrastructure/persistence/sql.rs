use crate::domain::ports::data_store::{
    increment_value, DataStore, Filter, Filters, Mutation, OrderBy, Row, StoreError, StoreResult, Table,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{
    any::{AnyConnectOptions, AnyPoolOptions},
    Any, AnyConnection, AnyPool, ConnectOptions, QueryBuilder, Row as _,
};
use std::str::FromStr;
use std::time::Duration;
use log::LevelFilter;
use uuid::Uuid;

/// Data store over SQLite (or any sqlx `Any` backend with JSON1 functions).
///
/// Every resource lives in the `records` table as a JSON body keyed by `(resource, id)`;
/// filters run against `json_extract` of the body.
#[derive(Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        // Ensure drivers are installed for AnyPool
        sqlx::any::install_default_drivers();

        let connect_options = AnyConnectOptions::from_str(database_url)?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_secs(1));

        // An in-memory database exists once per connection, so the pool must keep exactly one alive
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(10).min_connections(1)
        };
        let pool = pool_options.connect_with(connect_options).await?;

        if database_url.starts_with("sqlite") {
            if !in_memory {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
                sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
            }
            sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
        }

        tracing::info!("Connected to data store (in_memory={})", in_memory);
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_string();
            if msg.contains("UNIQUE constraint") {
                StoreError::Constraint(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        other => StoreError::Backend(other.to_string()),
    }
}

/// JSON path for a field. Field names come from code, but are still restricted to identifiers.
fn json_path(field: &str) -> StoreResult<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::Malformed(format!("invalid field name: {:?}", field)));
    }
    Ok(format!("$.{}", field))
}

fn push_value(builder: &mut QueryBuilder<'_, Any>, value: &Value) -> StoreResult<()> {
    match value {
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        Value::Bool(b) => {
            builder.push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                builder.push_bind(i);
            }
            None => {
                builder.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        other => {
            return Err(StoreError::Malformed(format!("cannot filter on {}", other)));
        }
    }
    Ok(())
}

fn push_filter(builder: &mut QueryBuilder<'_, Any>, filter: &Filter) -> StoreResult<()> {
    if let Filter::In { values, .. } = filter {
        if values.is_empty() {
            builder.push(" AND 0 = 1");
            return Ok(());
        }
    }

    builder.push(" AND json_extract(body, ");
    builder.push_bind(json_path(filter.field())?);
    builder.push(")");

    match filter {
        Filter::Eq { value: Value::Null, .. } => {
            builder.push(" IS NULL");
        }
        Filter::Eq { value, .. } => {
            builder.push(" = ");
            push_value(builder, value)?;
        }
        Filter::In { values, .. } => {
            builder.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value)?;
            }
            builder.push(")");
        }
        Filter::Gte { value, .. } => {
            builder.push(" >= ");
            push_value(builder, value)?;
        }
        Filter::Lte { value, .. } => {
            builder.push(" <= ");
            push_value(builder, value)?;
        }
    }
    Ok(())
}

fn parse_body(body: &str) -> StoreResult<Row> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err(StoreError::Malformed("record body is not an object".to_string())),
        Err(e) => Err(StoreError::Malformed(e.to_string())),
    }
}

async fn fetch_body(conn: &mut AnyConnection, table: Table, id: &str) -> StoreResult<Option<Row>> {
    let row = sqlx::query("SELECT body FROM records WHERE resource = ? AND id = ?")
        .bind(table.as_str())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    match row {
        Some(row) => {
            let body: String = row.try_get("body").map_err(map_sqlx)?;
            parse_body(&body).map(Some)
        }
        None => Ok(None),
    }
}

async fn insert_row(conn: &mut AnyConnection, table: Table, mut row: Row) -> StoreResult<Row> {
    let id = match row.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            row.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    };
    let body = Value::Object(row.clone()).to_string();

    sqlx::query("INSERT INTO records (resource, id, body) VALUES (?, ?, ?)")
        .bind(table.as_str())
        .bind(&id)
        .bind(body)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    Ok(row)
}

async fn update_row(conn: &mut AnyConnection, table: Table, id: &str, patch: Row) -> StoreResult<Row> {
    let mut current = fetch_body(conn, table, id)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })?;

    for (field, value) in patch {
        if field != "id" {
            current.insert(field, value);
        }
    }
    let body = Value::Object(current.clone()).to_string();

    sqlx::query("UPDATE records SET body = ? WHERE resource = ? AND id = ?")
        .bind(body)
        .bind(table.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    Ok(current)
}

/// Read and write happen inside the caller's transaction, which SQLite serializes against other writers.
async fn increment_row(
    conn: &mut AnyConnection,
    table: Table,
    id: &str,
    field: &str,
    by: Decimal,
) -> StoreResult<Row> {
    json_path(field)?;
    let current = fetch_body(conn, table, id)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })?;

    let mut delta = Row::new();
    delta.insert(field.to_string(), increment_value(current.get(field), by)?);
    update_row(conn, table, id, delta).await
}

#[async_trait]
impl DataStore for SqlStore {
    async fn query(&self, table: Table, filters: &Filters, order: Option<&OrderBy>) -> StoreResult<Vec<Row>> {
        let mut builder = QueryBuilder::<Any>::new("SELECT body FROM records WHERE resource = ");
        builder.push_bind(table.as_str().to_string());
        for filter in filters.iter() {
            push_filter(&mut builder, filter)?;
        }

        builder.push(" ORDER BY ");
        if let Some(order) = order {
            builder.push("json_extract(body, ");
            builder.push_bind(json_path(&order.field)?);
            builder.push(if order.ascending { ") ASC, " } else { ") DESC, " });
        }
        builder.push("rowid ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter()
            .map(|row| {
                let body: String = row.try_get("body").map_err(map_sqlx)?;
                parse_body(&body)
            })
            .collect()
    }

    async fn insert(&self, table: Table, row: Row) -> StoreResult<Row> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
        insert_row(&mut conn, table, row).await
    }

    async fn update(&self, table: Table, id: &str, patch: Row) -> StoreResult<Row> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let row = update_row(&mut tx, table, id, patch).await?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(row)
    }

    async fn apply(&self, batch: Vec<Mutation>) -> StoreResult<Vec<Row>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let mut written = Vec::with_capacity(batch.len());
        for mutation in batch {
            // Dropping the transaction on error rolls it back
            let row = match mutation {
                Mutation::Insert { table, row } => insert_row(&mut tx, table, row).await?,
                Mutation::Update { table, id, patch } => update_row(&mut tx, table, &id, patch).await?,
                Mutation::Increment { table, id, field, by } => {
                    increment_row(&mut tx, table, &id, &field, by).await?
                }
            };
            written.push(row);
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(written)
    }
}
