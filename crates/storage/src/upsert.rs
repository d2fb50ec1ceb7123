//! Existence-check-then-write for one row.
//!
//! Statement text is assembled from catalog column names only; every value is
//! bound as a parameter after passing through the column's declared type.

use rusqlite::{Connection, OptionalExtension, params_from_iter, types::Value};

use assetsync_core::{BoundValue, ColumnType, CoreError, FieldValue};

use crate::catalog::Table;
use crate::descriptor::SchemaDescriptor;
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    Insert,
    Update,
}

/// One row addressed by its natural key.
#[derive(Debug, Clone)]
pub struct RowWrite {
    pub table: Table,
    pub key: Vec<(&'static str, FieldValue)>,
    pub values: Vec<(&'static str, FieldValue)>,
}

impl RowWrite {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            key: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn key(mut self, column: &'static str, value: FieldValue) -> Self {
        self.key.push((column, value));
        self
    }

    pub fn value(mut self, column: &'static str, value: FieldValue) -> Self {
        self.values.push((column, value));
        self
    }
}

fn placeholders(start: usize, count: usize) -> impl Iterator<Item = String> {
    (start..start + count).map(|i| format!("?{i}"))
}

fn conditions(key_columns: &[&str], first_param: usize) -> String {
    key_columns
        .iter()
        .zip(placeholders(first_param, key_columns.len()))
        .map(|(column, p)| format!("{column} = {p}"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn exists_sql(table: Table, key_columns: &[&str]) -> String {
    format!(
        "SELECT 1 FROM {} WHERE {} LIMIT 1",
        table.name(),
        conditions(key_columns, 1)
    )
}

impl UpsertMode {
    /// Statement template for this mode. Parameters are numbered with the
    /// key columns first for inserts and last for updates.
    pub fn statement(self, table: Table, key_columns: &[&str], value_columns: &[&str]) -> String {
        match self {
            Self::Insert => {
                let columns: Vec<&str> = key_columns.iter().chain(value_columns).copied().collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table.name(),
                    columns.join(", "),
                    placeholders(1, columns.len()).collect::<Vec<_>>().join(", ")
                )
            }
            Self::Update => {
                let assignments = value_columns
                    .iter()
                    .zip(placeholders(1, value_columns.len()))
                    .map(|(column, p)| format!("{column} = {p}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "UPDATE {} SET {} WHERE {}",
                    table.name(),
                    assignments,
                    conditions(key_columns, value_columns.len() + 1)
                )
            }
        }
    }
}

fn to_sql_value(value: BoundValue) -> Value {
    match value {
        BoundValue::Null => Value::Null,
        BoundValue::Integer(n) => Value::Integer(n),
        BoundValue::Real(f) => Value::Real(f),
        BoundValue::Text(s) => Value::Text(s),
    }
}

/// Bind values against the catalog types of `table`.
pub fn bind_columns(
    table: Table,
    columns: &[(&'static str, FieldValue)],
) -> Result<Vec<Value>, StorageError> {
    bind_with(table, columns, FieldValue::bind)
}

/// Like [`bind_columns`], but over-long text fails instead of being cut.
pub fn bind_key_columns(
    table: Table,
    columns: &[(&'static str, FieldValue)],
) -> Result<Vec<Value>, StorageError> {
    bind_with(table, columns, FieldValue::bind_key)
}

fn bind_with(
    table: Table,
    columns: &[(&'static str, FieldValue)],
    bind: impl Fn(&FieldValue, &str, ColumnType) -> Result<BoundValue, CoreError>,
) -> Result<Vec<Value>, StorageError> {
    columns
        .iter()
        .map(|(column, value)| {
            let ty = table
                .column_type(column)
                .ok_or(StorageError::UnknownColumn {
                    table,
                    column: *column,
                })?;
            Ok(to_sql_value(bind(value, column, ty)?))
        })
        .collect()
}

/// Insert the row if its key is absent, otherwise update it in place.
pub fn upsert(
    conn: &Connection,
    schema: &SchemaDescriptor,
    write: RowWrite,
) -> Result<UpsertMode, StorageError> {
    let RowWrite { table, key, values } = write;
    schema.require(table, &key)?;
    let values = schema.narrow(table, values);

    let key_columns: Vec<&str> = key.iter().map(|(c, _)| *c).collect();
    let value_columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let key_params = bind_key_columns(table, &key)?;
    let value_params = bind_columns(table, &values)?;

    let exists = conn
        .query_row(
            &exists_sql(table, &key_columns),
            params_from_iter(key_params.iter()),
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    let mode = if exists { UpsertMode::Update } else { UpsertMode::Insert };
    let sql = mode.statement(table, &key_columns, &value_columns);
    match mode {
        UpsertMode::Insert => {
            conn.execute(&sql, params_from_iter(key_params.iter().chain(&value_params)))?;
        }
        // Nothing but the key survived narrowing: the row already says all it can.
        UpsertMode::Update if value_columns.is_empty() => {}
        UpsertMode::Update => {
            conn.execute(&sql, params_from_iter(value_params.iter().chain(&key_params)))?;
        }
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_schema;
    use chrono::{NaiveDate, NaiveDateTime};

    fn scan_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn system(host: &str) -> RowWrite {
        RowWrite::new(Table::Systems)
            .key("AssetNumber", FieldValue::Text("07001010001".into()))
            .value("HostName", FieldValue::Text(host.into()))
            .value("ScanDate", FieldValue::Timestamp(scan_date()))
    }

    #[test]
    fn templates_number_parameters_consistently() {
        assert_eq!(
            UpsertMode::Insert.statement(Table::Disks, &["HardwareID", "DeviceID"], &["SizeGB"]),
            "INSERT INTO Disks (HardwareID, DeviceID, SizeGB) VALUES (?1, ?2, ?3)"
        );
        assert_eq!(
            UpsertMode::Update.statement(Table::Disks, &["HardwareID", "DeviceID"], &["SizeGB", "FreeGB"]),
            "UPDATE Disks SET SizeGB = ?1, FreeGB = ?2 WHERE HardwareID = ?3 AND DeviceID = ?4"
        );
        assert_eq!(
            exists_sql(Table::Systems, &["AssetNumber"]),
            "SELECT 1 FROM Systems WHERE AssetNumber = ?1 LIMIT 1"
        );
    }

    #[test]
    fn insert_then_update() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let schema = SchemaDescriptor::introspect(&conn).unwrap();

        assert_eq!(upsert(&conn, &schema, system("PT-A1")).unwrap(), UpsertMode::Insert);
        assert_eq!(upsert(&conn, &schema, system("PT-A1-RENAMED")).unwrap(), UpsertMode::Update);

        let (count, host): (i64, String) = conn
            .query_row("SELECT COUNT(*), MAX(HostName) FROM Systems", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(host, "PT-A1-RENAMED");
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let schema = SchemaDescriptor::full();
        let write = system("PT-A1").value("Nope", FieldValue::Integer(1));
        // Narrowing removes it before binding, so only a key column can trip this.
        assert!(upsert(&conn, &schema, write).is_ok());

        let bad_key = RowWrite::new(Table::Systems).key("Nope", FieldValue::Integer(1));
        assert!(matches!(
            upsert(&conn, &schema, bad_key),
            Err(StorageError::MissingKeyColumn { .. })
        ));
        assert!(matches!(
            bind_columns(Table::Systems, &[("Nope", FieldValue::Integer(1))]),
            Err(StorageError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn over_long_keys_fail_instead_of_merging() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let schema = SchemaDescriptor::full();
        let stem = "A".repeat(50);
        let write = RowWrite::new(Table::Systems)
            .key("AssetNumber", FieldValue::Text(format!("{stem}-ONE")))
            .value("HostName", FieldValue::Text("HOST-ONE".into()))
            .value("ScanDate", FieldValue::Timestamp(scan_date()));
        assert!(matches!(
            upsert(&conn, &schema, write),
            Err(StorageError::Core(assetsync_core::CoreError::KeyTooLong { max_len: 50, len: 54, .. }))
        ));

        // Values are still cut to fit.
        let long_host = system(&"H".repeat(150));
        assert_eq!(upsert(&conn, &schema, long_host).unwrap(), UpsertMode::Insert);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM Systems WHERE length(HostName) = 100", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn bind_errors_surface() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let schema = SchemaDescriptor::full();
        let write = RowWrite::new(Table::Hardware)
            .key("AssetNumber", FieldValue::Text("A-1".into()))
            .value("TotalRAMGB", FieldValue::Decimal(123_456.0));
        assert!(matches!(
            upsert(&conn, &schema, write),
            Err(StorageError::Core(assetsync_core::CoreError::DecimalOverflow { .. }))
        ));
    }
}
