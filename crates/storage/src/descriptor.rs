use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;
use tracing::warn;

use assetsync_core::FieldValue;

use crate::catalog::Table;
use crate::error::StorageError;

/// Columns actually present in the deployed target tables.
///
/// Built once per run and passed by reference to every writer. Writes are
/// narrowed to the columns listed here so that an older or newer deployment
/// with a few columns more or less still accepts the rest of the row.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    tables: BTreeMap<Table, BTreeSet<String>>,
    missing: Vec<(Table, &'static str)>,
}

impl SchemaDescriptor {
    /// Read the live column catalog for every target table.
    ///
    /// Each expected column that is absent is logged once here; later writes
    /// drop it silently.
    pub fn introspect(conn: &Connection) -> Result<Self, StorageError> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let mut live = BTreeMap::new();
        for table in Table::ALL {
            let columns = stmt
                .query_map([table.name()], |row| row.get::<_, String>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            live.insert(table, columns);
        }
        Ok(Self::from_live_columns(live))
    }

    /// Build a descriptor from already known column names.
    pub fn from_live_columns<I, S>(live: I) -> Self
    where
        I: IntoIterator<Item = (Table, BTreeSet<S>)>,
        S: AsRef<str>,
    {
        let mut tables = BTreeMap::new();
        let mut missing = Vec::new();
        for (table, columns) in live {
            let present: BTreeSet<String> =
                columns.iter().map(|c| c.as_ref().to_ascii_lowercase()).collect();
            if present.is_empty() {
                warn!(table = %table, "target table not found in live schema");
            }
            for spec in table.columns() {
                if !present.contains(&spec.name.to_ascii_lowercase()) {
                    if present.is_empty() {
                        // reported once for the whole table above
                    } else if table.is_key_column(spec.name) {
                        warn!(
                            table = %table,
                            column = spec.name,
                            "key column missing from live schema; writes to this table will fail"
                        );
                    } else {
                        warn!(
                            table = %table,
                            column = spec.name,
                            "column missing from live schema; writes will omit it"
                        );
                    }
                    missing.push((table, spec.name));
                }
            }
            tables.insert(table, present);
        }
        Self { tables, missing }
    }

    /// A descriptor that matches the catalog exactly.
    pub fn full() -> Self {
        Self::from_live_columns(Table::ALL.map(|table| {
            let columns: BTreeSet<&str> = table.columns().iter().map(|c| c.name).collect();
            (table, columns)
        }))
    }

    pub fn has_column(&self, table: Table, column: &str) -> bool {
        self.tables
            .get(&table)
            .is_some_and(|cols| cols.contains(&column.to_ascii_lowercase()))
    }

    /// Expected columns absent from the live schema.
    pub fn missing_columns(&self) -> &[(Table, &'static str)] {
        &self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fail if any column needed to address a row is absent.
    pub fn require(&self, table: Table, key: &[(&'static str, FieldValue)]) -> Result<(), StorageError> {
        match key.iter().find(|(column, _)| !self.has_column(table, column)) {
            Some((column, _)) => Err(StorageError::MissingKeyColumn {
                table,
                column: *column,
            }),
            None => Ok(()),
        }
    }

    /// Drop values for columns the live table does not have.
    pub fn narrow(
        &self,
        table: Table,
        values: Vec<(&'static str, FieldValue)>,
    ) -> Vec<(&'static str, FieldValue)> {
        values
            .into_iter()
            .filter(|(column, _)| self.has_column(table, column))
            .collect()
    }
}
