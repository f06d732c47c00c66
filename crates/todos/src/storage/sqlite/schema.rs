//! SQL statements for the document emulation.
//!
//! Table and index names cannot be bound as parameters, so the statements
//! are built here from names that already passed `validate_name`.

pub const PRAGMAS: &str = r#"
PRAGMA synchronous = NORMAL;
"#;

pub const TABLE_EXISTS: &str = r#"
SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)
"#;

pub const INDEX_EXISTS: &str = r#"
SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1)
"#;

/// Name of the SQLite index backing secondary index `index` on `table`.
///
/// SQLite index names share one namespace per database, so they carry the
/// table name.
pub fn index_name(table: &str, index: &str) -> String {
    format!("{table}__{index}")
}

pub fn create_table(table: &str) -> String {
    format!(
        r#"CREATE TABLE "{table}" (
    id TEXT PRIMARY KEY NOT NULL,
    doc TEXT NOT NULL CHECK (json_valid(doc))
)"#
    )
}

pub fn create_index(table: &str, index: &str) -> String {
    let name = index_name(table, index);
    format!(r#"CREATE INDEX "{name}" ON "{table}" (json_extract(doc, '$.{index}'))"#)
}

pub fn select_ordered(table: &str, index: &str) -> String {
    format!(r#"SELECT doc FROM "{table}" ORDER BY json_extract(doc, '$.{index}') ASC, id ASC"#)
}

pub fn select_doc(table: &str) -> String {
    format!(r#"SELECT doc FROM "{table}" WHERE id = ?1"#)
}

pub fn insert(table: &str) -> String {
    format!(r#"INSERT INTO "{table}" (id, doc) VALUES (?1, ?2)"#)
}

pub fn replace_doc(table: &str) -> String {
    format!(r#"UPDATE "{table}" SET doc = ?2 WHERE id = ?1"#)
}

pub fn delete(table: &str) -> String {
    format!(r#"DELETE FROM "{table}" WHERE id = ?1"#)
}
