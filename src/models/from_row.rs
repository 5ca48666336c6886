use rusqlite::Row;

/// Map a full `SELECT *`-style row into a model.
pub trait FromSqliteRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}
