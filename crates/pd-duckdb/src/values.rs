//! Conversions between cells and DuckDB values

use duckdb::types::{Value, ValueRef};
use pd_core::{Blob, Cell, Row};

/// DuckDB value bound for `cell`. Typed NULLs bind as plain NULL.
pub fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null | Cell::TypedNull(_) => Value::Null,
        Cell::String(s) => Value::Text(s.clone()),
        Cell::Int64(v) => Value::BigInt(*v),
        Cell::Uint64(v) => Value::UBigInt(*v),
        Cell::Double(v) => Value::Double(*v),
        Cell::Float(v) => Value::Float(*v),
        Cell::Boolean(v) => Value::Boolean(*v),
        Cell::Blob(blob) => Value::Blob(blob.as_bytes().to_vec()),
        Cell::BlobInput(input) => Value::Blob(input.as_bytes().to_vec()),
    }
}

/// Read column `idx` of `row` as a cell.
///
/// Types without a cell counterpart (dates, decimals, nested values) are
/// rendered as text.
pub fn cell_at(row: &duckdb::Row<'_>, idx: usize) -> duckdb::Result<Cell> {
    let cell = match row.get_ref(idx)? {
        ValueRef::Null => Cell::Null,
        ValueRef::Boolean(v) => Cell::Boolean(v),
        ValueRef::TinyInt(v) => Cell::Int64(v.into()),
        ValueRef::SmallInt(v) => Cell::Int64(v.into()),
        ValueRef::Int(v) => Cell::Int64(v.into()),
        ValueRef::BigInt(v) => Cell::Int64(v),
        ValueRef::HugeInt(v) => match i64::try_from(v) {
            Ok(v) => Cell::Int64(v),
            Err(_) => Cell::String(v.to_string()),
        },
        ValueRef::UTinyInt(v) => Cell::Uint64(v.into()),
        ValueRef::USmallInt(v) => Cell::Uint64(v.into()),
        ValueRef::UInt(v) => Cell::Uint64(v.into()),
        ValueRef::UBigInt(v) => Cell::Uint64(v),
        ValueRef::Float(v) => Cell::Float(v),
        ValueRef::Double(v) => Cell::Double(v),
        ValueRef::Text(bytes) => Cell::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Cell::Blob(Blob::new(bytes.to_vec())),
        other => match row.get::<_, String>(idx) {
            Ok(text) => Cell::String(text),
            Err(_) => Cell::String(format!("{other:?}")),
        },
    };
    Ok(cell)
}

/// Read every column of `row`
pub fn row_to_cells(row: &duckdb::Row<'_>) -> duckdb::Result<Row> {
    let column_count = row.as_ref().column_count();
    (0..column_count).map(|idx| cell_at(row, idx)).collect()
}

#[cfg(test)]
#[path = "values_test.rs"]
mod tests;
