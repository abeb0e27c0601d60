use super::*;
use pd_core::TypeId;

fn select_one(sql: &str) -> Row {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    let mut stmt = conn.prepare(sql).unwrap();
    let mut rows = stmt
        .query_map([], |row| row_to_cells(row))
        .unwrap()
        .collect::<duckdb::Result<Vec<Row>>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    rows.remove(0)
}

#[test]
fn test_cell_to_value() {
    assert_eq!(cell_to_value(&Cell::Null), Value::Null);
    assert_eq!(cell_to_value(&Cell::typed_null(TypeId::Int64)), Value::Null);
    assert_eq!(cell_to_value(&Cell::from("x")), Value::Text("x".to_string()));
    assert_eq!(cell_to_value(&Cell::from(-3i64)), Value::BigInt(-3));
    assert_eq!(cell_to_value(&Cell::from(3u64)), Value::UBigInt(3));
    assert_eq!(cell_to_value(&Cell::from(true)), Value::Boolean(true));
    assert_eq!(
        cell_to_value(&Cell::from(vec![1u8, 2])),
        Value::Blob(vec![1, 2])
    );
}

#[test]
fn test_integer_columns() {
    let row = select_one(
        "SELECT 1::TINYINT, 2::INTEGER, 3::BIGINT, 4::UTINYINT, 5::UBIGINT, 6::HUGEINT",
    );
    assert_eq!(
        row.cells(),
        &[
            Cell::Int64(1),
            Cell::Int64(2),
            Cell::Int64(3),
            Cell::Uint64(4),
            Cell::Uint64(5),
            Cell::Int64(6),
        ]
    );
}

#[test]
fn test_scalar_columns() {
    let row = select_one("SELECT 1.5::DOUBLE, 2.5::FLOAT, 'txt', true, NULL, '\\x01\\x02'::BLOB");
    assert_eq!(row[0], Cell::Double(1.5));
    assert_eq!(row[1], Cell::Float(2.5));
    assert_eq!(row[2], Cell::String("txt".to_string()));
    assert_eq!(row[3], Cell::Boolean(true));
    assert!(row[4].is_null());
    assert_eq!(row[5].type_id(), TypeId::Blob);
    assert_eq!(row[5].blob_bytes().unwrap().as_ref(), &[1u8, 2]);
}

#[test]
fn test_other_types_render_as_text() {
    let row = select_one("SELECT DATE '2024-01-02'");
    assert_eq!(row[0].type_id(), TypeId::String);
    assert!(!row[0].to_string().is_empty());
}
