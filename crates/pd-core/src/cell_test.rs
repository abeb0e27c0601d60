use super::*;

fn every_cell() -> Vec<Cell> {
    vec![
        Cell::Null,
        Cell::from("text"),
        Cell::from(-7_i64),
        Cell::from(7_u64),
        Cell::from(1.5_f64),
        Cell::from(2.5_f32),
        Cell::from(true),
        Cell::from(vec![1_u8, 2, 3]),
        Cell::BlobInput(BlobInput::from_reader(&b"abc"[..]).unwrap()),
    ]
}

fn cast_ok<T: CellValue>(cell: &Cell) -> bool {
    cell.cast::<T>().is_ok()
}

#[test]
fn tag_matches_payload() {
    let tags: Vec<TypeId> = every_cell().iter().map(Cell::type_id).collect();
    assert_eq!(
        tags,
        vec![
            TypeId::Null,
            TypeId::String,
            TypeId::Int64,
            TypeId::Uint64,
            TypeId::Double,
            TypeId::Float,
            TypeId::Boolean,
            TypeId::Blob,
            TypeId::BlobInput,
        ]
    );
}

#[test]
fn cast_fails_for_every_mismatched_tag() {
    for cell in every_cell() {
        let tag = cell.type_id();
        let checks: [(TypeId, bool); 8] = [
            (TypeId::String, cast_ok::<String>(&cell)),
            (TypeId::Int64, cast_ok::<i64>(&cell)),
            (TypeId::Uint64, cast_ok::<u64>(&cell)),
            (TypeId::Double, cast_ok::<f64>(&cell)),
            (TypeId::Float, cast_ok::<f32>(&cell)),
            (TypeId::Boolean, cast_ok::<bool>(&cell)),
            (TypeId::Blob, cast_ok::<Blob>(&cell)),
            (TypeId::BlobInput, cast_ok::<BlobInput>(&cell)),
        ];
        for (target, ok) in checks {
            assert_eq!(ok, target == tag, "cast {tag} -> {target}");
        }
    }
}

#[test]
fn cast_error_names_both_tags() {
    let err = Cell::from(3_i64).cast::<String>().unwrap_err();
    match err {
        CoreError::Cast { expected, actual } => {
            assert_eq!(expected, TypeId::String);
            assert_eq!(actual, TypeId::Int64);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn matching_cast_preserves_bits() {
    let nan = f64::from_bits(0x7ff8_0000_0000_1234);
    let cell = Cell::from(nan);
    assert_eq!(cell.cast::<f64>().unwrap().to_bits(), nan.to_bits());

    let cell = Cell::from(i64::MIN);
    assert_eq!(*cell.cast::<i64>().unwrap(), i64::MIN);

    let cell = Cell::from(u64::MAX);
    assert_eq!(cell.into_value::<u64>().unwrap(), u64::MAX);
}

#[test]
fn typed_null_reports_tag_but_has_no_payload() {
    let cell = Cell::typed_null(TypeId::Int64);
    assert!(cell.is_null());
    assert_eq!(cell.type_id(), TypeId::Int64);
    assert!(cell.cast::<i64>().is_err());
    assert_ne!(cell, Cell::Null);
}

#[test]
fn typed_null_of_null_is_plain_null() {
    assert_eq!(Cell::typed_null(TypeId::Null), Cell::Null);
}

#[test]
fn clone_shares_blob_buffer() {
    let cell = Cell::from(vec![9_u8; 64]);
    let copy = cell.clone();
    let a = cell.blob_bytes().unwrap();
    let b = copy.blob_bytes().unwrap();
    assert_eq!(a.as_ptr(), b.as_ptr());
}

#[test]
fn clone_deep_copies_strings() {
    let cell = Cell::from("hello");
    let mut copy = cell.clone();
    if let Cell::String(s) = &mut copy {
        s.push('!');
    }
    assert_eq!(cell.cast::<String>().unwrap(), "hello");
    assert_eq!(copy.cast::<String>().unwrap(), "hello!");
}

#[test]
fn option_none_becomes_null() {
    assert_eq!(Cell::from(None::<i64>), Cell::Null);
    assert_eq!(Cell::from(Some(4_i64)), Cell::Int64(4));
}

#[test]
fn raw_tag_round_trips() {
    for tag in TypeId::ALL {
        assert_eq!(TypeId::from_u8(tag.as_u8()), Some(tag));
    }
    assert_eq!(TypeId::from_u8(200), None);
}

#[test]
fn blob_input_drains_reader() {
    let cell = Cell::blob_input(std::io::Cursor::new(vec![1_u8, 2, 3, 4])).unwrap();
    assert_eq!(cell.type_id(), TypeId::BlobInput);
    assert_eq!(cell.blob_bytes().unwrap().as_ref(), &[1, 2, 3, 4]);
}

#[test]
fn json_rendering() {
    assert_eq!(Cell::Null.to_json(), serde_json::Value::Null);
    assert_eq!(Cell::from(5_i64).to_json(), serde_json::json!(5));
    assert_eq!(Cell::from("x").to_json(), serde_json::json!("x"));
    assert_eq!(Cell::from(vec![0xff_u8]).to_json(), serde_json::json!("/w=="));
}

#[test]
fn display_rendering() {
    assert_eq!(Cell::Null.to_string(), "NULL");
    assert_eq!(Cell::from(12_i64).to_string(), "12");
    assert_eq!(Cell::from(vec![1_u8, 2]).to_string(), "<blob 2 bytes>");
}
