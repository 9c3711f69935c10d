use crate::value::{
    ArrayValue, CalcValue, ScalarValue, SearchType, SliceSpec, ValueObjectFactory, transform_to_value,
    transform_to_value_object,
};
use cellarray_common::{ExcelErrorKind, RawValue};
use std::rc::Rc;

fn grid(rows: &[&[f64]]) -> ArrayValue {
    ArrayValue::new(
        rows.iter()
            .map(|r| r.iter().map(|n| ScalarValue::Number(*n)).collect())
            .collect(),
    )
    .unwrap()
}

#[test]
fn plus_then_minus_restores_numeric_cells() {
    let a = ArrayValue::new(vec![
        vec![ScalarValue::Number(1.5), ScalarValue::Number(-2.0)],
        vec![ScalarValue::Error(ExcelErrorKind::Na), ScalarValue::Number(1e6)],
    ])
    .unwrap();
    let s = CalcValue::from(7.25);
    let back = a.plus(&s).minus(&s);
    for (r, c, v) in a.cells() {
        match v {
            ScalarValue::Number(n) => assert!((back.get(r, c).as_number().unwrap() - n).abs() < 1e-9),
            other => assert_eq!(&back.get(r, c), other),
        }
    }
}

#[test]
fn double_transpose_is_identity() {
    let a = ValueObjectFactory::parse_array_literal("{1,\"x\",TRUE;#REF!,,2}").unwrap();
    assert_eq!(a.transpose().transpose(), a);
    assert_eq!((a.transpose().row_count(), a.transpose().column_count()), (3, 2));
}

#[test]
fn flatten_is_memoized_until_set() {
    let mut a = grid(&[&[1.0, 2.0], &[3.0, 4.0]]);
    let first = a.flatten();
    assert_eq!(first.column_count(), 4);
    assert!(Rc::ptr_eq(&first, &a.flatten()));

    a.set(1, 0, ScalarValue::Number(30.0)).unwrap();
    let after = a.flatten();
    assert!(!Rc::ptr_eq(&first, &after));
    assert_eq!(after.get(0, 2), ScalarValue::Number(30.0));
    assert_eq!(first.get(0, 2), ScalarValue::Number(3.0));
}

#[test]
fn pick_follows_mask_in_row_major_order() {
    let a = grid(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
    let mask = a.compare(&CalcValue::from(2.0), crate::value::CompareToken::GreaterThan);
    let picked = a.pick(&mask);
    assert_eq!(picked.column_count(), 4);
    let cells: Vec<f64> = picked.cells().filter_map(|(_, _, v)| v.as_number()).collect();
    assert_eq!(cells, vec![3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn binary_search_brackets_target() {
    let a = grid(&[&[1.0, 3.0, 5.0, 7.0]]);
    assert_eq!(a.binary_search(&ScalarValue::Number(5.0), SearchType::Min), Some(2));
    assert_eq!(a.binary_search(&ScalarValue::Number(4.0), SearchType::Min), Some(1));
    assert_eq!(a.binary_search(&ScalarValue::Number(4.0), SearchType::Max), Some(2));
    assert_eq!(a.binary_search(&ScalarValue::Number(0.0), SearchType::Min), None);
    assert_eq!(a.binary_search(&ScalarValue::Number(9.0), SearchType::Max), None);
}

#[test]
fn factory_classifies_literals() {
    assert_eq!(ValueObjectFactory::create("TRUE"), ValueObjectFactory::create(true));
    assert_eq!(ValueObjectFactory::create("1.5e3"), CalcValue::from(1500.0));
    assert_eq!(ValueObjectFactory::create("#N/A"), CalcValue::from(ExcelErrorKind::Na));
    let arr = ValueObjectFactory::create("{1,2;3,4}");
    assert_eq!(arr.dims(), (2, 2));
    assert_eq!(ValueObjectFactory::create("{}"), CalcValue::from("{}"));
}

#[test]
fn raw_values_round_trip_through_cells() {
    let raw = vec![vec![RawValue::Number(1.0), RawValue::Text("#DIV/0!".into()), RawValue::Null]];
    let cells = transform_to_value_object(&raw);
    assert_eq!(cells[0][1], ScalarValue::Error(ExcelErrorKind::Div));
    assert_eq!(transform_to_value(&cells), raw);
}

#[test]
fn slices_share_memo_and_drop_on_mutation() {
    let mut a = grid(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]);
    let s = a.slice(SliceSpec::starting_at(1), SliceSpec::new(None, None, Some(2))).unwrap();
    assert_eq!(s.values(), grid(&[&[4.0, 6.0], &[7.0, 9.0]]).values());
    let again = a.slice(SliceSpec::starting_at(1), SliceSpec::new(None, None, Some(2))).unwrap();
    assert!(Rc::ptr_eq(&s, &again));

    a.set(2, 2, ScalarValue::Number(90.0)).unwrap();
    let fresh = a.slice(SliceSpec::starting_at(1), SliceSpec::new(None, None, Some(2))).unwrap();
    assert_eq!(fresh.get(1, 1), ScalarValue::Number(90.0));
}

#[test]
fn row_against_column_is_an_outer_product() {
    let row = CalcValue::from(grid(&[&[1.0, 2.0, 3.0]]));
    let col = CalcValue::from(grid(&[&[10.0], &[20.0]]));
    let out = col.plus(&row);
    let arr = out.as_array().unwrap();
    assert_eq!((arr.row_count(), arr.column_count()), (2, 3));
    assert_eq!(arr.get(1, 2), ScalarValue::Number(23.0));
}

#[test]
fn sorts_and_set_values_drop_memoized_views() {
    let mut by_column = grid(&[&[3.0, 30.0], &[1.0, 10.0], &[2.0, 20.0]]);
    let flat = by_column.flatten();
    let slice = by_column.slice(SliceSpec::starting_at(1), SliceSpec::ALL).unwrap();
    by_column.sort_by_column(0).unwrap();
    let after = by_column.flatten();
    assert!(!Rc::ptr_eq(&flat, &after));
    assert_eq!(after.values(), grid(&[&[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]]).values());
    let fresh = by_column.slice(SliceSpec::starting_at(1), SliceSpec::ALL).unwrap();
    assert!(!Rc::ptr_eq(&slice, &fresh));
    assert_eq!(fresh.values(), grid(&[&[2.0, 20.0], &[3.0, 30.0]]).values());

    let mut by_row = grid(&[&[3.0, 1.0, 2.0]]);
    let flat = by_row.flatten();
    let positions = by_row.flatten_position();
    by_row.sort_by_row(0).unwrap();
    let after = by_row.flatten();
    assert!(!Rc::ptr_eq(&flat, &after));
    assert_eq!(after.values(), grid(&[&[1.0, 2.0, 3.0]]).values());
    assert!(!Rc::ptr_eq(&positions, &by_row.flatten_position()));

    let mut replaced = grid(&[&[1.0, 2.0]]);
    let flat = replaced.flatten();
    replaced.set_values(vec![vec![ScalarValue::Number(7.0)], vec![ScalarValue::Number(8.0)]]).unwrap();
    let after = replaced.flatten();
    assert!(!Rc::ptr_eq(&flat, &after));
    assert_eq!(after.values(), grid(&[&[7.0, 8.0]]).values());
}
