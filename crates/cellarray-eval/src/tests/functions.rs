use crate::builtins::load_builtins;
use crate::function::FnCaps;
use crate::function_registry;
use crate::value::{CalcValue, ScalarValue, ValueObjectFactory};
use cellarray_common::ExcelErrorKind;

fn call(name: &str, args: &[CalcValue]) -> CalcValue {
    load_builtins();
    let f = function_registry::get("", name).unwrap_or_else(|| panic!("{name} not registered"));
    f.dispatch(args)
}

fn lit(text: &str) -> CalcValue {
    ValueObjectFactory::create(text)
}

#[test]
fn registry_resolves_names_and_aliases_case_insensitively() {
    load_builtins();
    for name in ["SUM", "average", "SumIfs", "COUNTIFS", "AVERAGEIFS", "MEDIAN", "VAR", "STDEV.P"] {
        assert!(function_registry::is_registered("", name), "{name}");
    }
    let var = function_registry::get("", "var").unwrap();
    assert_eq!(var.name(), "VAR.S");
    let sumifs = function_registry::get("", "SUMIFS").unwrap();
    assert!(sumifs.caps().contains(FnCaps::CRITERIA));
    assert!(function_registry::names().iter().any(|n| n == "COUNTBLANK"));
    assert!(function_registry::get("", "NOPE").is_none());
}

#[test]
fn sumifs_from_literals() {
    let out = call("SUMIFS", &[lit("{1;1;1}"), lit("{2;3;4}"), lit(">2")]);
    assert_eq!(out.as_array().unwrap().values(), &[vec![ScalarValue::Number(2.0)]]);

    let out = call("SUMIFS", &[lit("{1;1;1}"), lit("{2;3;4}"), lit("{\">2\";\">3\";\">4\"}")]);
    let cells: Vec<f64> = out
        .as_array()
        .unwrap()
        .cells()
        .filter_map(|(_, _, v)| v.as_number())
        .collect();
    assert_eq!(cells, vec![2.0, 1.0, 0.0]);
}

#[test]
fn criteria_in_a_row_broadcast_across_columns() {
    let out = call("COUNTIFS", &[lit("{1;2;3;4}"), lit("{\">1\",\">2\",\"<>3\"}")]);
    let arr = out.as_array().unwrap();
    assert_eq!((arr.row_count(), arr.column_count()), (1, 3));
    assert_eq!(arr.get(0, 0), ScalarValue::Number(3.0));
    assert_eq!(arr.get(0, 1), ScalarValue::Number(2.0));
    assert_eq!(arr.get(0, 2), ScalarValue::Number(3.0));
}

#[test]
fn average_ignores_array_text_but_rejects_direct_text() {
    assert_eq!(call("AVERAGE", &[lit("{1,\"a\";3,TRUE}")]), CalcValue::from(2.0));
    assert_eq!(
        call("AVERAGE", &[lit("{1,2}"), CalcValue::from("abc")]),
        CalcValue::from(ExcelErrorKind::Value)
    );
}

#[test]
fn arity_violations_are_na() {
    assert_eq!(call("SUMIFS", &[lit("{1}")]), CalcValue::from(ExcelErrorKind::Na));
    assert_eq!(call("MEDIAN", &[]), CalcValue::from(ExcelErrorKind::Na));
}

#[test]
fn errors_in_ranges_propagate_through_reductions() {
    assert_eq!(call("SUM", &[lit("{1,#DIV/0!,#N/A}")]), CalcValue::from(ExcelErrorKind::Div));
    assert_eq!(call("MAX", &[lit("{1;#NUM!}")]), CalcValue::from(ExcelErrorKind::Num));
}
