//! Literal parsing against module type tables

use kelp_vm_bytecode::{Module, StructIndex, StructInfo, TypeDescriptor, TypeIndex};
use kelp_vm_data::{Heap, ParseError, Value, parse_data, parse_value};
use proptest::prelude::*;

struct Types {
    module: Module,
    point: TypeIndex,
    points: TypeIndex,
    ints: TypeIndex,
    labels: TypeIndex,
}

fn types() -> Types {
    let mut b = Module::builder();
    b.add_struct(StructInfo::new("Point", ["x", "y"]));
    let point = b.add_type(TypeDescriptor::Struct {
        struct_id: StructIndex(0),
        fields: vec![TypeIndex::INT, TypeIndex::FLOAT],
    });
    let points = b.add_type(TypeDescriptor::Vector { element: point });
    let ints = b.add_type(TypeDescriptor::Vector {
        element: TypeIndex::INT,
    });
    let labels = b.add_type(TypeDescriptor::Vector {
        element: TypeIndex::STRING,
    });
    Types {
        module: b.build().unwrap(),
        point,
        points,
        ints,
        labels,
    }
}

#[test]
fn test_point_literals() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let p = parse_value(&ctx, &heap, t.point, "Point{1, 2.5}").unwrap();
    assert_eq!(p.as_vector().unwrap().elems(), &[Value::Int(1), Value::Float(2.5)]);

    let p = parse_value(&ctx, &heap, t.point, "Point{1}").unwrap();
    assert_eq!(p.as_vector().unwrap().elems(), &[Value::Int(1), Value::Float(0.0)]);

    let p = parse_value(&ctx, &heap, t.point, "Point{1, 2.5, 3}").unwrap();
    assert_eq!(p.as_vector().unwrap().elems(), &[Value::Int(1), Value::Float(2.5)]);
}

#[test]
fn test_vectors() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let v = parse_value(&ctx, &heap, t.ints, "[1, 2, 3]").unwrap();
    assert_eq!(v.as_vector().unwrap().elems(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);

    let v = parse_value(&ctx, &heap, t.ints, "[]").unwrap();
    assert!(v.as_vector().unwrap().is_empty());
    assert_eq!(v.as_vector().unwrap().ty(), t.ints);
}

#[test]
fn test_type_mismatch_names_both_types() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let err = parse_value(&ctx, &heap, TypeIndex::INT, "\"hi\"").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Int"), "{msg}");
    assert!(msg.contains("String"), "{msg}");
    assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
}

#[test]
fn test_failed_parse_releases_everything() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let (v, err) = parse_data(
        &ctx,
        &heap,
        t.points,
        "[Point{1, 2.0}, Point{2, 3.0}, Point{\"three\"}]",
    );
    assert!(v.is_nil());
    assert!(err.is_some());
    assert_eq!(heap.live_objects(), 0);

    let err = parse_value(&ctx, &heap, t.labels, "[\"a\", \"b\", 3]").unwrap_err();
    assert!(err.to_string().contains("type `String` required, `Int` given"));
    assert_eq!(heap.live_objects(), 0);
    assert_eq!(heap.stats().total_allocated, heap.stats().total_released);
}

#[test]
fn test_successful_parse_hands_over_sole_reference() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let v = parse_value(&ctx, &heap, t.points, "[Point{1, 2.0}\nPoint{-2}]").unwrap();
    assert_eq!(v.ref_count(), Some(1));
    for elem in v.as_vector().unwrap().elems() {
        assert_eq!(elem.ref_count(), Some(1));
    }
    assert_eq!(heap.live_objects(), 3);
    drop(v);
    assert_eq!(heap.live_objects(), 0);
}

#[test]
fn test_literal_text_parses_back() {
    let t = types();
    let ctx = t.module.type_context();
    let heap = Heap::new();

    let text = "[Point{-1, 0.5}, Point{7, 1e3}]";
    let v = parse_value(&ctx, &heap, t.points, text).unwrap();
    let again = parse_value(&ctx, &heap, t.points, &v.to_literal(&ctx)).unwrap();
    assert_eq!(again, v);
}

proptest! {
    #[test]
    fn prop_int_vectors_parse(items in proptest::collection::vec((i64::MIN + 1)..=i64::MAX, 0..32)) {
        let t = types();
        let ctx = t.module.type_context();
        let heap = Heap::new();

        let text = format!("[{}]", items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "));
        let v = parse_value(&ctx, &heap, t.ints, &text).unwrap();
        let expected: Vec<Value> = items.iter().copied().map(Value::Int).collect();
        prop_assert_eq!(v.as_vector().unwrap().elems(), expected.as_slice());
    }

    #[test]
    fn prop_rejected_input_never_leaks(labels in proptest::collection::vec("[a-z]{0,8}", 0..16), bad in 0usize..16) {
        let t = types();
        let ctx = t.module.type_context();
        let heap = Heap::new();

        let mut parts: Vec<String> = labels.iter().map(|l| format!("{l:?}")).collect();
        let at = bad.min(parts.len());
        parts.insert(at, "nil".to_string());
        let text = format!("[{}]", parts.join(", "));

        prop_assert!(parse_value(&ctx, &heap, t.labels, &text).is_err());
        prop_assert_eq!(heap.live_objects(), 0);
    }
}
