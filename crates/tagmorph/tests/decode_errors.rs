use serde_json::json;
use tagmorph::{Decodable, DecodeErrorKind, Decoder, Schema, decode, decode_value};

#[derive(Debug, Default)]
struct Score {
    points: i64,
    ratio: f64,
    label: String,
}

impl Decodable for Score {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Points", |s: &mut Score| &mut s.points)
            .annotate("add,1")
            .field("Ratio", |s: &mut Score| &mut s.ratio)
            .annotate("divide,0")
            .field("Label", |s: &mut Score| &mut s.label)
            .build()
    }
}

#[test]
fn clause_errors_name_field_and_clause() {
    let mut score = Score::default();
    let err = decode_value(json!({"points": "abc"}), &mut score).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::TypeMismatch);
    assert_eq!(err.field.as_deref(), Some("Points"));
    assert_eq!(err.clause.as_deref(), Some("add"));
    assert!(!err.is_fatal());
    let message = err.to_string();
    assert!(message.contains("Points"), "{}", message);
    assert!(message.contains("add"), "{}", message);
}

#[test]
fn division_by_zero_fails() {
    let mut score = Score::default();
    let err = decode_value(json!({"points": 1, "ratio": 2.5}), &mut score).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::ArithmeticFailed);
    assert_eq!(err.field.as_deref(), Some("Ratio"));
    assert_eq!(err.clause.as_deref(), Some("divide"));
    // fields before the failure keep their new values
    assert_eq!(score.points, 2);
}

#[test]
fn integer_overflow_fails() {
    let mut score = Score::default();
    let err = decode_value(json!({"points": i64::MAX}), &mut score).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::ArithmeticFailed);
}

#[test]
fn malformed_documents_are_rejected() {
    let mut score = Score::default();
    let err = decode(b"{not json", &mut score).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidDocument);

    let err = decode(b"[1, 2, 3]", &mut score).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidDocument);
}

#[derive(Debug, Default)]
struct Broken {
    value: i64,
}

impl Decodable for Broken {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Value", |b: &mut Broken| &mut b.value)
            .annotate("add,1;teleport")
            .build()
    }
}

#[test]
fn unknown_clause_fails_before_decoding() {
    let err = Decoder::<Broken>::new().err().expect("schema should not compile");
    assert_eq!(err.kind, DecodeErrorKind::UnknownClause);
    assert!(err.is_fatal());
    assert_eq!(err.field.as_deref(), Some("Value"));

    let mut broken = Broken { value: 9 };
    let err = decode(br#"{"value": 1}"#, &mut broken).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::UnknownClause);
    assert_eq!(broken.value, 9);
}

#[derive(Debug, Default)]
struct MissingCapability {
    note: String,
}

impl Decodable for MissingCapability {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Note", |m: &mut MissingCapability| &mut m.note)
            .annotate("empty,is_blank")
            .build()
    }
}

#[test]
fn unknown_capability_is_fatal() {
    let err = Decoder::<MissingCapability>::new()
        .err()
        .expect("schema should not compile");
    assert_eq!(err.kind, DecodeErrorKind::UnknownCapability);
    assert!(err.is_fatal());
}

#[derive(Debug, Default)]
struct Mismatched {
    names: Vec<String>,
}

impl Decodable for Mismatched {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Names", |m: &mut Mismatched| &mut m.names)
            .annotate("nilmap")
            .build()
    }
}

#[test]
fn collection_clause_checks_field_shape() {
    let mut mismatched = Mismatched::default();
    let err = decode_value(json!({"names": null}), &mut mismatched).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::TypeMismatch);
    assert_eq!(err.clause.as_deref(), Some("nilmap"));
}

#[test]
fn assignment_errors_describe_the_types() {
    let mut score = Score::default();
    let decoder = Decoder::from_schema(
        Schema::builder()
            .field("Label", |s: &mut Score| &mut s.label)
            .build(),
        Default::default(),
    )
    .expect("schema should compile");
    let err = decoder
        .decode_value(json!({"label": true}), &mut score)
        .unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::TypeMismatch);
    assert!(err.message.contains("bool"), "{}", err.message);
}

#[derive(Debug, Default)]
struct Measurement {
    score: f64,
    ratio: f32,
    id: u64,
}

impl Decodable for Measurement {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Score", |m: &mut Measurement| &mut m.score)
            .annotate("round,2")
            .field("Ratio", |m: &mut Measurement| &mut m.ratio)
            .field("Id", |m: &mut Measurement| &mut m.id)
            .build()
    }
}

#[test]
fn rounding_overflow_is_an_error() {
    let mut measurement = Measurement::default();
    let err = decode_value(json!({"score": 1e307}), &mut measurement).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::ArithmeticFailed);
    assert_eq!(err.field.as_deref(), Some("Score"));
    assert_eq!(err.clause.as_deref(), Some("round"));
    assert_eq!(measurement.score, 0.0);
}

#[test]
fn out_of_range_float_for_f32_field_fails() {
    let mut measurement = Measurement::default();
    let err = decode_value(json!({"ratio": 1e39}), &mut measurement).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::TypeMismatch);
    assert_eq!(err.field.as_deref(), Some("Ratio"));
    assert!(measurement.ratio.is_finite());
}

#[test]
fn inexact_float_for_integer_field_fails() {
    let mut measurement = Measurement::default();
    let err = decode_value(json!({"id": 1.2345678901234567e19}), &mut measurement).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::TypeMismatch);
    assert_eq!(err.field.as_deref(), Some("Id"));
    assert_eq!(measurement.id, 0);
}
