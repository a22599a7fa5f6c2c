use chrono::TimeDelta;
use serde_json::json;
use tagmorph::{Decodable, DecodeErrorKind, Decoder, DecoderConfig, Schema};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tagmorph=trace"))
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
struct Job {
    timeout: TimeDelta,
    retries: i64,
    owner: String,
}

impl Decodable for Job {
    fn schema() -> Schema<Self> {
        Schema::builder()
            .field("Timeout", |j: &mut Job| &mut j.timeout)
            .annotate("duration:seconds | multiply:2")
            .field("Retries", |j: &mut Job| &mut j.retries)
            .annotate("empty~ | add:1")
            .field("Owner", |j: &mut Job| &mut j.owner)
            .build()
    }
}

const PIPE_CONFIG: &str = r#"
clause_delimiter: "|"
argument_delimiter: ":"
negation_marker: "~"
"#;

#[test]
fn yaml_config_changes_the_grammar() {
    init_tracing();
    let config = DecoderConfig::from_yaml(PIPE_CONFIG).expect("config should parse");
    assert_eq!(config.clause_delimiter, '|');
    assert!(config.fold_case);

    let decoder = Decoder::<Job>::with_config(config).expect("schema should compile");
    let mut job = Job::default();
    decoder
        .decode_value(json!({"timeout": 5, "retries": 0, "owner": "ops"}), &mut job)
        .expect("decode failed");
    assert_eq!(job.timeout, TimeDelta::seconds(10));
    assert_eq!(job.owner, "ops");
}

#[test]
fn inverted_empty_clears_non_empty_values() {
    let config = DecoderConfig::from_yaml(PIPE_CONFIG).expect("config should parse");
    let decoder = Decoder::<Job>::with_config(config).expect("schema should compile");

    let mut job = Job::default();
    decoder
        .decode_value(json!({"retries": 0}), &mut job)
        .expect("decode failed");
    assert_eq!(job.retries, 1);

    decoder
        .decode_value(json!({"retries": 3}), &mut job)
        .expect("decode failed");
    assert_eq!(job.retries, 0);
}

#[test]
fn default_grammar_rejects_foreign_annotations() {
    let err = Decoder::<Job>::new().err().expect("schema should not compile");
    assert_eq!(err.kind, DecodeErrorKind::UnknownClause);
}

#[test]
fn case_sensitive_lookup() {
    let config = DecoderConfig {
        fold_case: false,
        ..DecoderConfig::from_yaml(PIPE_CONFIG).expect("config should parse")
    };
    let decoder = Decoder::<Job>::with_config(config).expect("schema should compile");
    let mut job = Job::default();
    decoder
        .decode_value(json!({"owner": "lower", "Owner": "exact"}), &mut job)
        .expect("decode failed");
    assert_eq!(job.owner, "exact");
}

#[test]
fn invalid_configs_are_rejected() {
    let err = DecoderConfig::from_yaml("clause_delimiter: \",\"\n").unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidConfig);

    let err = DecoderConfig::from_yaml("negation_marker: \"a\"\n").unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidConfig);

    let err = DecoderConfig::from_yaml("separator: \";\"\n").unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidConfig);
    assert!(err.is_fatal());

    let config = DecoderConfig {
        argument_delimiter: ';',
        ..DecoderConfig::default()
    };
    let err = Decoder::<Job>::with_config(config)
        .err()
        .expect("config should be rejected");
    assert_eq!(err.kind, DecodeErrorKind::InvalidConfig);
}
