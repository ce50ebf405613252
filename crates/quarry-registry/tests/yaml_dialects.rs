use quarry_ir::{OpKind, TemporalUnit};
use quarry_registry::{DialectRegistry, DialectSpec, RegistryError};

const DIALECTS: &str = r#"
dialects:
  - name: lakehouse
    unsupported: [RandomUUID, Mode]
    truncate_units:
      year: YEAR
      month: MONTH
      day: DAY
    ordered_aggregates_require_order_by: true
    aggregate_filter: false
  - name: minimal
"#;

#[test]
fn test_register_from_yaml() {
    let mut registry = DialectRegistry::with_builtins();
    let names = registry.from_yaml_str(DIALECTS).unwrap();
    assert_eq!(names, vec!["lakehouse", "minimal"]);

    let lakehouse = registry.get("lakehouse").unwrap();
    assert!(!lakehouse.supports(OpKind::RandomUUID));
    assert!(!lakehouse.supports(OpKind::Mode));
    assert!(lakehouse.supports(OpKind::Arbitrary));
    assert_eq!(lakehouse.truncate_unit(TemporalUnit::Month), Some("MONTH"));
    assert_eq!(lakehouse.truncate_unit(TemporalUnit::Hour), None);
    assert!(lakehouse.ordered_aggregates_require_order_by);
    assert!(!lakehouse.aggregate_filter);

    let minimal = registry.get("minimal").unwrap();
    assert_eq!(
        DialectSpec {
            name: "base".to_string(),
            ..(*minimal).clone()
        },
        DialectSpec::base()
    );
}

#[test]
fn test_yaml_duplicate_of_builtin_fails() {
    let mut registry = DialectRegistry::with_builtins();
    let err = registry
        .from_yaml_str("dialects:\n  - name: duckdb\n")
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateDialect(name) if name == "duckdb"));
}

#[test]
fn test_failed_file_registers_nothing() {
    let mut registry = DialectRegistry::with_builtins();
    let err = registry
        .from_yaml_str("dialects:\n  - name: lakehouse\n  - name: duckdb\n")
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateDialect(name) if name == "duckdb"));
    assert_eq!(
        registry.names(),
        vec!["base", "duckdb", "postgres", "risingwave"]
    );
}

#[test]
fn test_duplicate_within_file_registers_nothing() {
    let mut registry = DialectRegistry::new();
    let err = registry
        .from_yaml_str("dialects:\n  - name: lakehouse\n  - name: lakehouse\n")
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateDialect(name) if name == "lakehouse"));
    assert!(registry.names().is_empty());
}

#[test]
fn test_malformed_yaml() {
    let mut registry = DialectRegistry::new();
    let err = registry
        .from_yaml_str("dialects:\n  - unsupported: [NotAnOperation]\n")
        .unwrap_err();
    assert!(matches!(err, RegistryError::Yaml(_)));
    assert!(registry.names().is_empty());
}

#[test]
fn test_load_missing_file() {
    let mut registry = DialectRegistry::new();
    let err = registry
        .load_yaml("/nonexistent/quarry-dialects.yaml")
        .unwrap_err();
    assert!(matches!(err, RegistryError::Io(_)));
}

#[test]
fn test_load_yaml_file() {
    let path = std::env::temp_dir().join(format!("quarry-dialects-{}.yaml", std::process::id()));
    std::fs::write(&path, DIALECTS).unwrap();

    let mut registry = DialectRegistry::new();
    let names = registry.load_yaml(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(names.len(), 2);
    assert_eq!(registry.names(), vec!["lakehouse", "minimal"]);
}
