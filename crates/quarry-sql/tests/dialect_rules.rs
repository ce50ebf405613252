//! Per-dialect rewrites and rejections.

use quarry_ir::*;
use quarry_registry::DialectSpec;
use quarry_sql::*;

fn events() -> NodeRef {
    table(
        "events",
        Schema::from_pairs([
            ("id", DataType::Int64),
            ("x", DataType::Float64),
            ("t", DataType::Timestamp { timezone: None }),
            ("d", DataType::Date),
            ("n", DataType::Int32),
            ("g", DataType::String),
        ]),
    )
    .unwrap()
}

fn col(name: &str) -> NodeRef {
    events().field(name).unwrap()
}

fn int(value: i64) -> NodeRef {
    integer(value).unwrap()
}

fn sql(compiler: &dyn SqlCompiler, node: &NodeRef) -> String {
    compiler.compile(node).unwrap().to_sql()
}

fn unsupported_operation(result: Result<SqlFragment, CompileError>) -> (String, String, String) {
    match result {
        Err(CompileError::UnsupportedOperation {
            dialect,
            operation,
            reason,
        }) => (dialect, operation, reason),
        other => panic!("expected an unsupported operation, got {:?}", other),
    }
}

#[test]
fn test_risingwave_rejects_unsupported_operations() {
    let compiler = RisingWaveCompiler::new();
    let nodes = [
        ("Arbitrary", col("x").reduce(ReductionFunc::Arbitrary).unwrap()),
        ("Mode", col("g").reduce(ReductionFunc::Mode).unwrap()),
        ("DateFromYMD", date_from_ymd(int(2024), int(1), int(2)).unwrap()),
        ("RandomUUID", Node::new(Op::RandomUUID).unwrap()),
    ];

    for (expected, node) in nodes {
        let (dialect, operation, _) = unsupported_operation(compiler.compile(&node));
        assert_eq!(dialect, "risingwave");
        assert_eq!(operation, expected);
    }
}

#[test]
fn test_other_dialects_accept_what_risingwave_rejects() {
    let mode = col("g").reduce(ReductionFunc::Mode).unwrap();
    assert_eq!(
        sql(&PostgresCompiler::new(), &mode),
        "MODE() WITHIN GROUP (ORDER BY \"g\" ASC)"
    );
    assert_eq!(sql(&DuckDbCompiler::new(), &mode), "MODE(\"g\")");

    let uuid = Node::new(Op::RandomUUID).unwrap();
    assert_eq!(sql(&DuckDbCompiler::new(), &uuid), "UUID()");
    assert_eq!(sql(&BaseCompiler::new(), &uuid), "GEN_RANDOM_UUID()");

    let ymd = date_from_ymd(int(2024), int(1), int(2)).unwrap();
    assert_eq!(sql(&BaseCompiler::new(), &ymd), "MAKE_DATE(2024, 1, 2)");

    let any = col("x").reduce(ReductionFunc::Arbitrary).unwrap();
    assert_eq!(sql(&PostgresCompiler::new(), &any), "ANY_VALUE(\"x\")");
}

#[test]
fn test_unsupported_check_precedes_children() {
    let mut spec = DialectSpec::base();
    spec.name = "nocase".to_string();
    spec.unsupported.insert(OpKind::SearchedCase);
    spec.unsupported.insert(OpKind::Equals);
    let compiler = BaseCompiler::with_spec(spec);

    let node = case()
        .when(col("n").equals(&int(1)).unwrap(), string("a").unwrap())
        .unwrap()
        .end()
        .unwrap();

    let (dialect, operation, _) = unsupported_operation(compiler.compile(&node));
    assert_eq!(dialect, "nocase");
    assert_eq!(operation, "SearchedCase");
}

#[test]
fn test_first_last_require_order_by_on_risingwave() {
    let compiler = RisingWaveCompiler::new();

    for func in ["first", "last"] {
        let node = match func {
            "first" => col("x").first(vec![]).unwrap(),
            _ => col("x").last(vec![]).unwrap(),
        };
        let (_, _, reason) = unsupported_operation(compiler.compile(&node));
        assert!(reason.contains("order_by"), "{}", reason);
        assert!(reason.contains(func), "{}", reason);
    }

    let first = col("x").first(vec![SortKey::asc(col("t"))]).unwrap();
    assert_eq!(sql(&compiler, &first), "FIRST_VALUE(\"x\" ORDER BY \"t\" ASC)");

    let last = col("x").last(vec![SortKey::desc(col("t"))]).unwrap();
    assert_eq!(sql(&compiler, &last), "LAST_VALUE(\"x\" ORDER BY \"t\" DESC)");
}

#[test]
fn test_first_last_elsewhere() {
    let first = col("x").first(vec![SortKey::asc(col("t"))]).unwrap();
    let last = col("x").last(vec![SortKey::asc(col("t"))]).unwrap();

    assert_eq!(
        sql(&PostgresCompiler::new(), &first),
        "(ARRAY_AGG(\"x\" ORDER BY \"t\" ASC))[1]"
    );
    assert_eq!(
        sql(&PostgresCompiler::new(), &last),
        "(ARRAY_AGG(\"x\" ORDER BY \"t\" DESC))[1]"
    );
    assert_eq!(
        sql(&DuckDbCompiler::new(), &first),
        "FIRST(\"x\" ORDER BY \"t\" ASC)"
    );

    // No ordering requirement outside RisingWave
    let unordered = col("x").first(vec![]).unwrap();
    assert_eq!(sql(&DuckDbCompiler::new(), &unordered), "FIRST(\"x\")");
}

#[test]
fn test_correlation_modes() {
    let sample = col("x").corr(&col("n"), CorrelationMode::Sample).unwrap();
    let pop = col("x").corr(&col("n"), CorrelationMode::Population).unwrap();

    let (dialect, operation, reason) =
        unsupported_operation(RisingWaveCompiler::new().compile(&sample));
    assert_eq!(dialect, "risingwave");
    assert_eq!(operation, "Correlation");
    assert_eq!(reason, "risingwave only implements `pop` correlation coefficient");

    assert_eq!(sql(&RisingWaveCompiler::new(), &pop), "CORR(\"x\", \"n\")");
    assert_eq!(sql(&BaseCompiler::new(), &sample), "CORR(\"x\", \"n\")");
}

#[test]
fn test_truncate_vocabulary() {
    let rw = RisingWaveCompiler::new();

    let month = col("d").truncate(TemporalUnit::Month).unwrap();
    assert_eq!(month.kind(), OpKind::DateTruncate);
    assert_eq!(sql(&rw, &month), "DATE_TRUNC('month', \"d\")");

    let millis = col("t").truncate(TemporalUnit::Millisecond).unwrap();
    assert_eq!(sql(&rw, &millis), "DATE_TRUNC('milliseconds', \"t\")");
    assert_eq!(
        sql(&BaseCompiler::new(), &millis),
        "DATE_TRUNC('millisecond', \"t\")"
    );

    let nanos = col("t").truncate(TemporalUnit::Nanosecond).unwrap();
    let (_, operation, reason) = unsupported_operation(rw.compile(&nanos));
    assert_eq!(operation, "TimestampTruncate");
    assert!(reason.contains("truncate unit"), "{}", reason);
}

#[test]
fn test_interval_from_integer_by_shape() {
    let rw = RisingWaveCompiler::new();

    let scalar = int(5).as_interval(TemporalUnit::Day).unwrap();
    assert_eq!(scalar.shape(), Shape::Scalar);
    assert_eq!(sql(&rw, &scalar), "INTERVAL '5' DAY");

    let columnar = col("n").as_interval(TemporalUnit::Day).unwrap();
    assert_eq!(columnar.shape(), Shape::Columnar);
    assert_eq!(sql(&rw, &columnar), "(\"n\" * INTERVAL '1' DAY)");

    let err = interval_from_integer(
        &rw,
        SqlExpr::Column("n".to_string()),
        Shape::Tabular,
        TemporalUnit::Day,
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::InvalidShape(_)));

    let quarter = col("n").as_interval(TemporalUnit::Quarter).unwrap();
    assert!(matches!(
        rw.compile(&quarter),
        Err(CompileError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_date_now() {
    let today = Node::new(Op::DateNow).unwrap();
    assert_eq!(
        sql(&RisingWaveCompiler::new(), &today),
        "CAST(CURRENT_TIMESTAMP AS DATE)"
    );
    assert_eq!(sql(&PostgresCompiler::new(), &today), "CURRENT_DATE");

    let now = Node::new(Op::TimestampNow).unwrap();
    assert_eq!(sql(&RisingWaveCompiler::new(), &now), "CURRENT_TIMESTAMP");
}

#[test]
fn test_case_branches_in_declaration_order() {
    let node = case()
        .when(col("n").equals(&int(1)).unwrap(), string("one").unwrap())
        .unwrap()
        .when(col("n").equals(&int(2)).unwrap(), string("two").unwrap())
        .unwrap()
        .else_(string("many").unwrap())
        .end()
        .unwrap();

    assert_eq!(
        sql(&PostgresCompiler::new(), &node),
        "CASE WHEN (\"n\" = 1) THEN 'one' WHEN (\"n\" = 2) THEN 'two' ELSE 'many' END"
    );
}

#[test]
fn test_simple_case_null_default() {
    let node = col("g")
        .case()
        .when(string("foo").unwrap(), string("bar").unwrap())
        .unwrap()
        .end()
        .unwrap();

    assert_eq!(
        sql(&RisingWaveCompiler::new(), &node),
        "CASE \"g\" WHEN 'foo' THEN 'bar' ELSE CAST(NULL AS TEXT) END"
    );
    assert_eq!(
        sql(&DuckDbCompiler::new(), &node),
        "CASE \"g\" WHEN 'foo' THEN 'bar' ELSE CAST(NULL AS VARCHAR) END"
    );
}

#[test]
fn test_ifelse_casts_condition() {
    let node = ifelse(col("n"), string("yes").unwrap(), string("no").unwrap()).unwrap();
    assert_eq!(
        sql(&PostgresCompiler::new(), &node),
        "CASE WHEN CAST(\"n\" AS BOOLEAN) THEN 'yes' ELSE 'no' END"
    );
}

#[test]
fn test_aggregate_filter_fallback() {
    let predicate = col("n").binary(BinaryOp::Greater, &int(1)).unwrap();
    let total = Node::new(Op::Reduction {
        func: ReductionFunc::Sum,
        arg: col("x"),
        where_: Some(predicate),
    })
    .unwrap();

    assert_eq!(
        sql(&PostgresCompiler::new(), &total),
        "SUM(\"x\") FILTER (WHERE (\"n\" > 1))"
    );

    let mut spec = DialectSpec::base();
    spec.name = "nofilter".to_string();
    spec.aggregate_filter = false;
    assert_eq!(
        sql(&BaseCompiler::with_spec(spec), &total),
        "SUM(CASE WHEN (\"n\" > 1) THEN \"x\" END)"
    );
}

#[test]
fn test_boolean_sum_and_integer_division() {
    let flagged = col("g").is_null().unwrap().reduce(ReductionFunc::Sum).unwrap();
    assert_eq!(
        sql(&PostgresCompiler::new(), &flagged),
        "SUM(CAST((\"g\" IS NULL) AS INTEGER))"
    );

    let ratio = col("n").binary(BinaryOp::Divide, &int(2)).unwrap();
    assert_eq!(
        sql(&PostgresCompiler::new(), &ratio),
        "(CAST(\"n\" AS DOUBLE PRECISION) / 2)"
    );
    assert_eq!(
        sql(&DuckDbCompiler::new(), &ratio),
        "(CAST(\"n\" AS DOUBLE) / 2)"
    );
}

#[test]
fn test_string_functions() {
    let length = col("g").unary(UnaryOp::StringLength).unwrap();
    assert_eq!(sql(&PostgresCompiler::new(), &length), "CHAR_LENGTH(\"g\")");
    assert_eq!(sql(&DuckDbCompiler::new(), &length), "LENGTH(\"g\")");

    let upper = col("g").unary(UnaryOp::Uppercase).unwrap();
    assert_eq!(sql(&BaseCompiler::new(), &upper), "UPPER(\"g\")");
}

#[test]
fn test_failed_compilation_yields_no_fragment() {
    let registry = CompilerRegistry::with_builtins();
    let node = col("g").reduce(ReductionFunc::Mode).unwrap();
    assert!(registry.compile(&node, "risingwave").is_err());
    assert!(registry.compile(&node, "duckdb").is_ok());
}
