use std::sync::Arc;

use sqlwing::{
    Coerce,
    Database,
    Describable,
    Engine,
    Error,
    Evaluable,
    Materialized,
    Op,
    Output,
    Source,
    Table,
    Value,
    ops,
};

const INCR: &str = "select a + 1 as a";

fn setup() -> Arc<Engine> {
    logutil::init_test();
    Engine::open_in_memory().unwrap()
}

fn zero(engine: &Arc<Engine>) -> Table {
    Table::from_columns(engine, [("a", vec![0])]).unwrap()
}

fn range(engine: &Arc<Engine>, n: i64) -> Table {
    Table::from_columns(engine, [("i", (0..n).collect::<Vec<_>>())]).unwrap()
}

#[test]
fn increments() {
    let engine = setup();
    let t = zero(&engine);

    assert_eq!(Some(1), t.run(ops![INCR, Coerce::Int]).unwrap().as_int());
    assert_eq!(
        Some(3),
        t.run(ops![INCR, INCR, INCR, Coerce::Int]).unwrap().as_int()
    );
    assert_eq!(
        Some(3),
        t.run(ops![[INCR, INCR, INCR], Coerce::Int]).unwrap().as_int()
    );
}

#[test]
fn nested_sequences_splice() {
    let engine = setup();
    let t = zero(&engine);
    let chain = ops![ops![INCR, ops![INCR, [INCR]]], INCR, Coerce::Int];
    assert_eq!(Some(4), t.run(chain).unwrap().as_int());
}

#[test]
fn callables_compose() {
    let engine = setup();
    let t = zero(&engine);
    let g = Op::call(|out: Output| out.run([INCR]));

    let via_callable = t
        .run(ops![g.clone(), g.clone(), g, Coerce::Int])
        .unwrap()
        .as_int();
    let direct = t.run(ops![INCR, INCR, INCR, Coerce::Int]).unwrap().as_int();
    assert_eq!(Some(3), via_callable);
    assert_eq!(direct, via_callable);
}

#[test]
fn callable_may_return_terminal_value() {
    let engine = setup();
    let t = zero(&engine);
    let count = Op::call(|out: Output| Ok(Output::Int(out.into_table()?.count()? as i64)));
    assert_eq!(Some(1), t.run(ops![count]).unwrap().as_int());
}

#[test]
fn callable_errors_propagate() {
    let engine = setup();
    let t = zero(&engine);
    let fail = Op::call(|_| Err(Error::external("callable failed")));

    let err = t.run(ops![INCR, fail, INCR]).unwrap_err();
    assert!(matches!(err, Error::External(_)));
    assert_eq!("callable failed", err.to_string());
}

#[test]
fn alias_renders_database() {
    let engine = setup();
    let t = zero(&engine);
    let db = t.run(ops!["as bah"]).unwrap();
    assert!(matches!(db, Output::Database(_)));
    assert_eq!("Database:\n    bah: 1 x [a]", db.to_string());
}

#[test]
fn database_union_counts() {
    let engine = setup();
    let db = Database::new(
        &engine,
        [
            ("a", Source::from(range(&engine, 10))),
            ("b", Source::from(range(&engine, 20))),
        ],
    )
    .unwrap();

    let out = db
        .run(ops![
            "select count(*) from a union all select count(*) from b",
            Coerce::List
        ])
        .unwrap();
    assert_eq!(
        Some(&[Value::Integer(10), Value::Integer(20)][..]),
        out.as_list()
    );
}

#[test]
fn database_chain_continues_on_result_table() {
    let engine = setup();
    let db = range(&engine, 5).alias("r");
    let out = db
        .run(ops!["select sum(i) as a from r", INCR, Coerce::Int])
        .unwrap();
    assert_eq!(Some(11), out.as_int());
}

#[test]
fn database_rejects_alias_and_coercions() {
    let engine = setup();
    let db = zero(&engine).alias("z");

    let err = db.run(ops!["as other"]).unwrap_err();
    assert!(matches!(err, Error::Engine(_)), "{err}");

    let err = db.run(ops![Coerce::Int]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedStep("int")));
}

#[test]
fn hide_show_round_trip() {
    let engine = setup();
    let t = range(&engine, 3);

    let shown = t.to_string();
    assert_eq!(shown, t.hide().show().to_string());

    let before = engine.query_count();
    assert_eq!("<Table(..., hidden=true)>", t.hide().to_string());
    assert_eq!(before, engine.query_count());

    let db = t.alias("t");
    let before = engine.query_count();
    let hidden = db.hide().to_string();
    assert_eq!(before, engine.query_count());
    assert_eq!("Database:\n    t: <Table(..., hidden=true)>", hidden);
    assert_eq!(db.to_string(), db.hide().show().to_string());
}

#[test]
fn visible_database_render_cost() {
    let engine = setup();
    let db = Database::from_tables(
        &engine,
        [("a", range(&engine, 1)), ("b", range(&engine, 2))],
    );
    let before = engine.query_count();
    db.render().unwrap();
    // One count and one column listing per table.
    assert_eq!(before + 4, engine.query_count());
}

#[test]
fn list_shapes() {
    let engine = setup();

    let grid = Table::from_columns(
        &engine,
        (0..4).map(|c| (c.to_string(), vec![0.0_f64; 17])),
    )
    .unwrap();
    assert_eq!("17 x [0, 1, 2, 3]", grid.rowcols().unwrap());
    let err = grid.run(ops![Coerce::List]).unwrap_err();
    assert!(matches!(err, Error::Shape { rows: 17, columns: 4 }));
    assert!(err.to_string().contains("(17, 4)"));

    let wide = Table::from_columns(&engine, (0..10).map(|c| (format!("c{c}"), vec![c])))
        .unwrap();
    assert_eq!(10, wide.run(ops![Coerce::List]).unwrap().as_list().unwrap().len());

    let tall = range(&engine, 10);
    assert_eq!(10, tall.run(ops![Coerce::List]).unwrap().as_list().unwrap().len());
}

#[test]
fn scalar_and_dict_coercions() {
    let engine = setup();
    let t = Table::from_columns(
        &engine,
        [
            ("n", vec![Value::from(3)]),
            ("s", vec![Value::from("hi")]),
        ],
    )
    .unwrap();

    assert_eq!(Some(3), t.run(ops!["select n", Coerce::Int]).unwrap().as_int());
    assert_eq!(
        Some(3.0),
        t.run(ops!["select n", Coerce::Float]).unwrap().as_float()
    );
    assert_eq!(
        Some("hi"),
        t.run(ops!["select s", Coerce::Str]).unwrap().as_str()
    );
    assert_eq!(
        Some(true),
        t.run(ops!["select n", Coerce::Bool]).unwrap().as_bool()
    );

    let out = t.run(ops![Coerce::Dict]).unwrap();
    let dict = out.as_dict().unwrap();
    assert_eq!(Some(&Value::Integer(3)), dict.get("n"));
    assert_eq!(Some(&Value::from("hi")), dict.get("s"));

    let err = t.run(ops!["select s", Coerce::Int]).unwrap_err();
    assert!(matches!(err, Error::Conversion { target: "int", .. }));
}

#[test]
fn format_tokens() {
    let engine = setup();
    let t = range(&engine, 3);

    match t.run(ops!["arrow"]).unwrap() {
        Output::Materialized(Materialized::Arrow(batch)) => assert_eq!(3, batch.num_rows()),
        other => panic!("unexpected output: {other:?}"),
    }

    let db = t.alias("r");
    match db.run(ops!["pandas"]).unwrap() {
        Output::MaterializedMap(map) => {
            assert_eq!(vec!["r"], map.keys().collect::<Vec<_>>());
            assert_eq!(3, map["r"].num_rows());
        }
        other => panic!("unexpected output: {other:?}"),
    }
}

#[test]
fn terminal_value_stops_chain() {
    let engine = setup();
    let err = zero(&engine)
        .run(ops![Coerce::Int, INCR])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperand("int")));
}

#[test]
fn sql_from_file() {
    let engine = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("incr.sql");
    std::fs::write(&path, "select a + 10 as a\n").unwrap();

    let t = zero(&engine);
    let by_text = t
        .run(ops![path.to_str().unwrap(), Coerce::Int])
        .unwrap();
    assert_eq!(Some(10), by_text.as_int());

    let by_path = t.run(ops![path.as_path(), Coerce::Int]).unwrap();
    assert_eq!(Some(10), by_path.as_int());
}

#[test]
fn database_sql_from_file() {
    let engine = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.sql");
    std::fs::write(
        &path,
        "select count(*) from a\nunion all\nselect count(*) from b\n",
    )
    .unwrap();

    let db = Database::new(
        &engine,
        [
            ("a", Source::from(range(&engine, 10))),
            ("b", Source::from(range(&engine, 20))),
        ],
    )
    .unwrap();
    let expected = [Value::Integer(10), Value::Integer(20)];

    let by_text = db
        .run(ops![path.to_str().unwrap(), Coerce::List])
        .unwrap();
    assert_eq!(Some(&expected[..]), by_text.as_list());

    let by_path = db.run(ops![path.as_path(), Coerce::List]).unwrap();
    assert_eq!(Some(&expected[..]), by_path.as_list());
}

#[test]
fn commented_sql() {
    let engine = setup();
    let t = Table::from_columns(&engine, [("a", vec![1, 2, 3])]).unwrap();
    let count = "select count(*) as n";

    let inline = t
        .run(ops!["select a -- keep a\nwhere a > 1", count, Coerce::Int])
        .unwrap();
    assert_eq!(Some(2), inline.as_int());

    let dir = tempfile::tempdir().unwrap();
    let table_file = dir.path().join("big.sql");
    std::fs::write(
        &table_file,
        "-- keep the big ones\nselect a /* only a */\nwhere a > 1 -- strictly\n",
    )
    .unwrap();
    let out = t
        .run(ops![table_file.as_path(), count, Coerce::Int])
        .unwrap();
    assert_eq!(Some(2), out.as_int());

    let db_file = dir.path().join("total.sql");
    std::fs::write(&db_file, "-- totals\nselect sum(i) as s\nfrom r -- all rows\n").unwrap();
    let out = range(&engine, 5)
        .alias("r")
        .run(ops![db_file.as_path(), Coerce::Int])
        .unwrap();
    assert_eq!(Some(10), out.as_int());
}

#[test]
fn empty_alias_is_rejected() {
    let engine = setup();
    let err = zero(&engine).run(ops!["as  "]).unwrap_err();
    assert!(matches!(err, Error::EmptyAlias(_)), "{err}");
}

#[test]
fn run_database_from_sources() {
    let engine = setup();
    let out = sqlwing::run_database(
        &engine,
        [("a", range(&engine, 10)), ("b", range(&engine, 20))],
        ops![
            "select count(*) from a union all select count(*) from b",
            Coerce::List
        ],
    )
    .unwrap();
    assert_eq!(
        Some(&[Value::Integer(10), Value::Integer(20)][..]),
        out.as_list()
    );
}

#[test]
fn save_and_reload() {
    let engine = setup();
    let t = Table::from_columns(
        &engine,
        [
            ("id", vec![Value::from(1), Value::from(2)]),
            ("name", vec![Value::from("x"), Value::from("y")]),
        ],
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();

    for file in ["out.csv", "out.parquet"] {
        let path = dir.path().join(file);
        t.save(&path).unwrap();
        let reloaded = Table::new(&engine, path.as_path()).unwrap();
        assert_eq!(t.to_string(), reloaded.to_string(), "{file}");
    }

    let err = t.save(dir.path().join("out.xlsx")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn load_unknown_extension() {
    let engine = setup();
    let err = Table::new(&engine, "data.xlsx").unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}
