use serde_json::json;

use super::chart::*;
use super::chart_options::*;
use super::config::*;
use super::error::EventParseError;
use super::event::*;
use super::message::*;
use super::query::*;
use super::session::*;

fn sales() -> QueryResult {
    QueryResult::new(
        vec!["product".into(), "sales".into()],
        vec![
            vec![Cell::from("A"), Cell::from(100)],
            vec![Cell::from("B"), Cell::from(50)],
        ],
        "SELECT product, sales FROM t",
    )
}

fn regional() -> QueryResult {
    serde_json::from_value(json!({
        "columns": ["region", "revenue", "cost", "margin"],
        "rows": [["North America", 120.5, "80", null], ["Asia", 90, "n/a", 3]],
        "sql": "SELECT * FROM regions",
    }))
    .unwrap()
}

#[test]
fn test_pie_example() {
    let option = build(&sales(), ChartKind::Pie);
    assert_eq!(
        option["series"][0]["data"],
        json!([{"name": "A", "value": 100}, {"name": "B", "value": 50}])
    );
    assert_eq!(option["series"][0]["type"], "pie");
    assert_eq!(option["tooltip"]["trigger"], "item");
}

#[test]
fn test_bar_example() {
    let option = build(&sales(), ChartKind::Bar);
    let series = option["series"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["name"], "sales");
    assert_eq!(series[0]["type"], "bar");
    assert_eq!(series[0]["data"], json!([100, 50]));
    assert_eq!(series[0]["barMaxWidth"], 40);
    assert_eq!(option["xAxis"]["data"], json!(["A", "B"]));
    assert_eq!(option["xAxis"]["axisLabel"]["rotate"], 0);
    assert!(option.get("legend").is_none());
}

#[test]
fn test_degenerate_input_yields_placeholder() {
    let empty = QueryResult::new(vec!["a".into(), "b".into()], vec![], "");
    let single_column = QueryResult::new(vec!["a".into()], vec![vec![Cell::from(1)]], "");

    for kind in ChartKind::ALL {
        assert_eq!(build(&empty, kind), placeholder());
        assert_eq!(build(&single_column, kind), placeholder());
    }
    assert_eq!(placeholder()["title"]["text"], INSUFFICIENT_DATA);
}

#[test]
fn test_build_is_deterministic() {
    let result = regional();
    for kind in ChartKind::ALL {
        assert_eq!(build(&result, kind), build(&result.clone(), kind));
    }
}

#[test]
fn test_line_series_per_value_column() {
    let option = build(&regional(), ChartKind::Line);
    let series = option["series"].as_array().unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series[0]["name"], "revenue");
    assert_eq!(series[0]["data"], json!([120.5, 90]));
    // Numeric strings parse, anything else coerces to zero
    assert_eq!(series[1]["data"], json!([80, 0]));
    assert_eq!(series[2]["data"], json!([0, 3]));
    assert_eq!(series[0]["smooth"], true);
    assert!(series[0].get("barMaxWidth").is_none());
    assert_eq!(option["legend"]["data"], json!(["revenue", "cost", "margin"]));
    assert_eq!(option["xAxis"]["axisLabel"]["rotate"], 30);
}

#[test]
fn test_scatter_two_columns_uses_row_index() {
    let option = build(&sales(), ChartKind::Scatter);
    assert_eq!(option["series"][0]["data"], json!([[0, 100], [1, 50]]));
    assert_eq!(option["xAxis"]["type"], "category");
    assert_eq!(option["xAxis"]["data"], json!(["A", "B"]));
}

#[test]
fn test_scatter_three_columns_plots_first_two_values() {
    let option = build(&regional(), ChartKind::Scatter);
    assert_eq!(option["series"][0]["data"], json!([[120.5, 80], [90, 0]]));
    assert_eq!(option["xAxis"]["name"], "revenue");
    assert_eq!(option["yAxis"]["name"], "cost");
    assert_eq!(option["series"][0]["symbolSize"], 10);
}

#[test]
fn test_pie_ignores_extra_columns_and_null_labels() {
    let result = QueryResult::new(
        vec!["k".into(), "v".into(), "extra".into()],
        vec![vec![Cell::Null, Cell::from("7"), Cell::from(1)], vec![Cell::from(2024), Cell::Null, Cell::from(2)]],
        "",
    );
    let option = build(&result, ChartKind::Pie);
    assert_eq!(
        option["series"][0]["data"],
        json!([{"name": "", "value": 7}, {"name": "2024", "value": 0}])
    );
}

#[test]
fn test_cell_coercion() {
    assert_eq!(Cell::Null.as_number(), 0.0);
    assert_eq!(Cell::from(" 12.5 ").as_number(), 12.5);
    assert_eq!(Cell::from("").as_number(), 0.0);
    assert_eq!(Cell::from("NaN").as_number(), 0.0);
    assert_eq!(Cell::from("abc").as_number(), 0.0);
    assert_eq!(Cell::from(2.5).label(), "2.5");
    assert_eq!(Cell::from(100).label(), "100");
}

#[test]
fn test_large_integers_stay_integral() {
    for n in [999_999_999_999_999.0, 1e15, 1e18, -4e17] {
        assert_eq!(number_value(n), json!(n as i64), "value {n}");
        assert_eq!(format_number(n), (n as i64).to_string());
    }
    assert_eq!(format_number(1_000_000_000_000_000.0), "1000000000000000");
    assert_eq!(number_value(1e15 + 0.5), json!(1e15 + 0.5));
    assert!(number_value(1e20).is_f64());
}

#[test]
fn test_reshape_bar_to_pie() {
    let bar = build(&sales(), ChartKind::Bar);
    let pie = reshape(&bar, ChartKind::Pie);
    assert_eq!(
        pie["series"][0]["data"],
        json!([{"name": "A", "value": 100}, {"name": "B", "value": 50}])
    );
    assert!(pie.get("xAxis").is_none());
}

#[test]
fn test_reshape_to_pie_names_missing_categories() {
    let option = json!({ "series": [{ "type": "bar", "data": [1, 2] }] });
    let pie = reshape(&option, ChartKind::Pie);
    assert_eq!(
        pie["series"][0]["data"],
        json!([{"name": "Item 0", "value": 1}, {"name": "Item 1", "value": 2}])
    );
}

#[test]
fn test_reshape_pie_to_bar_rebuilds_axis() {
    let pie = build(&sales(), ChartKind::Pie);
    let bar = reshape(&pie, ChartKind::Bar);
    assert_eq!(bar["xAxis"]["data"], json!(["A", "B"]));
    assert_eq!(bar["yAxis"]["type"], "value");
    assert_eq!(bar["series"], json!([{ "type": "bar", "data": [100, 50] }]));
    assert_eq!(bar["tooltip"]["trigger"], "axis");
}

#[test]
fn test_reshape_between_cartesian_kinds_only_retags() {
    let bar = build(&regional(), ChartKind::Bar);
    let line = reshape(&bar, ChartKind::Line);
    let series = line["series"].as_array().unwrap();
    assert_eq!(series.len(), 3);
    for s in series {
        assert_eq!(s["type"], "line");
        assert_eq!(s["smooth"], true);
    }
    assert_eq!(line["xAxis"], bar["xAxis"]);
    assert_eq!(series[0]["data"], bar["series"][0]["data"]);

    let scatter = reshape(&line, ChartKind::Scatter);
    assert_eq!(scatter["series"][1]["type"], "scatter");
    assert_eq!(scatter["series"][1]["data"], bar["series"][1]["data"]);
}

#[test]
fn test_switch_kind_to_current_is_noop() {
    let chart = ChartSpec::new(ChartKind::Bar, "Sales", build(&sales(), ChartKind::Bar));
    let mut artifact = VisualArtifact::from_chart(chart, Some(sales()));
    let before = artifact.clone();
    assert!(!artifact.switch_kind(ChartKind::Bar));
    assert_eq!(artifact, before);
}

#[test]
fn test_switch_kind_round_trip_with_data() {
    let mut artifact = VisualArtifact::fallback(sales());
    let original = artifact.clone();

    assert!(artifact.switch_kind(ChartKind::Pie));
    assert_eq!(artifact.active_kind, ChartKind::Pie);
    assert_eq!(artifact.chart_spec.kind, ChartKind::Pie);
    assert_eq!(artifact.chart_spec.options, build(&sales(), ChartKind::Pie));

    assert!(artifact.switch_kind(ChartKind::Bar));
    assert_eq!(artifact, original);
}

#[test]
fn test_switch_kind_without_data_reshapes() {
    let chart = ChartSpec::new(ChartKind::Bar, "Sales", build(&sales(), ChartKind::Bar));
    let mut artifact = VisualArtifact::from_history(chart);
    assert!(!artifact.can_render_table());

    assert!(artifact.switch_kind(ChartKind::Pie));
    assert_eq!(
        artifact.chart_spec.options["series"][0]["data"],
        json!([{"name": "A", "value": 100}, {"name": "B", "value": 50}])
    );
}

#[test]
fn test_fallback_artifact() {
    let artifact = VisualArtifact::fallback(sales());
    assert!(artifact.id.starts_with("data-"));
    assert!(artifact.chart_spec.id.starts_with("chart-"));
    assert_eq!(artifact.title, FALLBACK_TITLE);
    assert_eq!(artifact.active_kind, ChartKind::Bar);
    assert_eq!(artifact.chart_spec.options, build(&sales(), ChartKind::Bar));
    assert_eq!(artifact.query_result, Some(sales()));
}

#[test]
fn test_chart_kind_parsing() {
    assert_eq!("PIE".parse::<ChartKind>(), Ok(ChartKind::Pie));
    assert_eq!(" line ".parse::<ChartKind>(), Ok(ChartKind::Line));
    assert!("area".parse::<ChartKind>().is_err());
    assert_eq!(ChartKind::Scatter.to_string(), "scatter");
}

#[test]
fn test_parse_text_events() {
    assert_eq!(
        StreamEvent::parse(r#"{"type":"text","content":"Hi"}"#),
        Ok(StreamEvent::Text("Hi".into()))
    );
    assert_eq!(StreamEvent::parse(r#"{"type":"text"}"#), Ok(StreamEvent::Text(String::new())));
    assert_eq!(
        StreamEvent::parse(r#"{"type":"sql","content":"SELECT 1"}"#),
        Ok(StreamEvent::Sql("SELECT 1".into()))
    );
    assert_eq!(
        StreamEvent::parse(r#"{"type":"error","content":"boom"}"#),
        Ok(StreamEvent::Error("boom".into()))
    );
    assert_eq!(StreamEvent::parse(r#"{"type":"done","content":""}"#), Ok(StreamEvent::Done));
}

#[test]
fn test_parse_data_event() {
    let event = StreamEvent::parse(
        r#"{"type":"data","content":{"columns":["product","sales"],"rows":[["A",100],["B",50]],"sql":"SELECT product, sales FROM t"}}"#,
    )
    .unwrap();
    assert_eq!(event, StreamEvent::Data(sales()));
    assert_eq!(event.kind(), "data");
}

#[test]
fn test_parse_chart_event() {
    let event = StreamEvent::parse(
        r#"{"type":"chart","config":{"id":"chart-1","type":"pie","title":"Share","option":{"series":[]}}}"#,
    )
    .unwrap();
    match event {
        StreamEvent::Chart(chart) => {
            assert_eq!(chart.id, "chart-1");
            assert_eq!(chart.kind, ChartKind::Pie);
            assert_eq!(chart.title, "Share");
            assert_eq!(chart.options, json!({"series": []}));
        }
        other => panic!("Expected Chart, got {other:?}"),
    }
}

#[test]
fn test_parse_malformed_events() {
    assert!(matches!(StreamEvent::parse("not json"), Err(EventParseError::Json(_))));
    assert_eq!(
        StreamEvent::parse(r#"{"type":"progress"}"#),
        Err(EventParseError::UnknownType("progress".into()))
    );
    assert!(matches!(
        StreamEvent::parse(r#"{"type":"chart","content":"x"}"#),
        Err(EventParseError::MissingPayload { field: "config", .. })
    ));
    assert!(matches!(
        StreamEvent::parse(r#"{"type":"data","content":"SELECT"}"#),
        Err(EventParseError::Json(_))
    ));
    assert!(StreamEvent::parse(r#"{"type":"chart","config":{"id":"c","type":"area"}}"#).is_err());
}

#[test]
fn test_message_chart_round_trip() {
    let mut msg = Message::new_assistant("s1".into());
    assert_eq!(msg.role, MessageRole::Assistant);
    assert!(msg.chart().is_none());

    let chart = ChartSpec::new(ChartKind::Line, "Trend", json!({"series": []}));
    msg.attach_chart(&chart);
    assert_eq!(msg.chart_ref.as_deref(), Some(chart.id.as_str()));
    assert_eq!(msg.chart(), Some(chart));

    msg.chart_config = Some("{broken".into());
    assert!(msg.chart().is_none());
}

#[test]
fn test_message_sql_and_text() {
    let mut msg = Message::new_assistant("s1".into());
    msg.append_text("Hel");
    msg.append_text("lo");
    assert_eq!(msg.content, "Hello");

    msg.set_sql("SELECT 1");
    assert_eq!(msg.sql_query.as_deref(), Some("SELECT 1"));
    msg.set_sql("");
    assert!(msg.sql_query.is_none());
}

#[test]
fn test_backend_message_deserialization() {
    let msg: Message = serde_json::from_value(json!({
        "id": "msg-1",
        "session_id": "session-1",
        "role": "assistant",
        "content": "Done.",
        "sql_query": "SELECT 1",
        "chart_config": null,
        "created_at": "2026-02-12T08:00:00.123456",
    }))
    .unwrap();
    assert_eq!(msg.role, MessageRole::Assistant);
    assert!(msg.chart_ref.is_none());
    assert_eq!(msg.created_at.to_rfc3339(), "2026-02-12T08:00:00.123456+00:00");
}

#[test]
fn test_session_timestamps() {
    let session: Session = serde_json::from_value(json!({
        "id": "session-1",
        "title": "Sales",
        "created_at": "2026-02-12T08:00:00Z",
        "updated_at": "2026-02-12 08:30:00",
    }))
    .unwrap();
    assert_eq!(session.title, "Sales");
    assert!(session.updated_at > session.created_at);

    assert!(serde_json::from_value::<Session>(json!({
        "id": "x", "title": "t", "created_at": "yesterday", "updated_at": "today",
    }))
    .is_err());
}

#[test]
fn test_session_creation() {
    let session = Session::new("Test session".into());
    assert!(!session.id.is_empty());
    assert_eq!(session.title, "Test session");
    assert_eq!(session.created_at, session.updated_at);
}

#[test]
fn test_config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.api_root(), "http://127.0.0.1:8000/api");
    assert_eq!(config.default_session_title, DEFAULT_SESSION_TITLE);
    assert_eq!(config.stream.idle_timeout_secs, 120);
    assert!(config.validate().is_ok());

    let disabled = StreamConfig { idle_timeout_secs: 0 };
    assert!(disabled.idle_timeout().is_none());
}

#[test]
fn test_zero_request_timeout_means_unbounded() {
    assert_eq!(
        AppConfig::default().request_timeout(),
        Some(std::time::Duration::from_secs(30))
    );
    let unbounded = AppConfig {
        request_timeout_secs: 0,
        ..Default::default()
    };
    assert!(unbounded.validate().is_ok());
    assert!(unbounded.request_timeout().is_none());
}

#[test]
fn test_config_api_root_normalizes_slashes() {
    let config = AppConfig {
        base_url: "https://analyst.example.com/".into(),
        api_prefix: "/v2/".into(),
        ..Default::default()
    };
    assert_eq!(config.api_root(), "https://analyst.example.com/v2");

    let bare = AppConfig {
        api_prefix: String::new(),
        ..Default::default()
    };
    assert_eq!(bare.api_root(), "http://127.0.0.1:8000");
}

#[test]
fn test_load_local_config() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("analyst.json"),
        r#"{"base_url": "http://analyst.internal:9000", "stream": {"idle_timeout_secs": 15}}"#,
    )
    .unwrap();

    let config = load_config(Some(tmp.path().to_path_buf())).unwrap();
    assert_eq!(config.working_dir, tmp.path());
    assert_eq!(config.stream.idle_timeout_secs, 15);
    assert_eq!(config.request_timeout_secs, 30);
    if std::env::var("ANALYST_API_URL").is_err() {
        assert_eq!(config.base_url, "http://analyst.internal:9000");
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("analyst.json"), "{ not json").unwrap();
    assert!(load_config(Some(tmp.path().to_path_buf())).is_err());

    let config = AppConfig {
        base_url: "ftp://example.com".into(),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}
