//! Chart option synthesis.
//!
//! [`build`] turns a [`QueryResult`] into an ECharts-style option document for
//! any [`ChartKind`]. Column 0 is the category/label column and every other
//! column is a numeric series. [`reshape`] is the lossy fallback used when the
//! rows are no longer available and only a previously built document is.

use serde_json::{json, Map, Value};

use crate::chart::ChartKind;
use crate::query::{number_value, QueryResult};

/// Text of the placeholder returned for results that cannot be charted
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

/// Category labels longer than this tilt the x-axis labels
const LABEL_ROTATE_THRESHOLD: usize = 4;
const LABEL_ROTATE_DEGREES: i64 = 30;

pub fn placeholder() -> Value {
    json!({ "title": { "text": INSUFFICIENT_DATA } })
}

/// Build renderer options for `result` drawn as `kind`.
///
/// Pure and deterministic. Results with no rows or fewer than two columns
/// yield [`placeholder`] whatever the kind.
pub fn build(result: &QueryResult, kind: ChartKind) -> Value {
    if result.rows.is_empty() || result.columns.len() < 2 {
        return placeholder();
    }

    let categories: Vec<String> = (0..result.rows.len()).map(|r| result.cell(r, 0).label()).collect();

    match kind {
        ChartKind::Pie => build_pie(result, &categories),
        ChartKind::Scatter => build_scatter(result, &categories),
        ChartKind::Bar | ChartKind::Line => build_cartesian(result, &categories, kind),
    }
}

fn column_values(result: &QueryResult, col: usize) -> Vec<Value> {
    (0..result.rows.len())
        .map(|r| number_value(result.cell(r, col).as_number()))
        .collect()
}

fn pie_series(data: Vec<Value>) -> Value {
    json!({
        "type": "pie",
        "radius": ["40%", "70%"],
        "center": ["40%", "50%"],
        "avoidLabelOverlap": false,
        "itemStyle": { "borderRadius": 6, "borderColor": "#fff", "borderWidth": 2 },
        "label": { "show": false },
        "emphasis": { "label": { "show": true, "fontSize": 14, "fontWeight": "bold" } },
        "data": data,
    })
}

fn pie_tooltip() -> Value {
    json!({ "trigger": "item", "formatter": "{b}: {c} ({d}%)" })
}

fn build_pie(result: &QueryResult, categories: &[String]) -> Value {
    let values = column_values(result, 1);
    let data: Vec<Value> = categories
        .iter()
        .zip(values)
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    json!({
        "tooltip": pie_tooltip(),
        "legend": { "orient": "vertical", "right": "5%", "top": "center" },
        "series": [pie_series(data)],
    })
}

fn build_scatter(result: &QueryResult, categories: &[String]) -> Value {
    if result.columns.len() < 3 {
        // Only one value column: plot it against the row position
        let data: Vec<Value> = column_values(result, 1)
            .into_iter()
            .enumerate()
            .map(|(i, y)| json!([i, y]))
            .collect();
        return json!({
            "tooltip": { "trigger": "item" },
            "xAxis": { "type": "category", "data": categories },
            "yAxis": { "type": "value" },
            "series": [{ "type": "scatter", "data": data }],
        });
    }

    let data: Vec<Value> = column_values(result, 1)
        .into_iter()
        .zip(column_values(result, 2))
        .map(|(x, y)| json!([x, y]))
        .collect();
    json!({
        "tooltip": { "trigger": "item" },
        "xAxis": { "type": "value", "name": result.columns[1] },
        "yAxis": { "type": "value", "name": result.columns[2] },
        "series": [{ "type": "scatter", "data": data, "symbolSize": 10 }],
    })
}

fn build_cartesian(result: &QueryResult, categories: &[String], kind: ChartKind) -> Value {
    let value_columns = &result.columns[1..];

    let series: Vec<Value> = value_columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut s = json!({
                "name": name,
                "type": kind.as_str(),
                "data": column_values(result, i + 1),
            });
            match kind {
                ChartKind::Bar => s["barMaxWidth"] = json!(40),
                ChartKind::Line => s["smooth"] = json!(true),
                _ => {}
            }
            s
        })
        .collect();

    let rotate = if categories
        .iter()
        .any(|c| c.chars().count() > LABEL_ROTATE_THRESHOLD)
    {
        LABEL_ROTATE_DEGREES
    } else {
        0
    };

    let mut option = json!({
        "tooltip": { "trigger": "axis" },
        "xAxis": {
            "type": "category",
            "data": categories,
            "axisLabel": { "rotate": rotate },
        },
        "yAxis": { "type": "value" },
        "series": series,
        "grid": { "left": "8%", "right": "4%", "bottom": "15%", "top": "10%" },
    });
    if value_columns.len() > 1 {
        option["legend"] = json!({ "data": value_columns });
    }
    option
}

/// Reshape already-built options to `kind` without the underlying rows.
///
/// Best effort: converting to pie keeps only the first series, and nothing
/// dropped by an earlier conversion can be recovered.
pub fn reshape(options: &Value, kind: ChartKind) -> Value {
    let mut option = options.clone();
    if !option.is_object() {
        option = Value::Object(Map::new());
    }

    let series: Vec<Value> = option
        .get("series")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if kind == ChartKind::Pie {
        let categories: Vec<Value> = option
            .pointer("/xAxis/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let values: Vec<Value> = series
            .first()
            .and_then(|s| s.get("data"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let data: Vec<Value> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let name = categories
                    .get(i)
                    .map(label_of)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("Item {i}"));
                json!({ "name": name, "value": value })
            })
            .collect();

        let mut pie = pie_series(data);
        if let Some(obj) = pie.as_object_mut() {
            // Reshaped pies keep the renderer's default placement
            obj.remove("center");
            obj.remove("avoidLabelOverlap");
        }
        return json!({
            "tooltip": pie_tooltip(),
            "series": [pie],
        });
    }

    let mut series = series;
    for s in series.iter_mut() {
        if let Some(obj) = s.as_object_mut() {
            obj.insert("type".into(), json!(kind.as_str()));
            if kind == ChartKind::Line {
                obj.insert("smooth".into(), json!(true));
            }
        }
    }

    // Coming back from a pie: rebuild the category axis from the slices
    if option.get("xAxis").is_none() && !series.is_empty() {
        let slices: Vec<Value> = series[0]
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let names: Vec<Value> = slices
            .iter()
            .map(|d| d.get("name").cloned().unwrap_or(Value::Null))
            .collect();
        let values: Vec<Value> = slices
            .iter()
            .map(|d| d.get("value").cloned().unwrap_or(Value::Null))
            .collect();

        option["xAxis"] = json!({ "type": "category", "data": names });
        option["yAxis"] = json!({ "type": "value" });
        series[0] = json!({ "type": kind.as_str(), "data": values });
        option["tooltip"] = json!({ "trigger": "axis" });
    }

    option["series"] = Value::Array(series);
    option
}

fn label_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
