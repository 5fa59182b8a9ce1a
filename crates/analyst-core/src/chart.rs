use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chart_options;
use crate::query::QueryResult;

/// Title given to artifacts synthesized from data that arrived without a chart
pub const FALLBACK_TITLE: &str = "Query result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [ChartKind::Bar, ChartKind::Line, ChartKind::Pie, ChartKind::Scatter];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chart kind '{s}' (expected bar, line, pie or scatter)"))
    }
}

/// A declarative chart description as produced by the backend.
///
/// `options` is handed to the renderer untouched; this crate only reads and
/// rewrites it when switching kinds without raw rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "option", alias = "options", default)]
    pub options: serde_json::Value,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, options: serde_json::Value) -> Self {
        Self {
            id: format!("chart-{}", uuid::Uuid::new_v4()),
            kind,
            title: title.into(),
            options,
        }
    }
}

/// The chart (and, when available, raw rows) produced by one query turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualArtifact {
    pub id: String,
    pub title: String,
    pub chart_spec: ChartSpec,
    pub query_result: Option<QueryResult>,
    pub active_kind: ChartKind,
}

impl VisualArtifact {
    /// Pair a streamed chart with whatever result was pending when it arrived.
    pub fn from_chart(chart: ChartSpec, query_result: Option<QueryResult>) -> Self {
        Self {
            id: chart.id.clone(),
            title: chart.title.clone(),
            active_kind: chart.kind,
            chart_spec: chart,
            query_result,
        }
    }

    /// Bar chart synthesized for a turn that returned rows but no chart.
    pub fn fallback(result: QueryResult) -> Self {
        let options = chart_options::build(&result, ChartKind::Bar);
        Self {
            id: format!("data-{}", uuid::Uuid::new_v4()),
            title: FALLBACK_TITLE.into(),
            chart_spec: ChartSpec::new(ChartKind::Bar, FALLBACK_TITLE, options),
            query_result: Some(result),
            active_kind: ChartKind::Bar,
        }
    }

    /// Rebuilt from a persisted chart; the rows are gone.
    pub fn from_history(chart: ChartSpec) -> Self {
        Self::from_chart(chart, None)
    }

    /// Change the displayed kind. Returns `false` when `kind` is already active.
    ///
    /// With raw rows the options are rebuilt from scratch; otherwise the
    /// existing options are reshaped, which can lose information.
    pub fn switch_kind(&mut self, kind: ChartKind) -> bool {
        if kind == self.active_kind {
            return false;
        }
        let options = match &self.query_result {
            Some(result) => chart_options::build(result, kind),
            None => chart_options::reshape(&self.chart_spec.options, kind),
        };
        self.chart_spec.kind = kind;
        self.chart_spec.options = options;
        self.active_kind = kind;
        true
    }

    pub fn can_render_table(&self) -> bool {
        self.query_result.is_some()
    }
}
