use analyst_core::backend::TableInfo;
use analyst_core::chart::VisualArtifact;
use analyst_core::error::AnalystError;
use analyst_core::message::{Message, MessageRole};
use analyst_core::query::QueryResult;
use analyst_core::session::Session;
use analyst_engine::{Engine, EngineEvent, TurnReport};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Rows shown by table printing before eliding the rest
const MAX_TABLE_ROWS: usize = 20;

/// Ask `prompt`, rendering progress as it streams. Ctrl-C cancels the turn.
pub async fn stream_turn(
    engine: &mut Engine,
    prompt: &str,
    quiet: bool,
) -> Result<Option<TurnReport>, AnalystError> {
    let rx = engine.subscribe();
    let renderer = tokio::spawn(render_stream(rx, quiet));

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = engine.send_message(prompt, cancel).await;
    watcher.abort();
    engine.unsubscribe();
    let _ = renderer.await;
    result
}

pub async fn render_stream(mut rx: mpsc::UnboundedReceiver<EngineEvent>, quiet: bool) {
    let mut first_content = true;

    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::TurnStarted { .. } => {
                if !quiet {
                    eprint!("\x1b[90mAnalyzing...\x1b[0m");
                    io::stderr().flush().ok();
                }
            }
            EngineEvent::TextDelta { text } => {
                if first_content {
                    if !quiet {
                        eprint!("\r\x1b[K");
                    }
                    first_content = false;
                }
                print!("{text}");
                io::stdout().flush().ok();
            }
            EngineEvent::Sql { sql } => {
                if !quiet && !sql.is_empty() {
                    eprintln!("\n\x1b[36;1m[sql]\x1b[0m \x1b[90m{}\x1b[0m", one_line(&sql));
                }
            }
            EngineEvent::ArtifactAdded { artifact, .. } => {
                eprintln!("\n\x1b[35;1m[chart]\x1b[0m {}", artifact_summary(&artifact));
            }
            EngineEvent::ErrorAnnotation { message } => {
                eprintln!("\n\x1b[31;1m[error]\x1b[0m {message}");
            }
            EngineEvent::TurnFinished { .. } => {}
            EngineEvent::TurnAborted { reason, .. } => {
                if first_content && !quiet {
                    eprint!("\r\x1b[K");
                }
                eprintln!("\n\x1b[31;1m[aborted]\x1b[0m {reason}");
            }
        }
    }

    println!();
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn artifact_summary(artifact: &VisualArtifact) -> String {
    let rows = match &artifact.query_result {
        Some(result) => format!("{} rows", result.rows.len()),
        None => "no raw rows".to_string(),
    };
    format!("{} [{}] ({rows})", artifact.title, artifact.active_kind)
}

pub fn print_sessions(sessions: &[Session], current: Option<&str>) {
    if sessions.is_empty() {
        println!("No sessions.");
        return;
    }
    for s in sessions {
        let marker = if Some(s.id.as_str()) == current { " *" } else { "" };
        println!(
            "  \x1b[90m{}\x1b[0m  {}{}  ({})",
            short_id(&s.id),
            s.title,
            marker,
            s.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

pub fn print_artifacts(artifacts: &[VisualArtifact]) {
    if artifacts.is_empty() {
        println!("No charts in this session.");
        return;
    }
    for (i, artifact) in artifacts.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, artifact_summary(artifact));
    }
}

pub fn print_transcript(messages: &[Message]) {
    for msg in messages {
        match msg.role {
            MessageRole::User => println!("\x1b[32;1m>\x1b[0m {}", msg.content),
            MessageRole::Assistant => {
                println!("{}", msg.content);
                if let Some(sql) = &msg.sql_query {
                    println!("\x1b[90m[sql] {}\x1b[0m", one_line(sql));
                }
            }
        }
    }
}

pub fn print_tables(tables: &[TableInfo]) {
    if tables.is_empty() {
        println!("No tables.");
        return;
    }
    for table in tables {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type))
            .collect();
        println!("  \x1b[1m{}\x1b[0m ({} rows)", table.name, table.row_count);
        println!("    \x1b[90m{}\x1b[0m", columns.join(", "));
    }
}

pub fn print_query_result(result: &QueryResult) {
    print!("{}", format_table(result, MAX_TABLE_ROWS));
    if !result.source_query.is_empty() {
        println!("\x1b[90m[sql] {}\x1b[0m", one_line(&result.source_query));
    }
}

/// Plain-text table with columns padded to their widest cell.
pub fn format_table(result: &QueryResult, max_rows: usize) -> String {
    let shown = result.rows.len().min(max_rows);
    let cells: Vec<Vec<String>> = (0..shown)
        .map(|r| (0..result.columns.len()).map(|c| result.cell(r, c).label()).collect())
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |row: &[String]| -> String {
        row.iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}", w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&render(result.columns.as_slice()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&render(row.as_slice()));
        out.push('\n');
    }
    if result.rows.len() > shown {
        out.push_str(&format!("... {} more rows\n", result.rows.len() - shown));
    }
    out
}
