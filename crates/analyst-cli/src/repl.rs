use analyst_core::chart::ChartKind;
use analyst_engine::Engine;
use anyhow::{anyhow, bail, Result};
use std::io::{self, Write};
use std::path::Path;

use super::output;

pub async fn run(mut engine: Engine, resume_session: Option<String>) -> Result<()> {
    println!("\x1b[1manalyst\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!("Server: \x1b[36m{}\x1b[0m", engine.config().api_root());
    println!("Type \x1b[33m/help\x1b[0m for commands, \x1b[33mCtrl-D\x1b[0m to exit.\n");

    if let Err(e) = engine.init().await {
        eprintln!("\x1b[31mCould not load sessions: {e}\x1b[0m");
    }
    if let Some(id) = resume_session {
        let id = resolve_session(&engine, &id)?;
        engine.select_session(&id).await?;
        output::print_transcript(engine.transcript(&id));
    }
    if let Some(current) = engine.current_session() {
        println!("Session: \x1b[36m{}\x1b[0m\n", current.title);
    }

    loop {
        eprint!("\x1b[32;1manalyst>\x1b[0m ");
        io::stderr().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                // EOF (Ctrl-D)
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }

        let input = input.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match handle_command(&input, &mut engine).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    eprintln!("\x1b[31mCommand error: {e}\x1b[0m");
                    continue;
                }
            }
        }

        // The turn's own abort notice is already rendered
        if let Err(e) = output::stream_turn(&mut engine, &input, false).await {
            tracing::debug!("turn ended with error: {e}");
        }
    }

    Ok(())
}

async fn handle_command(input: &str, engine: &mut Engine) -> Result<bool> {
    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };

    match command {
        "/help" | "/h" => {
            println!("\x1b[1mCommands:\x1b[0m");
            println!("  /help                 Show this help");
            println!("  /sessions             List sessions");
            println!("  /new [title]          Start a new session");
            println!("  /switch <id>          Switch to a session (id prefix is enough)");
            println!("  /rename <title>       Rename the current session");
            println!("  /delete [id]          Delete a session (default: current)");
            println!("  /charts               List charts of the current session");
            println!("  /kind <n> <kind>      Redraw chart n as bar, line, pie or scatter");
            println!("  /table <n>            Show the rows behind chart n");
            println!("  /tables               List dataset tables");
            println!("  /upload <file> [table] Import a CSV file into the dataset");
            println!("  /exit                 Exit");
            Ok(true)
        }
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            Ok(false)
        }
        "/sessions" | "/s" => {
            engine.refresh_sessions().await?;
            let current = engine.state().sessions().current_id();
            output::print_sessions(engine.state().sessions().list(), current);
            Ok(true)
        }
        "/new" => {
            let title = (!arg.is_empty()).then_some(arg);
            let session = engine.create_session(title).await?;
            println!("Created session \x1b[36m{}\x1b[0m ({})", session.title, output::short_id(&session.id));
            Ok(true)
        }
        "/switch" => {
            if arg.is_empty() {
                bail!("Usage: /switch <id>");
            }
            let id = resolve_session(engine, arg)?;
            engine.select_session(&id).await?;
            output::print_transcript(engine.transcript(&id));
            Ok(true)
        }
        "/rename" => {
            let id = current_session_id(engine)?;
            match engine.rename_session(&id, arg).await? {
                Some(session) => println!("Renamed to \x1b[36m{}\x1b[0m", session.title),
                None => println!("Usage: /rename <title>"),
            }
            Ok(true)
        }
        "/delete" => {
            let id = if arg.is_empty() {
                current_session_id(engine)?
            } else {
                resolve_session(engine, arg)?
            };
            engine.delete_session(&id).await?;
            println!("Session deleted.");
            if let Some(current) = engine.current_session() {
                println!("Now in \x1b[36m{}\x1b[0m", current.title);
            }
            Ok(true)
        }
        "/charts" => {
            let id = current_session_id(engine)?;
            output::print_artifacts(engine.artifacts(&id));
            Ok(true)
        }
        "/kind" => {
            let (index, kind) = arg
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("Usage: /kind <n> <bar|line|pie|scatter>"))?;
            let kind: ChartKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let id = current_session_id(engine)?;
            let artifact_id = artifact_at(engine, &id, index)?;
            if engine.switch_artifact_kind(&id, &artifact_id, kind) {
                if let Some(artifact) = engine.state().artifacts().get(&id, &artifact_id) {
                    println!("{}", output::artifact_summary(artifact));
                }
            } else {
                println!("Already drawn as {kind}.");
            }
            Ok(true)
        }
        "/table" => {
            let id = current_session_id(engine)?;
            let artifact_id = artifact_at(engine, &id, arg)?;
            match engine
                .state()
                .artifacts()
                .get(&id, &artifact_id)
                .and_then(|a| a.query_result.as_ref())
            {
                Some(result) => output::print_query_result(result),
                None => println!("No rows for this chart (restored from history)."),
            }
            Ok(true)
        }
        "/upload" => {
            let (file, table) = match arg.split_once(char::is_whitespace) {
                Some((file, table)) => (file, Some(table.trim())),
                None => (arg, None),
            };
            if file.is_empty() {
                bail!("Usage: /upload <file.csv> [table]");
            }
            let uploaded = engine.upload_csv(Path::new(file), table).await?;
            println!(
                "Imported \x1b[36m{}\x1b[0m rows into \x1b[1m{}\x1b[0m",
                uploaded.rows_inserted, uploaded.table_name
            );
            Ok(true)
        }
        "/tables" => {
            let tables = engine.list_tables().await?;
            output::print_tables(&tables);
            Ok(true)
        }
        _ => {
            eprintln!("Unknown command: {input}. Type /help for available commands.");
            Ok(true)
        }
    }
}

fn current_session_id(engine: &Engine) -> Result<String> {
    engine
        .state()
        .sessions()
        .current_id()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No session selected. Use /new or /switch."))
}

/// Exact id, or a prefix matching exactly one session.
fn resolve_session(engine: &Engine, prefix: &str) -> Result<String> {
    let sessions = engine.state().sessions().list();
    if let Some(s) = sessions.iter().find(|s| s.id == prefix) {
        return Ok(s.id.clone());
    }
    let matches: Vec<&str> = sessions
        .iter()
        .filter(|s| s.id.starts_with(prefix))
        .map(|s| s.id.as_str())
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => bail!("No session matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} sessions", matches.len()),
    }
}

/// Id of the 1-based `index`-th chart of a session.
fn artifact_at(engine: &Engine, session_id: &str, index: &str) -> Result<String> {
    let artifacts = engine.artifacts(session_id);
    let n: usize = index
        .trim()
        .parse()
        .map_err(|_| anyhow!("Chart number expected, got '{index}'"))?;
    n.checked_sub(1)
        .and_then(|i| artifacts.get(i))
        .map(|a| a.id.clone())
        .ok_or_else(|| anyhow!("No chart #{n} (this session has {})", artifacts.len()))
}
