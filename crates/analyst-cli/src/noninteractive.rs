use analyst_core::message::MessageRole;
use analyst_engine::Engine;
use anyhow::Result;

pub async fn run(
    mut engine: Engine,
    session: Option<String>,
    prompt: String,
    output_format: super::OutputFormat,
    quiet: bool,
) -> Result<()> {
    // Without --session the turn opens a fresh session titled after the prompt
    if let Some(id) = session {
        engine.refresh_sessions().await?;
        engine.select_session(&id).await?;
    }

    match output_format {
        super::OutputFormat::Text => {
            super::output::stream_turn(&mut engine, &prompt, quiet).await?;
        }
        super::OutputFormat::Json => {
            let result = engine
                .send_message(&prompt, tokio_util::sync::CancellationToken::new())
                .await;

            let session_id = engine
                .state()
                .sessions()
                .current_id()
                .unwrap_or_default()
                .to_string();
            let reply = engine
                .transcript(&session_id)
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant)
                .cloned();

            let artifacts = engine.artifacts(&session_id);
            let added = match &result {
                Ok(Some(report)) => report.artifacts_added.min(artifacts.len()),
                _ => 0,
            };

            let mut output = serde_json::json!({
                "session_id": session_id,
                "content": reply.as_ref().map(|m| m.content.clone()).unwrap_or_default(),
                "sql": reply.as_ref().and_then(|m| m.sql_query.clone()),
                "artifacts": &artifacts[artifacts.len() - added..],
            });
            if let Err(e) = result {
                output["error"] = serde_json::json!(e.to_string());
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
