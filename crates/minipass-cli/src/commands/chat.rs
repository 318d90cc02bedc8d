//! Analytics chatbot command

use anyhow::{bail, Result};

use minipass_core::{AiClient, ChatEngine, Database};

pub async fn cmd_chat(db: &Database, question: &str) -> Result<()> {
    let Some(ai) = AiClient::from_env() else {
        bail!("Chatbot not configured (set OLLAMA_HOST, or AI_BACKEND=mock for testing)");
    };

    let engine = ChatEngine::new(db.clone(), ai);
    let answer = engine.ask(question).await?;

    println!();
    println!("❓ {} [{}]", answer.question, answer.language);
    println!("🧮 {}", answer.sql);
    println!();

    if answer.rows.is_empty() {
        println!("   (no rows)");
        return Ok(());
    }

    // Column headers then one line per row
    println!("  {}", answer.columns.join(" | "));
    for row in &answer.rows {
        let line: Vec<String> = answer
            .columns
            .iter()
            .map(|col| match row.get(col) {
                Some(serde_json::Value::Null) | None => "-".to_string(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        println!("  {}", line.join(" | "));
    }
    println!();
    println!("  {} row(s) in {} ms", answer.row_count, answer.duration_ms);
    Ok(())
}
