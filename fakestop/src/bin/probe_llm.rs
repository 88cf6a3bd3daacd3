use std::sync::Arc;

use fakestop::llm::remote::RemoteLlmProvider;
use fakestop::pipeline::{flatten, investigation_graph, PipelineExecutor};

/// Runs the investigation graph against a live endpoint without touching the database.
#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    let api_key = std::env::var("OPENAI_API_KEY")
        .expect("Set OPENAI_API_KEY environment variable");

    // Allow custom base URL or use OpenAI default
    let base_url = std::env::var("LLM_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());

    let model = std::env::var("LLM_MODEL")
        .unwrap_or_else(|_| "gpt-4o-mini".to_string());

    println!("\n{}", "=".repeat(60));
    println!("Probing LLM provider with the investigation graph");
    println!("Base URL: {}", base_url);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = RemoteLlmProvider::new(&base_url, &api_key, &model)
        .with_defaults(60, 800, 0.7);
    let executor = PipelineExecutor::new(Arc::new(provider));

    let article = std::env::args().nth(1).unwrap_or_else(|| {
        "Local officials confirm the bridge closure will last three weeks.".to_string()
    });

    match executor.execute(&investigation_graph(None), &article).await {
        Ok(run) => {
            println!("✓ Run {} complete", run.run_id);
            for record in flatten(&run) {
                println!("\n[{}] {}", record.stage_label, record.agent_label);
                println!("{}", record.text);
            }
            let usage = run.total_usage();
            println!(
                "\nUsage: {} tokens (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    println!("\n{}", "=".repeat(60));
}
