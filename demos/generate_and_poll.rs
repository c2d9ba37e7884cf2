//! Submit one image generation and follow it until it finishes.
//!
//! Requires a running backend (see `TEXTVISION_API_BASE_URL`) and a saved
//! login token.
//!
//! ```sh
//! RUST_LOG=textvision_client=debug cargo run --example generate_and_poll -- "a red fox in the snow"
//! ```

use std::sync::Arc;

use anyhow::Context;
use textvision_client::{
    ApiClient, ClientConfig, ContentApi, ContentStatus, FileTokenStore, GenerateRequest,
    GenerationStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a red fox in the snow".to_string());

    let token_path = FileTokenStore::default_location().context("no config directory")?;
    let tokens = FileTokenStore::open(token_path)?;
    let client = ApiClient::from_config(&ClientConfig::from_env()?)?.with_token_store(Arc::new(tokens));
    let store = GenerationStore::new(ContentApi::new(client));

    let request = GenerateRequest::image(prompt).size("square_1_1");
    request.validate()?;

    let pending = store.generate_content(request);
    println!("Placeholder: {}", store.history()[0].id);

    let content = pending.await?;
    println!("Accepted as {} ({:?})", content.id, content.status);

    let mut updates = store.subscribe();
    while store.is_polling() {
        updates.changed().await?;
        if let Some(current) = updates.borrow_and_update().current_generation.as_ref() {
            println!("  status: {:?}", current.status);
        }
    }

    match store.current_generation() {
        Some(done) if done.status == ContentStatus::Completed => {
            for url in &done.urls {
                println!("Ready: {}", url);
            }
        }
        Some(done) => println!(
            "Finished as {:?}: {}",
            done.status,
            done.error_message.as_deref().unwrap_or("no details")
        ),
        None => println!("Generation is no longer tracked"),
    }

    Ok(())
}
