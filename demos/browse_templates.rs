//! List template categories, search the gallery and show popular picks.
//!
//! ```sh
//! cargo run --example browse_templates -- neon
//! ```

use textvision_client::{ApiClient, ClientConfig, TemplateApi, TemplateQuery};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let keyword = std::env::args().nth(1).unwrap_or_default();
    let api = TemplateApi::new(ApiClient::from_config(&ClientConfig::from_env()?)?);

    let categories = api.categories().await?;
    println!("Categories: {}", categories.join(", "));

    let page = api.search(&keyword, &TemplateQuery::default().page(1, 10)).await?;
    println!("{} templates match {:?}", page.total, keyword);
    for template in &page.records {
        println!("  [{}] {} - {}", template.id, template.title, template.prompt);
        if !template.tags.is_empty() {
            println!("      tags: {}", template.tags.join(", "));
        }
    }

    let popular = api.popular(5).await?;
    println!("Popular:");
    for template in &popular {
        println!("  {} ({} uses)", template.title, template.usage_count);
    }

    Ok(())
}
