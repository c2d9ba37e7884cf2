//! # textvision-client
//!
//! Async Rust client for the TextVision text-to-image and text-to-video
//! backend.
//!
//! Provides an HTTP client that unwraps the backend's `{code, message, data}`
//! envelope, typed facades for the content, template and user endpoints,
//! and a [`GenerationStore`] that shows a submit in history immediately and
//! polls the backend until the content is finished.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use textvision_client::{
//!     ApiClient, AuthApi, ClientConfig, ContentApi, FileTokenStore, GenerateRequest,
//!     GenerationStore,
//! };
//!
//! # async fn example() -> textvision_client::Result<()> {
//! let tokens = FileTokenStore::open("auth_token")?;
//! let client = ApiClient::from_config(&ClientConfig::from_env()?)?
//!     .with_token_store(Arc::new(tokens));
//!
//! AuthApi::new(client.clone()).login("me@example.com", "secret").await?;
//!
//! let store = GenerationStore::new(ContentApi::new(client));
//! let request = GenerateRequest::image("a lighthouse in a storm").style("oil painting");
//! request.validate()?;
//!
//! let content = store.generate_content(request).await?;
//!
//! // Wait for the poll to settle the content.
//! let mut updates = store.subscribe();
//! while store.is_polling() {
//!     updates.changed().await.ok();
//! }
//! println!("{} -> {:?}", content.id, store.current_generation().map(|c| c.status));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
mod polling;
pub mod request;
pub mod session;
pub mod store;
pub mod templates;
pub mod token;
pub mod types;

pub use api::{ContentApi, ContentBackend};
pub use auth::AuthApi;
pub use config::{ClientConfig, StoreConfig, SubmitPolicy};
pub use error::{ClientError, Result};
pub use http::ApiClient;
pub use request::{GenerateRequest, ImageParams, VideoParams};
pub use session::AuthSession;
pub use store::{GenerationState, GenerationStore, StatusCheck};
pub use templates::TemplateApi;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{
    ArtStyle, ContentQuery, ContentRecord, ContentStatus, ContentType, GeneratedContent, Page,
    StyleTarget, Template, TemplateQuery, User,
};
