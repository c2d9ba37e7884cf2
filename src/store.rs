//! Generation history with optimistic placeholders and status polling.
//!
//! A submit inserts a `temp-` placeholder at the top of history right away,
//! swaps it for the backend's record once the request is accepted, and, if
//! the backend is still working on it, polls until the content reaches a
//! terminal status.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{require_id, ContentBackend};
use crate::config::{StoreConfig, SubmitPolicy};
use crate::error::{ClientError, Result};
use crate::polling::{self, ActivePoll};
use crate::request::GenerateRequest;
use crate::types::{
    ContentQuery, ContentStatus, ContentType, GeneratedContent, DEFAULT_SIZE, PLACEHOLDER_PREFIX,
};

/// Snapshot of everything the store tracks.
#[derive(Debug, Clone, Default)]
pub struct GenerationState {
    /// Newest first.
    pub history: Vec<GeneratedContent>,
    pub is_generating: bool,
    pub current_generation: Option<GeneratedContent>,
    pub is_loading_history: bool,
    /// Content id the active poll is watching.
    pub polling: Option<String>,
    in_flight: Vec<InFlight>,
}

/// A submit that has not settled, with the entries its placeholder pushed
/// out of history.
#[derive(Debug, Clone)]
struct InFlight {
    placeholder_id: String,
    evicted: Vec<GeneratedContent>,
}

/// Result of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusCheck {
    /// Still being generated; polling continues.
    Pending(GeneratedContent),
    /// Reached `Completed` or `Failed`.
    Finished(GeneratedContent),
    /// The content is no longer the current generation; nothing was updated.
    Untracked,
}

struct StoreInner<B> {
    backend: B,
    config: StoreConfig,
    state: watch::Sender<GenerationState>,
    poll: Mutex<Option<ActivePoll>>,
    next_epoch: AtomicU64,
}

/// Owns generation history and drives the submit → confirm → poll cycle.
///
/// Cheap to clone; clones share state. Polling runs as a Tokio task, so
/// the store must be used from within a Tokio runtime.
///
/// # Example
/// ```no_run
/// use textvision_client::{ApiClient, ContentApi, GenerateRequest, GenerationStore};
///
/// # async fn example() -> textvision_client::Result<()> {
/// let store = GenerationStore::new(ContentApi::new(ApiClient::new("http://127.0.0.1:8999/api")));
///
/// let pending = store.generate_content(GenerateRequest::image("a red fox"));
/// assert!(store.history()[0].is_placeholder());
///
/// let confirmed = pending.await?;
/// println!("{} is {:?}", confirmed.id, confirmed.status);
/// # Ok(())
/// # }
/// ```
pub struct GenerationStore<B> {
    inner: Arc<StoreInner<B>>,
}

impl<B> Clone for GenerationStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for GenerationStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStore")
            .field("config", &self.inner.config)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl<B: ContentBackend + 'static> GenerationStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        let (state, _) = watch::channel(GenerationState::default());
        Self {
            inner: Arc::new(StoreInner {
                backend,
                config,
                state,
                poll: Mutex::new(None),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> GenerationState {
        self.inner.state.borrow().clone()
    }

    pub fn history(&self) -> Vec<GeneratedContent> {
        self.inner.state.borrow().history.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.state.borrow().is_generating
    }

    pub fn current_generation(&self) -> Option<GeneratedContent> {
        self.inner.state.borrow().current_generation.clone()
    }

    pub fn is_loading_history(&self) -> bool {
        self.inner.state.borrow().is_loading_history
    }

    /// Id of the content being polled, if a poll is active.
    pub fn polling_target(&self) -> Option<String> {
        self.inner.lock_poll().as_ref().map(|p| p.content_id.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.inner.lock_poll().is_some()
    }

    /// Receive a fresh [`GenerationState`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.inner.state.subscribe()
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Submit a generation.
    ///
    /// The placeholder is inserted before this method returns; the returned
    /// future performs the request. On success the placeholder is replaced
    /// by the backend's record and, for unfinished content, polling starts.
    /// On failure the placeholder is removed and the error returned. Dropping
    /// the future before it completes also removes the placeholder.
    ///
    /// With [`SubmitPolicy::Reject`] a submit while another is in flight
    /// resolves to [`ClientError::GenerationInFlight`] without touching state.
    pub fn generate_content(
        &self,
        request: GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedContent>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let begun = inner.begin(&request).map(|placeholder| {
            let guard = PlaceholderGuard {
                inner: Arc::clone(&inner),
                id: placeholder.id.clone(),
                armed: true,
            };
            (placeholder, guard)
        });

        async move {
            let (placeholder, guard) = begun?;
            StoreInner::submit(inner, placeholder, guard, request).await
        }
    }

    // ── History ─────────────────────────────────────────────────────

    /// Load one page of persisted history. Page 1 replaces the in-memory
    /// list, later pages append to it. Returns the number of records loaded.
    pub async fn load_history(
        &self,
        page: u32,
        size: u32,
        content_type: Option<ContentType>,
    ) -> Result<usize> {
        let query = ContentQuery {
            page: page.max(1),
            size: size.max(1),
            content_type,
        };
        self.inner.state.send_modify(|s| s.is_loading_history = true);

        match self.inner.backend.contents(&query).await {
            Ok(page) => {
                let items: Vec<GeneratedContent> = page
                    .records
                    .into_iter()
                    .map(|r| GeneratedContent::from_record(r, None, ContentStatus::Completed))
                    .collect();
                let loaded = items.len();
                self.inner.state.send_modify(|s| {
                    if query.page == 1 {
                        s.history = items;
                    } else {
                        s.history.extend(items);
                    }
                    s.is_loading_history = false;
                });
                debug!(page = query.page, loaded, "history page loaded");
                Ok(loaded)
            }
            Err(e) => {
                self.inner.state.send_modify(|s| s.is_loading_history = false);
                warn!(error = %e, "failed to load history");
                Err(e)
            }
        }
    }

    /// Reload the first page with the default page size.
    pub async fn refresh_history(&self) -> Result<usize> {
        self.load_history(1, 20, None).await
    }

    /// Put an item at the top of history, replacing any entry with the same id.
    pub fn add_to_history(&self, content: GeneratedContent) {
        let cap = self.inner.config.history_cap;
        self.inner.state.send_modify(|s| {
            s.history.retain(|item| item.id != content.id);
            s.history.insert(0, content);
            s.history.truncate(cap);
        });
    }

    /// Remove one entry locally. Returns whether anything was removed.
    pub fn remove_from_history(&self, id: &str) -> bool {
        self.inner.state.send_if_modified(|s| {
            let before = s.history.len();
            s.history.retain(|item| item.id != id);
            s.history.len() != before
        })
    }

    /// Drop all local history.
    pub fn clear_history(&self) {
        self.inner.state.send_if_modified(|s| {
            let changed = !s.history.is_empty();
            s.history.clear();
            changed
        });
    }

    // ── Polling ─────────────────────────────────────────────────────

    /// Check `content_id` every poll interval until it finishes. Replaces
    /// any poll already running.
    pub fn start_polling(&self, content_id: impl Into<String>) {
        StoreInner::start_polling(&self.inner, content_id.into());
    }

    /// Stop the active poll. Does nothing when none is running.
    pub fn stop_polling(&self) {
        self.inner.stop_polling();
    }

    /// Fetch `content_id` once and reconcile it into state. Stops a poll on
    /// that id when the content is finished, untracked, or the fetch fails.
    pub async fn check_generation_status(&self, content_id: &str) -> Result<StatusCheck> {
        let result = self.inner.check_status(content_id).await;
        if !matches!(result, Ok(StatusCheck::Pending(_))) {
            self.inner.stop_polling_for(content_id);
        }
        result
    }
}

impl<B> StoreInner<B> {
    fn lock_poll(&self) -> MutexGuard<'_, Option<ActivePoll>> {
        self.poll.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Synchronous half of a submit: insert the placeholder.
    fn begin(&self, request: &GenerateRequest) -> Result<GeneratedContent> {
        let policy = self.config.submit_policy;
        let cap = self.config.history_cap;
        let mut placeholder = None;

        self.state.send_if_modified(|s| {
            if policy == SubmitPolicy::Reject && !s.in_flight.is_empty() {
                return false;
            }

            let now = Utc::now();
            let mut stamp = now.timestamp_millis();
            let taken = |id: &str| {
                s.in_flight.iter().any(|p| p.placeholder_id == id)
                    || s.history.iter().any(|h| h.id == id)
            };
            while taken(&format!("{}{}", PLACEHOLDER_PREFIX, stamp)) {
                stamp += 1;
            }

            let item = GeneratedContent {
                id: format!("{}{}", PLACEHOLDER_PREFIX, stamp),
                content_type: request.content_type,
                prompt: request.prompt.clone(),
                url: None,
                urls: Vec::new(),
                thumbnail: None,
                thumbnails: Vec::new(),
                status: ContentStatus::Generating,
                created_at: now,
                size: request.size.clone().unwrap_or_else(|| DEFAULT_SIZE.to_string()),
                style: request.style.clone(),
                reference_image: request.reference_image.clone(),
                template_id: request.template_id,
                error_message: None,
            };

            s.history.insert(0, item.clone());
            let evicted = if s.history.len() > cap {
                s.history.split_off(cap)
            } else {
                Vec::new()
            };
            s.in_flight.push(InFlight {
                placeholder_id: item.id.clone(),
                evicted,
            });
            s.is_generating = true;
            s.current_generation = Some(item.clone());
            placeholder = Some(item);
            true
        });

        match placeholder {
            Some(item) => {
                debug!(id = %item.id, "placeholder inserted");
                Ok(item)
            }
            None => {
                debug!("submit rejected, a generation is already in flight");
                Err(ClientError::GenerationInFlight)
            }
        }
    }

    /// Swap the placeholder for the confirmed record.
    fn confirm(&self, placeholder_id: &str, confirmed: &GeneratedContent) {
        let cap = self.config.history_cap;
        self.state.send_modify(|s| {
            s.in_flight.retain(|p| p.placeholder_id != placeholder_id);
            s.history
                .retain(|item| item.id != placeholder_id && item.id != confirmed.id);
            s.history.insert(0, confirmed.clone());
            s.history.truncate(cap);
            s.is_generating = !s.in_flight.is_empty();
            s.current_generation = Some(confirmed.clone());
        });
    }

    /// Undo a submit: drop its placeholder along with any placeholder whose
    /// request is no longer in flight, then put back what the placeholder
    /// pushed out of history.
    fn rollback(&self, placeholder_id: &str) {
        let cap = self.config.history_cap;
        self.state.send_modify(|s| {
            let evicted = match s
                .in_flight
                .iter()
                .position(|p| p.placeholder_id == placeholder_id)
            {
                Some(index) => s.in_flight.remove(index).evicted,
                None => Vec::new(),
            };

            let in_flight = &s.in_flight;
            let orphaned = |item: &GeneratedContent| {
                item.is_placeholder() && !in_flight.iter().any(|p| p.placeholder_id == item.id)
            };
            s.history.retain(|item| !orphaned(item));
            if s.current_generation.as_ref().is_some_and(orphaned) {
                s.current_generation = None;
            }

            for item in evicted {
                if s.history.len() >= cap {
                    break;
                }
                if !s.history.iter().any(|h| h.id == item.id) {
                    s.history.push(item);
                }
            }
            s.is_generating = !s.in_flight.is_empty();
        });
    }

    fn stop_polling(&self) {
        let mut slot = self.lock_poll();
        if let Some(poll) = slot.take() {
            debug!(content_id = %poll.content_id, "polling stopped");
            drop(poll);
            self.state.send_if_modified(|s| s.polling.take().is_some());
        }
    }

    fn stop_polling_for(&self, content_id: &str) {
        let mut slot = self.lock_poll();
        if slot.as_ref().is_some_and(|p| p.content_id == content_id) {
            slot.take();
            self.state.send_if_modified(|s| s.polling.take().is_some());
            debug!(content_id, "polling stopped");
        }
    }

    /// Called by a poll task that is done; only clears its own slot.
    fn release_poll(&self, epoch: u64) {
        let mut slot = self.lock_poll();
        if slot.as_ref().is_some_and(|p| p.epoch == epoch) {
            slot.take();
            self.state.send_if_modified(|s| s.polling.take().is_some());
        }
    }
}

impl<B: ContentBackend + 'static> StoreInner<B> {
    /// Asynchronous half of a submit.
    async fn submit(
        inner: Arc<Self>,
        placeholder: GeneratedContent,
        mut guard: PlaceholderGuard<B>,
        request: GenerateRequest,
    ) -> Result<GeneratedContent> {
        info!(
            placeholder = %placeholder.id,
            kind = request.content_type.as_str(),
            "submitting generation"
        );
        let outcome = inner.backend.generate(&request).await.and_then(require_id);
        guard.armed = false;

        match outcome {
            Ok(mut record) => {
                record.status.get_or_insert(ContentStatus::Processing);
                let confirmed =
                    GeneratedContent::from_record(record, Some(&placeholder), ContentStatus::Processing);
                inner.confirm(&placeholder.id, &confirmed);
                info!(id = %confirmed.id, status = ?confirmed.status, "generation confirmed");

                if !confirmed.status.is_terminal() {
                    Self::start_polling(&inner, confirmed.id.clone());
                }
                Ok(confirmed)
            }
            Err(e) => {
                inner.rollback(&placeholder.id);
                warn!(placeholder = %placeholder.id, error = %e, "generation submit failed");
                Err(e)
            }
        }
    }

    fn start_polling(inner: &Arc<Self>, content_id: String) {
        let epoch = inner.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let weak = Arc::downgrade(inner);
        let target = content_id.clone();

        let mut slot = inner.lock_poll();
        if let Some(previous) = slot.take() {
            debug!(content_id = %previous.content_id, "replacing active poll");
        }

        let task = tokio::spawn(polling::run_every(
            inner.config.poll_interval,
            token.clone(),
            move || {
                let weak = weak.clone();
                let target = target.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => inner.poll_tick(&target, epoch).await,
                        None => ControlFlow::Break(()),
                    }
                }
            },
        ));

        *slot = Some(ActivePoll::new(epoch, content_id.clone(), token, task));
        debug!(content_id = %content_id, interval = ?inner.config.poll_interval, "polling started");
        inner.state.send_modify(|s| s.polling = Some(content_id));
    }

    async fn poll_tick(&self, content_id: &str, epoch: u64) -> ControlFlow<()> {
        match self.check_status(content_id).await {
            Ok(StatusCheck::Pending(_)) => ControlFlow::Continue(()),
            Ok(StatusCheck::Finished(content)) => {
                info!(id = %content.id, status = ?content.status, "generation finished");
                self.release_poll(epoch);
                ControlFlow::Break(())
            }
            Ok(StatusCheck::Untracked) => {
                debug!(content_id, "content no longer current, polling stopped");
                self.release_poll(epoch);
                ControlFlow::Break(())
            }
            Err(e) => {
                warn!(content_id, error = %e, "status check failed, polling stopped");
                self.release_poll(epoch);
                ControlFlow::Break(())
            }
        }
    }

    async fn check_status(&self, content_id: &str) -> Result<StatusCheck> {
        let record = self.backend.content(content_id).await?;
        let mut outcome = StatusCheck::Untracked;

        self.state.send_if_modified(|s| {
            let Some(current) = s.current_generation.as_ref().filter(|c| c.id == content_id) else {
                return false;
            };

            let mut updated =
                GeneratedContent::from_record(record, Some(current), ContentStatus::Processing);
            updated.id = content_id.to_string();
            if current.status.is_terminal() && !updated.status.is_terminal() {
                updated.status = current.status;
                updated.error_message = current.error_message.clone();
            }

            for item in s.history.iter_mut().filter(|item| item.id == content_id) {
                *item = updated.clone();
            }
            s.current_generation = Some(updated.clone());

            outcome = if updated.status.is_terminal() {
                StatusCheck::Finished(updated)
            } else {
                StatusCheck::Pending(updated)
            };
            true
        });

        Ok(outcome)
    }
}

/// Removes a placeholder if its submit future is dropped before settling.
struct PlaceholderGuard<B> {
    inner: Arc<StoreInner<B>>,
    id: String,
    armed: bool,
}

impl<B> Drop for PlaceholderGuard<B> {
    fn drop(&mut self) {
        if self.armed {
            debug!(id = %self.id, "submit abandoned, removing placeholder");
            self.inner.rollback(&self.id);
        }
    }
}
