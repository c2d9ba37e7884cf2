
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use test_helpers::*;
use textvision_client::*;
use tokio::sync::Notify;

fn fox() -> GenerateRequest {
    GenerateRequest::image("a red fox")
}

fn assert_history_invariants<B: ContentBackend + 'static>(store: &GenerationStore<B>) {
    let history = store.history();
    assert!(history.len() <= 4, "history grew to {}", history.len());
    let ids: HashSet<_> = history.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), history.len(), "duplicate ids in {:?}", ids);
}

fn ids<B: ContentBackend + 'static>(store: &GenerationStore<B>) -> Vec<String> {
    store.history().into_iter().map(|c| c.id).collect()
}

// ── Submit ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_placeholder_inserted_synchronously() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Completed)))),
    );

    let pending = store.generate_content(fox().size("square_1_1"));

    let history = store.history();
    assert_eq!(history.len(), 1);
    assert!(history[0].id.starts_with("temp-"));
    assert_eq!(history[0].status, ContentStatus::Generating);
    assert_eq!(history[0].prompt, "a red fox");
    assert_eq!(history[0].size, "square_1_1");
    assert!(store.is_generating());
    assert_eq!(store.current_generation().map(|c| c.id), Some(history[0].id.clone()));

    pending.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_processing_starts_polling() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Processing)))),
    );

    let confirmed = store.generate_content(fox()).await.unwrap();

    assert_eq!(confirmed.id, "abc123");
    assert_eq!(store.history()[0].id, "abc123");
    assert_eq!(store.history().len(), 1);
    assert!(!store.is_generating());
    assert!(store.is_polling());
    assert_eq!(store.polling_target().as_deref(), Some("abc123"));
    assert_eq!(store.snapshot().polling.as_deref(), Some("abc123"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_status_defaults_to_processing() {
    let store = GenerationStore::new(FakeBackend::new().on_generate(Ok(record("abc123", None))));

    let confirmed = store.generate_content(fox()).await.unwrap();

    assert_eq!(confirmed.status, ContentStatus::Processing);
    assert!(store.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_completed_on_submit_does_not_poll() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(completed("abc123", "http://x/1.png"))),
    );

    let confirmed = store.generate_content(fox()).await.unwrap();

    assert_eq!(confirmed.status, ContentStatus::Completed);
    assert_eq!(confirmed.urls, vec!["http://x/1.png".to_string()]);
    assert!(!store.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_restores_history() {
    let store = GenerationStore::new(FakeBackend::new());
    store.add_to_history(GeneratedContent::from_record(
        completed("old", "http://x/old.png"),
        None,
        ContentStatus::Completed,
    ));
    let before = store.history();

    let err = store.generate_content(fox()).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
    assert_eq!(store.history(), before);
    assert!(!store.is_generating());
    assert!(store.current_generation().is_none());
    assert!(!store.is_polling());
}

fn full_history() -> FakeBackend {
    FakeBackend::new().on_contents(Ok(page(vec![
        completed("c3", "http://x/3.png"),
        completed("c2", "http://x/2.png"),
        completed("c1", "http://x/1.png"),
        completed("c0", "http://x/0.png"),
    ])))
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_restores_full_history() {
    let store = GenerationStore::new(full_history());
    store.load_history(1, 4, None).await.unwrap();
    let before = store.history();

    let pending = store.generate_content(fox());
    assert_eq!(ids(&store)[1..], ["c3", "c2", "c1"]);

    assert!(pending.await.is_err());
    assert_eq!(store.history(), before);
    assert!(!store.is_generating());
    assert!(store.current_generation().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_submit_restores_full_history() {
    let store = GenerationStore::new(full_history());
    store.load_history(1, 4, None).await.unwrap();
    let before = store.history();

    drop(store.generate_content(fox()));

    assert_eq!(store.history(), before);
    assert!(!store.is_generating());
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_submit_keeps_eviction() {
    let store = GenerationStore::new(
        full_history().on_generate(Ok(record("new", Some(ContentStatus::Completed)))),
    );
    store.load_history(1, 4, None).await.unwrap();

    store.generate_content(fox()).await.unwrap();

    assert_eq!(ids(&store), vec!["new", "c3", "c2", "c1"]);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_without_id_rolls_back() {
    let store = GenerationStore::new(FakeBackend::new().on_generate(Ok(ContentRecord {
        status: Some(ContentStatus::Processing),
        ..Default::default()
    })));

    let err = store.generate_content(fox()).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
    assert!(store.history().is_empty());
    assert!(!store.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_reject_policy_refuses_second_submit() {
    let gate = Arc::new(Notify::new());
    let store = GenerationStore::new(
        FakeBackend::gated(Arc::clone(&gate))
            .on_generate(Ok(record("first", Some(ContentStatus::Completed)))),
    );

    let first = tokio::spawn(store.generate_content(fox()));
    let err = store
        .generate_content(GenerateRequest::image("a blue whale"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::GenerationInFlight));
    assert_eq!(store.history().len(), 1);
    assert!(store.is_generating());

    gate.notify_one();
    first.await.unwrap().unwrap();

    assert_eq!(ids(&store), vec!["first"]);
    assert!(!store.is_generating());
    assert_eq!(store.backend().generate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_allow_policy_settles_both_submits() {
    let gate = Arc::new(Notify::new());
    let backend = FakeBackend::gated(Arc::clone(&gate))
        .on_generate(Ok(record("one", Some(ContentStatus::Completed))))
        .on_generate(Ok(record("two", Some(ContentStatus::Completed))));
    let store = GenerationStore::with_config(
        backend,
        StoreConfig::default().with_submit_policy(SubmitPolicy::Allow),
    );

    let a = tokio::spawn(store.generate_content(fox()));
    let b = tokio::spawn(store.generate_content(GenerateRequest::image("a blue whale")));
    assert_eq!(store.history().len(), 2);
    assert!(store.history().iter().all(|c| c.is_placeholder()));

    tokio::time::sleep(Duration::from_millis(10)).await;
    gate.notify_one();
    gate.notify_one();
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let mut settled = ids(&store);
    settled.sort();
    assert_eq!(settled, vec!["one", "two"]);
    assert!(!store.is_generating());
    assert_history_invariants(&store);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_submit_removes_placeholder() {
    let gate = Arc::new(Notify::new());
    let store = GenerationStore::new(FakeBackend::gated(gate));

    let pending = store.generate_content(fox());
    assert_eq!(store.history().len(), 1);

    drop(pending);

    assert!(store.history().is_empty());
    assert!(!store.is_generating());
    assert!(store.current_generation().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_history_capped_and_newest_first() {
    let mut backend = FakeBackend::new();
    for i in 0..6 {
        backend = backend.on_generate(Ok(record(&format!("c{}", i), Some(ContentStatus::Completed))));
    }
    let store = GenerationStore::new(backend);

    for _ in 0..6 {
        let pending = store.generate_content(fox());
        assert_history_invariants(&store);
        assert!(store.history()[0].is_placeholder());
        pending.await.unwrap();
        assert_history_invariants(&store);
    }

    assert_eq!(ids(&store), vec!["c5", "c4", "c3", "c2"]);
    assert!(store.history().iter().all(|c| !c.is_placeholder()));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_confirmed_id_kept_once() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("same", Some(ContentStatus::Completed))))
            .on_generate(Ok(record("same", Some(ContentStatus::Completed)))),
    );

    store.generate_content(fox()).await.unwrap();
    store.generate_content(fox()).await.unwrap();

    assert_eq!(ids(&store), vec!["same"]);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_keep_invariants() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("a", Some(ContentStatus::Completed))))
            .on_generate(Err(backend_error()))
            .on_generate(Ok(record("b", Some(ContentStatus::Failed))))
            .on_generate(Err(backend_error())),
    );

    for _ in 0..4 {
        let _ = store.generate_content(fox()).await;
        assert_history_invariants(&store);
        assert!(store.history().iter().all(|c| !c.is_placeholder()));
    }

    assert_eq!(ids(&store), vec!["b", "a"]);
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_poll_completes_and_stops() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("abc123", Some(ContentStatus::Processing))))
            .on_content(Ok(ContentRecord {
                urls: Some(vec!["http://x/1.png".to_string()]),
                ..record("abc123", Some(ContentStatus::Completed))
            })),
    );

    store.generate_content(fox()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let head = &store.history()[0];
    assert_eq!(head.id, "abc123");
    assert_eq!(head.status, ContentStatus::Completed);
    assert_eq!(head.urls, vec!["http://x/1.png".to_string()]);
    assert_eq!(store.current_generation().unwrap().status, ContentStatus::Completed);
    assert!(!store.is_polling());
    assert!(store.snapshot().polling.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_poll_runs_every_interval() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("abc123", Some(ContentStatus::Processing))))
            .on_content(Ok(record("abc123", Some(ContentStatus::Processing))))
            .on_content(Ok(completed("abc123", "http://x/1.png"))),
    );

    store.generate_content(fox()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(store.backend().content_calls(), 1);
    assert!(store.is_polling());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(store.backend().content_calls(), 2);
    assert_eq!(store.history()[0].status, ContentStatus::Completed);
    assert!(!store.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_reports_error_message() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("abc123", Some(ContentStatus::Processing))))
            .on_content(Ok(ContentRecord {
                error_message: Some("content policy".to_string()),
                ..record("abc123", Some(ContentStatus::Failed))
            })),
    );

    store.generate_content(fox()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let head = &store.history()[0];
    assert_eq!(head.status, ContentStatus::Failed);
    assert_eq!(head.error_message.as_deref(), Some("content policy"));
    assert!(!store.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_poll_fetch_error_stops_polling() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Processing)))),
    );

    store.generate_content(fox()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert!(!store.is_polling());
    assert_eq!(store.history()[0].status, ContentStatus::Processing);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.backend().content_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_polling_is_idempotent() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Processing)))),
    );

    store.stop_polling();
    store.generate_content(fox()).await.unwrap();
    assert!(store.is_polling());

    store.stop_polling();
    store.stop_polling();
    store.stop_polling();

    assert!(!store.is_polling());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.backend().content_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_polling_replaces_previous() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Processing)))),
    );

    store.generate_content(fox()).await.unwrap();
    store.start_polling("other");

    assert_eq!(store.polling_target().as_deref(), Some("other"));
}

#[tokio::test(start_paused = true)]
async fn test_untracked_content_is_not_applied() {
    let store = GenerationStore::new(
        FakeBackend::new().on_content(Ok(completed("stranger", "http://x/s.png"))),
    );
    store.add_to_history(GeneratedContent::from_record(
        record("stranger", Some(ContentStatus::Processing)),
        None,
        ContentStatus::Processing,
    ));

    let check = store.check_generation_status("stranger").await.unwrap();

    assert_eq!(check, StatusCheck::Untracked);
    assert_eq!(store.history()[0].status, ContentStatus::Processing);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_is_not_reverted() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_generate(Ok(record("abc123", Some(ContentStatus::Processing))))
            .on_content(Ok(completed("abc123", "http://x/1.png")))
            .on_content(Ok(record("abc123", Some(ContentStatus::Processing)))),
    );

    store.generate_content(fox()).await.unwrap();
    store.stop_polling();

    let first = store.check_generation_status("abc123").await.unwrap();
    assert!(matches!(first, StatusCheck::Finished(_)));

    let second = store.check_generation_status("abc123").await.unwrap();
    match second {
        StatusCheck::Finished(content) => assert_eq!(content.status, ContentStatus::Completed),
        other => panic!("expected finished, got {:?}", other),
    }
    assert_eq!(store.history()[0].status, ContentStatus::Completed);
}

// ── History ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_load_history_replaces_then_appends() {
    let store = GenerationStore::new(
        FakeBackend::new()
            .on_contents(Ok(page(vec![
                completed("a", "http://x/a.png"),
                completed("b", "http://x/b.png"),
            ])))
            .on_contents(Ok(page(vec![completed("c", "http://x/c.png")])))
            .on_contents(Ok(page(vec![completed("z", "http://x/z.png")]))),
    );
    store.add_to_history(GeneratedContent::from_record(
        completed("stale", "http://x/stale.png"),
        None,
        ContentStatus::Completed,
    ));

    assert_eq!(store.load_history(1, 2, None).await.unwrap(), 2);
    assert_eq!(ids(&store), vec!["a", "b"]);

    assert_eq!(store.load_history(2, 2, None).await.unwrap(), 1);
    assert_eq!(ids(&store), vec!["a", "b", "c"]);

    store.refresh_history().await.unwrap();
    assert_eq!(ids(&store), vec!["z"]);
    assert!(!store.is_loading_history());
}

#[tokio::test(start_paused = true)]
async fn test_load_history_error_clears_loading_flag() {
    let store = GenerationStore::new(FakeBackend::new());

    assert!(store.load_history(1, 20, Some(ContentType::Video)).await.is_err());
    assert!(!store.is_loading_history());
}

#[tokio::test(start_paused = true)]
async fn test_remove_from_history_removes_only_that_entry() {
    let store = GenerationStore::new(FakeBackend::new().on_contents(Ok(page(vec![
        completed("x1", "http://x/1.png"),
        record("abc123", Some(ContentStatus::Failed)),
        record("x2", Some(ContentStatus::Processing)),
    ]))));
    store.load_history(1, 20, None).await.unwrap();

    assert!(store.remove_from_history("abc123"));
    assert_eq!(ids(&store), vec!["x1", "x2"]);

    assert!(!store.remove_from_history("abc123"));
    assert_eq!(ids(&store), vec!["x1", "x2"]);

    store.clear_history();
    assert!(store.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_updates() {
    let store = GenerationStore::new(
        FakeBackend::new().on_generate(Ok(record("abc123", Some(ContentStatus::Completed)))),
    );
    let mut updates = store.subscribe();

    let pending = store.generate_content(fox());
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_generating);

    pending.await.unwrap();
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().history[0].id, "abc123");
}
