//! Test utilities
//!
//! - `MemoryStore`: in-memory count/fetch collaborator with failure injection
//! - `ScriptedGenerator`: insight generator returning queued responses
//! - `MockChatServer`: HTTP server speaking the OpenAI and Anthropic shapes

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::ai::{GeneratorError, InsightGenerator, InsightPayload};
use crate::analytics::{ChunkWindow, CountEstimator, TransactionFetcher};
use crate::error::{Error, Result};
use crate::models::{DateRange, TransactionKind, TransactionRecord};

/// Deterministic transactions for `user_id`: ids `1..=n`, one per day
/// going back from 2024-12-31, every fifth an income, the rest expenses
/// spread over four categories (one uncategorized)
pub fn sample_transactions(user_id: i64, n: usize) -> Vec<TransactionRecord> {
    const CATEGORIES: [Option<&str>; 4] =
        [Some("Groceries"), Some("Dining"), Some("Transport"), None];
    let latest = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    (0..n)
        .map(|i| {
            let id = i as i64 + 1;
            let is_income = i % 5 == 4;
            TransactionRecord {
                id,
                user_id,
                date: latest - Duration::days(i as i64 / 3),
                description: format!("Transaction {}", id),
                amount: if is_income {
                    Decimal::new(125_000, 2)
                } else {
                    Decimal::new(500 + (i as i64 % 37) * 113, 2)
                },
                kind: if is_income {
                    TransactionKind::Income
                } else {
                    TransactionKind::Expense
                },
                category: if is_income {
                    Some("Salary".to_string())
                } else {
                    CATEGORIES[i % 4].map(String::from)
                },
            }
        })
        .collect()
}

#[derive(Default)]
struct MemoryStoreState {
    transactions: Mutex<Vec<TransactionRecord>>,
    fetched: Mutex<Vec<Option<ChunkWindow>>>,
    arrive_after_count: Mutex<Vec<TransactionRecord>>,
    count_calls: AtomicUsize,
    fail_counts: AtomicBool,
    fail_fetches: AtomicBool,
}

/// In-memory transaction store
///
/// Clones share state, so a test can keep a handle after moving a clone
/// into the engine.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<MemoryStoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: Vec<TransactionRecord>) -> Self {
        let store = Self::new();
        store.extend(transactions);
        store
    }

    pub fn extend(&self, transactions: Vec<TransactionRecord>) {
        if let Ok(mut all) = self.state.transactions.lock() {
            all.extend(transactions);
            all.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        }
    }

    /// Insert `transactions` right after the next count, as a concurrent
    /// writer would between count and fetch
    pub fn insert_after_next_count(&self, transactions: Vec<TransactionRecord>) {
        if let Ok(mut pending) = self.state.arrive_after_count.lock() {
            pending.extend(transactions);
        }
    }

    /// Make every subsequent count fail
    pub fn fail_counts(&self) {
        self.state.fail_counts.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent fetch fail
    pub fn fail_fetches(&self) {
        self.state.fail_fetches.store(true, Ordering::SeqCst);
    }

    pub fn count_calls(&self) -> usize {
        self.state.count_calls.load(Ordering::SeqCst)
    }

    /// Windows requested so far, in call order (`None` = unpaged fetch)
    pub fn fetched_windows(&self) -> Vec<Option<ChunkWindow>> {
        self.state
            .fetched
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    fn matching(&self, user_id: i64, range: &DateRange) -> Result<Vec<TransactionRecord>> {
        let all = self
            .state
            .transactions
            .lock()
            .map_err(|_| Error::CollaboratorUnavailable("memory store poisoned".into()))?;
        Ok(all
            .iter()
            .filter(|t| t.user_id == user_id && range.contains(t.date))
            .cloned()
            .collect())
    }
}

impl CountEstimator for MemoryStore {
    fn count(&self, user_id: i64, range: &DateRange) -> Result<u64> {
        self.state.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_counts.load(Ordering::SeqCst) {
            return Err(Error::CollaboratorUnavailable("count failed".into()));
        }
        let count = self.matching(user_id, range)?.len() as u64;
        let arrived = self
            .state
            .arrive_after_count
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default();
        if !arrived.is_empty() {
            self.extend(arrived);
        }
        Ok(count)
    }
}

impl TransactionFetcher for MemoryStore {
    fn fetch(
        &self,
        user_id: i64,
        range: &DateRange,
        window: Option<ChunkWindow>,
    ) -> Result<Vec<TransactionRecord>> {
        if let Ok(mut fetched) = self.state.fetched.lock() {
            fetched.push(window);
        }
        if self.state.fail_fetches.load(Ordering::SeqCst) {
            return Err(Error::CollaboratorUnavailable("fetch failed".into()));
        }

        let matching = self.matching(user_id, range)?;
        Ok(match window {
            Some(w) => matching
                .into_iter()
                .skip(w.offset as usize)
                .take(w.size as usize)
                .collect(),
            None => matching,
        })
    }
}

#[derive(Default)]
struct ScriptedState {
    responses: Mutex<VecDeque<std::result::Result<String, GeneratorError>>>,
    payloads: Mutex<Vec<InsightPayload>>,
}

/// Insight generator that replays queued responses
///
/// Once the queue is empty every call returns `"scripted insight"`.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    state: Arc<ScriptedState>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, text: &str) {
        if let Ok(mut responses) = self.state.responses.lock() {
            responses.push_back(Ok(text.to_string()));
        }
    }

    pub fn push_err(&self, err: GeneratorError) {
        if let Ok(mut responses) = self.state.responses.lock() {
            responses.push_back(Err(err));
        }
    }

    /// Payloads received so far, in call order
    pub fn payloads(&self) -> Vec<InsightPayload> {
        self.state
            .payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.state.payloads.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl InsightGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        payload: &InsightPayload,
    ) -> std::result::Result<String, GeneratorError> {
        if let Ok(mut payloads) = self.state.payloads.lock() {
            payloads.push(payload.clone());
        }
        self.state
            .responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Ok("scripted insight".to_string()))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn provider(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[derive(Clone)]
struct ChatServerState {
    reply: String,
    status: StatusCode,
    delay: std::time::Duration,
}

/// Mock chat server for backend tests
///
/// Serves `/v1/chat/completions` (OpenAI) and `/v1/messages` (Anthropic),
/// answering every request with `reply` or, for a non-2xx `status`, an
/// error body with that status. `start_with_delay` holds every response
/// back for a fixed time so client timeouts can fire.
pub struct MockChatServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start the mock server on an available port
    pub async fn start(reply: &str, status: u16) -> Self {
        Self::start_with_delay(reply, status, std::time::Duration::ZERO).await
    }

    /// Start a server that waits `delay` before answering each request
    pub async fn start_with_delay(reply: &str, status: u16, delay: std::time::Duration) -> Self {
        let state = ChatServerState {
            reply: reply.to_string(),
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            delay,
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/messages", post(handle_messages))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn error_response(status: StatusCode) -> Response {
    let body = serde_json::json!({
        "error": { "type": "mock_error", "message": format!("mock status {}", status.as_u16()) }
    });
    (status, Json(body)).into_response()
}

/// OpenAI chat completions endpoint
async fn handle_chat_completions(
    State(state): State<ChatServerState>,
    Json(_request): Json<serde_json::Value>,
) -> Response {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    if !state.status.is_success() {
        return error_response(state.status);
    }
    Json(serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": state.reply },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Anthropic messages endpoint
async fn handle_messages(
    State(state): State<ChatServerState>,
    Json(_request): Json<serde_json::Value>,
) -> Response {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    if !state.status.is_success() {
        return error_response(state.status);
    }
    Json(serde_json::json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": state.reply }],
        "stop_reason": "end_turn"
    }))
    .into_response()
}
