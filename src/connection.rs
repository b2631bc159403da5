//! Connection Manager
//!
//! Owns at most one live [`Session`] and hands it out for read queries.
//!
//! # Lifecycle
//! - No handle: one is opened lazily on first use
//! - Existing handle: checked with `ping` before reuse, with bounded retries
//! - Failed ping or failed query: the handle is closed and forgotten, so the
//!   next call starts from a fresh connection
//!
//! The manager is an owned value taking `&mut self`; callers that share it wrap
//! it in a mutex.

use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::engine::{Connector, DatabaseType, QueryResult, Session, SqlParam};
use crate::error::{AppError, Result};
use crate::guard;

/// Retry settings for probing and reconnecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pings tried before a handle is declared dead
    pub ping_attempts: u32,
    /// Pause between failed pings
    pub ping_backoff: Duration,
    /// Connect attempts per `execute` call
    pub connect_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ping_attempts: 3,
            ping_backoff: Duration::from_secs(5),
            connect_attempts: 2,
        }
    }
}

/// Single-connection manager with guard-first execution
pub struct ConnectionManager<C: Connector> {
    connector: C,
    session: Option<C::Session>,
    policy: RetryPolicy,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager with the default retry policy. Nothing connects yet.
    pub fn new(connector: C) -> Self {
        Self::with_policy(connector, RetryPolicy::default())
    }

    pub fn with_policy(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            session: None,
            policy,
        }
    }

    /// Engine behind this manager
    pub fn engine(&self) -> DatabaseType {
        self.connector.engine()
    }

    /// Whether a handle is currently held (it may still turn out to be stale)
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Return a live handle, opening or replacing one as needed.
    ///
    /// An existing handle is pinged up to `ping_attempts` times. If every ping
    /// fails, it is closed and a new one is opened in its place.
    pub async fn acquire(&mut self) -> Result<&mut C::Session> {
        let alive = match self.session.as_mut() {
            Some(session) => is_alive(session, &self.policy).await,
            None => false,
        };

        if !alive {
            if let Some(stale) = self.session.take() {
                warn!(
                    engine = %self.connector.engine(),
                    "connection failed liveness check, reconnecting"
                );
                stale.close().await;
            }

            let fresh = self.connector.connect().await?;
            info!(engine = %self.connector.engine(), "database connection established");
            self.session = Some(fresh);
        }

        self.session.as_mut().ok_or_else(|| AppError::connection("No active connection"))
    }

    /// Close and forget the current handle, if any
    pub async fn invalidate(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("discarding database connection");
            session.close().await;
        }
    }

    /// Run a read query.
    ///
    /// The guard runs first and unconditionally. The connect step is retried up
    /// to `connect_attempts` times. A failing query invalidates the handle before
    /// its error is returned.
    pub async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        guard::check(sql, self.engine())?;

        debug!(sql = %preview(sql), params = params.len(), "executing query");
        self.acquire_with_retry().await?;

        let start = Instant::now();
        let outcome = match self.session.as_mut() {
            Some(session) => session.query(sql, params).await,
            None => Err(AppError::connection("No active connection")),
        };

        match &outcome {
            Ok(result) => {
                debug!(
                    rows = result.rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "query finished"
                );
            }
            Err(e) => {
                error!(code = e.error_code(), error = %e, "query failed, invalidating connection");
                self.invalidate().await;
            }
        }

        outcome
    }

    async fn acquire_with_retry(&mut self) -> Result<()> {
        let attempts = self.policy.connect_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.acquire().await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "connection attempt failed");
                    // Configuration problems will not fix themselves
                    if matches!(e, AppError::Configuration(_)) {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::connection("Failed to connect")))
    }
}

/// Ping with bounded retries; true when any attempt succeeds
async fn is_alive<S: Session>(session: &mut S, policy: &RetryPolicy) -> bool {
    let attempts = policy.ping_attempts.max(1);

    for attempt in 1..=attempts {
        match session.ping().await {
            Ok(()) => return true,
            Err(e) => {
                debug!(attempt, attempts, error = %e, "ping failed");
                if attempt < attempts {
                    tokio::time::sleep(policy.ping_backoff).await;
                }
            }
        }
    }

    false
}

/// First line of a query, shortened for log output
fn preview(sql: &str) -> String {
    let line = sql.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        format!("{}...", line.chars().take(80).collect::<String>())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Row;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counters and failure switches shared between a mock connector and its sessions
    #[derive(Default)]
    struct MockState {
        connects: AtomicUsize,
        pings: AtomicUsize,
        closes: AtomicUsize,
        failing_connects: AtomicUsize,
        fail_next_query: AtomicBool,
        ping_fails: AtomicBool,
    }

    struct MockConnector {
        state: Arc<MockState>,
    }

    struct MockSession {
        handle: usize,
        state: Arc<MockState>,
    }

    impl Connector for MockConnector {
        type Session = MockSession;

        fn engine(&self) -> DatabaseType {
            DatabaseType::SQLite
        }

        async fn connect(&self) -> Result<MockSession> {
            if self.state.failing_connects.load(Ordering::SeqCst) > 0 {
                self.state.failing_connects.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::connection("refused"));
            }
            let handle = self.state.connects.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(MockSession {
                handle,
                state: Arc::clone(&self.state),
            })
        }
    }

    impl Session for MockSession {
        async fn ping(&mut self) -> Result<()> {
            self.state.pings.fetch_add(1, Ordering::SeqCst);
            if self.state.ping_fails.load(Ordering::SeqCst) {
                Err(AppError::connection("server has gone away"))
            } else {
                Ok(())
            }
        }

        async fn query(&mut self, _sql: &str, _params: &[SqlParam]) -> Result<QueryResult> {
            if self.state.fail_next_query.swap(false, Ordering::SeqCst) {
                return Err(AppError::query_failed("connection reset by peer"));
            }
            let mut row = Row::new();
            row.insert("handle".to_string(), serde_json::json!(self.handle));
            Ok(QueryResult {
                columns: vec!["handle".to_string()],
                rows: vec![row],
            })
        }

        async fn close(self) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn manager() -> (ConnectionManager<MockConnector>, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        let policy = RetryPolicy {
            ping_backoff: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let connector = MockConnector {
            state: Arc::clone(&state),
        };
        let manager = ConnectionManager::with_policy(connector, policy);
        (manager, state)
    }

    fn handle_of(result: &QueryResult) -> u64 {
        result.rows[0]["handle"].as_u64().unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.ping_attempts, 3);
        assert_eq!(policy.ping_backoff, Duration::from_secs(5));
        assert_eq!(policy.connect_attempts, 2);
    }

    #[tokio::test]
    async fn test_connects_lazily_and_reuses_handle() {
        let (mut manager, state) = manager();
        assert!(!manager.is_connected());
        assert_eq!(state.connects.load(Ordering::SeqCst), 0);

        let first = manager.execute("SELECT 1", &[]).await.unwrap();
        let second = manager.execute("SELECT 1", &[]).await.unwrap();

        assert_eq!(handle_of(&first), 1);
        assert_eq!(handle_of(&second), 1);
        assert_eq!(state.connects.load(Ordering::SeqCst), 1);
        // Only the reused handle gets pinged
        assert_eq!(state.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_guard_runs_before_connecting() {
        let (mut manager, state) = manager();

        let err = manager.execute("DELETE FROM stock", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::SecurityViolation { ref verb } if verb == "DELETE"));
        assert_eq!(state.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_failure_invalidates_handle() {
        let (mut manager, state) = manager();
        manager.execute("SELECT 1", &[]).await.unwrap();

        state.fail_next_query.store(true, Ordering::SeqCst);
        let err = manager.execute("SELECT 1", &[]).await.unwrap_err();
        assert_eq!(err.error_code(), "QUERY_FAILED");
        assert!(!manager.is_connected());
        assert_eq!(state.closes.load(Ordering::SeqCst), 1);

        let recovered = manager.execute("SELECT 1", &[]).await.unwrap();
        assert_eq!(handle_of(&recovered), 2);
    }

    #[tokio::test]
    async fn test_stale_handle_replaced_after_bounded_pings() {
        let (mut manager, state) = manager();
        manager.execute("SELECT 1", &[]).await.unwrap();

        state.ping_fails.store(true, Ordering::SeqCst);
        let result = manager.execute("SELECT 1", &[]).await.unwrap();

        assert_eq!(handle_of(&result), 2);
        assert_eq!(state.pings.load(Ordering::SeqCst), 3);
        assert_eq!(state.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_retried_once() {
        let (mut manager, state) = manager();
        state.failing_connects.store(1, Ordering::SeqCst);

        let result = manager.execute("SELECT 1", &[]).await.unwrap();
        assert_eq!(handle_of(&result), 1);
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_attempts() {
        let (mut manager, state) = manager();
        state.failing_connects.store(5, Ordering::SeqCst);

        let err = manager.execute("SELECT 1", &[]).await.unwrap_err();
        assert_eq!(err.error_code(), "CONNECTION_ERROR");
        assert_eq!(state.failing_connects.load(Ordering::SeqCst), 3);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_invalidate_without_handle_is_noop() {
        let (mut manager, state) = manager();
        manager.invalidate().await;
        assert_eq!(state.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_preview_truncates_long_queries() {
        let sql = format!("SELECT {}", "x".repeat(200));
        let short = preview(&sql);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 83);
        assert_eq!(preview("  SELECT 1\nFROM t"), "SELECT 1");
    }
}
