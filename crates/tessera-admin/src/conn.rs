//! Administrative connection: transport traits and the cached connection.
//!
//! The client talks to the cluster over a single connection to the current
//! master coordinator. The transport is abstracted behind
//! [`AdminConnector`] / [`AdminConnection`] so the state machine can be
//! driven by an in-memory cluster in tests; [`crate::mysql`] provides the
//! real implementation.
//!
//! # Connection states
//!
//! ```text
//! Disconnected ──ensure_connection()──► Connected(port)
//!      ▲                                    │
//!      └──── reset() / master changed ◄─────┘
//! ```
//!
//! A connection is never repointed in place: a master change drops it and
//! the next operation builds a fresh one against the new port.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use tessera_core::AdminConfig;

use crate::error::{AdminError, AdminResult};

/// Boxed future returned by [`AdminConnection::query`].
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<ResultSet, String>> + Send + 'a>>;

/// Boxed future returned by [`AdminConnector::connect`].
pub type ConnectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Box<dyn AdminConnection>, String>> + Send + 'a>>;

/// An established administrative connection.
pub trait AdminConnection: Send + fmt::Debug {
    /// Run one statement and collect its rows as text.
    fn query<'a>(&'a mut self, sql: &'a str) -> QueryFuture<'a>;

    /// Close the underlying transport.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Factory for administrative connections, injected so tests can drive an in-memory cluster.
pub trait AdminConnector: Send + Sync {
    fn connect<'a>(&'a self, target: &'a ConnectTarget) -> ConnectFuture<'a>;
}

/// Fixed parameters of one connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Upper bound on a single query round trip.
    pub read_timeout: Duration,
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Result sets ──────────────────────────────────────────────────────

/// Rows of a statement result, every cell as optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows read as NULL in the missing columns.
    pub fn push_row(&mut self, values: Vec<Option<String>>) {
        self.rows.push(values);
    }

    /// Builder form of [`ResultSet::push_row`] taking plain text cells.
    pub fn with_row<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.rows
            .push(values.into_iter().map(|v| Some(v.as_ref().to_string())).collect());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Cell text for `column` (ASCII case-insensitive). `None` when the
    /// column is missing or the cell is NULL.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.values.get(idx)?.as_deref()
    }
}

// ── Connection provider ──────────────────────────────────────────────

/// A live connection and the port it was opened against. `None` in the
/// provider means disconnected.
struct Cached {
    port: u16,
    conn: Box<dyn AdminConnection>,
}

/// Lazily builds and caches the single connection to the target port.
pub struct ConnectionProvider {
    connector: Arc<dyn AdminConnector>,
    config: AdminConfig,
    target_port: Option<u16>,
    cached: Option<Cached>,
}

impl fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("target_port", &self.target_port)
            .field("connected_port", &self.connected_port())
            .finish()
    }
}

impl ConnectionProvider {
    pub fn new(connector: Arc<dyn AdminConnector>, config: AdminConfig) -> Self {
        Self {
            connector,
            config,
            target_port: None,
            cached: None,
        }
    }

    pub fn target_port(&self) -> Option<u16> {
        self.target_port
    }

    /// Port of the live cached connection, if any.
    pub fn connected_port(&self) -> Option<u16> {
        self.cached.as_ref().map(|c| c.port)
    }

    /// Point the provider at `port`. The cached connection is kept only if
    /// it already targets that port.
    pub fn set_target_port(&mut self, port: u16) {
        self.target_port = Some(port);
        if self.connected_port().is_some_and(|p| p != port) {
            self.reset();
        }
    }

    /// The discovered master moved to `port`: retarget and drop the cached
    /// connection so the next operation reconnects.
    pub fn on_master_changed(&mut self, port: u16) {
        info!(
            old_port = ?self.target_port,
            new_port = port,
            "master changed, resetting admin connection"
        );
        self.target_port = Some(port);
        self.reset();
    }

    /// Unconditionally discard the cached connection.
    pub fn reset(&mut self) {
        if let Some(Cached { port, .. }) = self.cached.take() {
            debug!(port, "dropping admin connection");
        }
    }

    /// Return the cached connection, creating it on first use.
    pub async fn ensure_connection(&mut self) -> AdminResult<&mut dyn AdminConnection> {
        let port = self.target_port.ok_or_else(|| {
            AdminError::Configuration("query port is not set".to_string())
        })?;

        let cached = match self.cached.take() {
            Some(cached) if cached.port == port => cached,
            stale => {
                // A connection to another port is never reused.
                drop(stale);
                let target = self.target(port);
                let conn = self
                    .connector
                    .connect(&target)
                    .await
                    .map_err(|message| AdminError::Cluster {
                        target: format!("connect {target}"),
                        message,
                    })?;
                debug!(%target, "admin connection established");
                Cached { port, conn }
            }
        };

        Ok(self.cached.insert(cached).conn.as_mut())
    }

    /// Run one statement over the cached connection.
    ///
    /// Failures leave the connection cached as-is.
    pub async fn query(&mut self, sql: &str) -> AdminResult<ResultSet> {
        let port = self.target_port;
        let conn = self.ensure_connection().await?;
        conn.query(sql).await.map_err(|message| AdminError::Cluster {
            target: format!("query port {}", port.unwrap_or_default()),
            message,
        })
    }

    /// Close and release the cached connection.
    pub async fn close(&mut self) {
        if let Some(Cached { mut conn, port }) = self.cached.take() {
            conn.close().await;
            debug!(port, "admin connection closed");
        }
    }

    fn target(&self, port: u16) -> ConnectTarget {
        ConnectTarget {
            host: self.config.host.clone(),
            port,
            user: self.config.user.clone(),
            password: self.config.password.clone(),
            read_timeout: self.config.read_timeout(),
        }
    }
}
