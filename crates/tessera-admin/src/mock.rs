//! In-memory cluster used by unit tests.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::conn::{AdminConnection, AdminConnector, ConnectFuture, ConnectTarget, QueryFuture, ResultSet};

type Responder = Box<dyn FnMut(u16, &str) -> Result<ResultSet, String> + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub conn_id: u64,
    pub port: u16,
    pub sql: String,
}

struct Inner {
    responder: Responder,
    refuse: Option<String>,
    next_id: u64,
    connects: Vec<(u64, u16)>,
    statements: Vec<Statement>,
    closed: Vec<u64>,
}

/// Scripted cluster: every statement is answered by a user-supplied
/// responder, and every connect/statement/close is recorded.
#[derive(Clone)]
pub struct MockCluster {
    inner: Arc<Mutex<Inner>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                responder: Box::new(|_, _| Ok(ResultSet::default())),
                refuse: None,
                next_id: 1,
                connects: Vec::new(),
                statements: Vec::new(),
                closed: Vec::new(),
            })),
        }
    }

    pub fn connector(&self) -> Arc<dyn AdminConnector> {
        Arc::new(self.clone())
    }

    pub fn respond<F>(&self, f: F)
    where
        F: FnMut(u16, &str) -> Result<ResultSet, String> + Send + 'static,
    {
        self.inner.lock().unwrap().responder = Box::new(f);
    }

    pub fn refuse_connections(&self, message: &str) {
        self.inner.lock().unwrap().refuse = Some(message.to_string());
    }

    pub fn connects(&self) -> Vec<(u64, u16)> {
        self.inner.lock().unwrap().connects.clone()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.inner.lock().unwrap().statements.clone()
    }

    /// Statements other than the two state queries.
    pub fn commands(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .map(|s| s.sql)
            .filter(|sql| !is_state_query(sql))
            .collect()
    }

    pub fn closed(&self) -> Vec<u64> {
        self.inner.lock().unwrap().closed.clone()
    }
}

impl AdminConnector for MockCluster {
    fn connect<'a>(&'a self, target: &'a ConnectTarget) -> ConnectFuture<'a> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            if let Some(msg) = &inner.refuse {
                return Err(msg.clone());
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.connects.push((id, target.port));
            Ok(Box::new(MockConnection {
                id,
                port: target.port,
                inner: self.inner.clone(),
            }) as Box<dyn AdminConnection>)
        })
    }
}

struct MockConnection {
    id: u64,
    port: u16,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection").field("id", &self.id).finish()
    }
}

impl AdminConnection for MockConnection {
    fn query<'a>(&'a mut self, sql: &'a str) -> QueryFuture<'a> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.statements.push(Statement {
                conn_id: self.id,
                port: self.port,
                sql: sql.to_string(),
            });
            (inner.responder)(self.port, sql)
        })
    }

    fn close(&mut self) -> Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.inner.lock().unwrap().closed.push(self.id);
        })
    }
}

pub fn is_state_query(sql: &str) -> bool {
    sql == crate::statements::SHOW_FRONTENDS || sql == crate::statements::LIST_BACKENDS
}

pub fn is_frontends(sql: &str) -> bool {
    sql == crate::statements::SHOW_FRONTENDS
}

pub fn is_backends(sql: &str) -> bool {
    sql == crate::statements::LIST_BACKENDS
}

/// `SHOW FRONTENDS` rows from `(ip, is_master, alive)`.
pub fn frontends(rows: &[(&str, bool, bool)]) -> ResultSet {
    let mut rs = ResultSet::new([
        "Name", "Host", "EditLogPort", "HttpPort", "QueryPort", "RpcPort", "Role", "IsMaster",
        "ClusterId", "Join", "Alive", "ReplayedJournalId", "LastHeartbeat", "IsHelper", "ErrMsg",
        "Version",
    ]);
    for (i, (ip, master, alive)) in rows.iter().enumerate() {
        rs = rs.with_row([
            format!("fe_{i}"),
            ip.to_string(),
            "9010".to_string(),
            "8030".to_string(),
            "9030".to_string(),
            "9020".to_string(),
            "FOLLOWER".to_string(),
            master.to_string(),
            "1234".to_string(),
            "true".to_string(),
            alive.to_string(),
            "100".to_string(),
            "2024-01-01 00:00:00".to_string(),
            "true".to_string(),
            String::new(),
            "3.0.0".to_string(),
        ]);
    }
    rs
}

/// `backends()` rows from `(ip, alive, tablet_num)`.
pub fn backends(rows: &[(&str, bool, u64)]) -> ResultSet {
    let mut rs = ResultSet::new([
        "BackendId", "Host", "LastHeartbeat", "Alive", "SystemDecommissioned", "TabletNum",
        "ErrMsg", "HeartbeatPort",
    ]);
    for (i, (ip, alive, tablets)) in rows.iter().enumerate() {
        rs = rs.with_row([
            (10_001 + i).to_string(),
            ip.to_string(),
            "NULL".to_string(),
            alive.to_string(),
            "false".to_string(),
            tablets.to_string(),
            String::new(),
            "9050".to_string(),
        ]);
    }
    rs
}
