//! MySQL-protocol connector for the administrative channel.
//!
//! Coordinators speak the MySQL wire protocol. Statements are sent as plain
//! text queries (no prepared statements, which `SHOW` and `ALTER SYSTEM`
//! do not support), so every cell comes back in text form and is read as
//! an optional string.

use std::pin::Pin;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row};

use crate::conn::{AdminConnection, AdminConnector, ConnectFuture, ConnectTarget, QueryFuture, ResultSet};

/// Connects to a coordinator's query port with the MySQL protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl AdminConnector for MySqlConnector {
    fn connect<'a>(&'a self, target: &'a ConnectTarget) -> ConnectFuture<'a> {
        Box::pin(async move {
            let mut options = MySqlConnectOptions::new()
                .host(&target.host)
                .port(target.port)
                .username(&target.user)
                .ssl_mode(MySqlSslMode::Disabled)
                .pipes_as_concat(false)
                .no_engine_substitution(false)
                .timezone(None::<String>);
            if let Some(password) = &target.password {
                options = options.password(password);
            }

            let conn = tokio::time::timeout(target.read_timeout, options.connect())
                .await
                .map_err(|_| format!("connect timed out after {:?}", target.read_timeout))?
                .map_err(|e| e.to_string())?;

            Ok(Box::new(MySqlAdminConnection {
                conn: Some(conn),
                read_timeout: target.read_timeout,
            }) as Box<dyn AdminConnection>)
        })
    }
}

pub struct MySqlAdminConnection {
    conn: Option<MySqlConnection>,
    read_timeout: Duration,
}

impl std::fmt::Debug for MySqlAdminConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdminConnection")
            .field("open", &self.conn.is_some())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl AdminConnection for MySqlAdminConnection {
    fn query<'a>(&'a mut self, sql: &'a str) -> QueryFuture<'a> {
        Box::pin(async move {
            let conn = self
                .conn
                .as_mut()
                .ok_or_else(|| "connection is closed".to_string())?;

            let rows = tokio::time::timeout(self.read_timeout, conn.fetch_all(sql))
                .await
                .map_err(|_| format!("read timed out after {:?}", self.read_timeout))?
                .map_err(|e| e.to_string())?;

            to_result_set(&rows)
        })
    }

    fn close(&mut self) -> Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(conn) = self.conn.take() {
                let _ = conn.close().await;
            }
        })
    }
}

fn to_result_set(rows: &[MySqlRow]) -> Result<ResultSet, String> {
    let Some(first) = rows.first() else {
        return Ok(ResultSet::default());
    };
    let mut rs = ResultSet::new(first.columns().iter().map(|c| c.name().to_string()));
    for row in rows {
        let mut values = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            // Text protocol: every column decodes as a string.
            let value: Option<String> = row
                .try_get_unchecked(idx)
                .map_err(|e| format!("column {idx}: {e}"))?;
            values.push(value);
        }
        rs.push_row(values);
    }
    Ok(rs)
}
