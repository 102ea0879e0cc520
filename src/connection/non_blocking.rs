/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use redis::{Client, Pipeline, RedisResult, Value};
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::FacadeConfig;
use crate::errors::{FacadeError, FacadeResult};
use crate::{ConnectionState, ConnectionStats};
use super::blocking::connect_error;

/// Async counterpart of [`ConnectionBackend`](crate::ConnectionBackend).
#[async_trait]
pub trait AsyncConnectionBackend: Send + Sync {
    async fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>>;

    async fn connect(&self) -> FacadeResult<()>;

    async fn close(&self);

    /// Best-effort close for teardown paths that cannot await
    fn try_close(&self);

    fn state(&self) -> ConnectionState;

    fn stats(&self) -> ConnectionStats;

    fn reset_stats(&self);
}

async fn connect_multiplexed(config: &FacadeConfig, db: i64) -> FacadeResult<MultiplexedConnection> {
    let client = Client::open(config.connection_info(db)?)?;
    match timeout(config.connection_timeout, client.get_multiplexed_async_connection()).await {
        Ok(conn) => Ok(conn?),
        Err(_) => Err(FacadeError::Timeout(config.connection_timeout)),
    }
}

async fn open_async_connection(
    config: &FacadeConfig,
    db: i64,
    stats: &RwLock<ConnectionStats>,
) -> FacadeResult<MultiplexedConnection> {
    let started = Instant::now();
    match connect_multiplexed(config, db).await {
        Ok(conn) => {
            stats.write().record_connected(started.elapsed());
            debug!(address = %config.address(), db, "redis connection established");
            Ok(conn)
        }
        Err(err) => {
            stats.write().record_connect_failure();
            error!(address = %config.address(), db, error = %err, "failed to connect to redis");
            Err(connect_error(err))
        }
    }
}

// Applies the configured response timeout to a single request
async fn bounded<T, F>(limit: Option<Duration>, request: F) -> FacadeResult<T>
where
    F: Future<Output = RedisResult<T>>,
{
    match limit {
        Some(limit) => match timeout(limit, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FacadeError::Timeout(limit)),
        },
        None => Ok(request.await?),
    }
}

// ================ Shared connection ================

#[derive(Default)]
struct AsyncSharedSlot {
    conn: Option<MultiplexedConnection>,
    selected_db: Option<i64>,
}

/// One multiplexed connection reused for every database; `SELECT` and the
/// command run under the same lock.
pub struct AsyncSharedConnection {
    config: FacadeConfig,
    slot: TokioMutex<AsyncSharedSlot>,
    stats: Arc<RwLock<ConnectionStats>>,
}

impl AsyncSharedConnection {
    pub fn new(config: FacadeConfig) -> Self {
        Self {
            config,
            slot: TokioMutex::new(AsyncSharedSlot::default()),
            stats: Arc::new(RwLock::new(ConnectionStats::new())),
        }
    }

    async fn ensure_connected(&self, slot: &mut AsyncSharedSlot) -> FacadeResult<()> {
        if slot.conn.is_none() {
            let conn = open_async_connection(&self.config, self.config.database, &self.stats).await?;
            slot.conn = Some(conn);
            slot.selected_db = Some(self.config.database);
        }
        Ok(())
    }

    fn discard(&self, slot: &mut AsyncSharedSlot) {
        slot.selected_db = None;
        if slot.conn.take().is_some() {
            self.stats.write().record_disconnect();
        }
    }

    async fn run(&self, slot: &mut AsyncSharedSlot, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let AsyncSharedSlot { conn, selected_db } = slot;
        let conn = conn
            .as_mut()
            .ok_or_else(|| FacadeError::Unavailable("no open connection".to_string()))?;
        let limit = self.config.response_timeout;

        if *selected_db != Some(db) {
            bounded(limit, redis::cmd("SELECT").arg(db).query_async::<()>(conn)).await?;
            *selected_db = Some(db);
            debug!(db, "selected database");
        }

        bounded(limit, pipe.query_async::<Vec<Value>>(conn)).await
    }
}

#[async_trait]
impl AsyncConnectionBackend for AsyncSharedConnection {
    async fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let mut slot = self.slot.lock().await;
        self.ensure_connected(&mut slot).await?;

        let result = self.run(&mut slot, db, pipe).await;
        match result {
            Ok(values) => {
                self.stats.write().record_success();
                Ok(values)
            }
            Err(err) => {
                self.stats.write().record_error();
                if err.is_connection_fault() {
                    warn!(address = %self.config.address(), db, error = %err, "discarding broken redis connection");
                    self.discard(&mut slot);
                    return Err(err.into_unavailable());
                }
                Err(err)
            }
        }
    }

    async fn connect(&self) -> FacadeResult<()> {
        let mut slot = self.slot.lock().await;
        self.ensure_connected(&mut slot).await
    }

    async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if slot.conn.is_some() {
            self.discard(&mut slot);
            debug!(address = %self.config.address(), "redis connection closed");
        }
    }

    fn try_close(&self) {
        if let Ok(mut slot) = self.slot.try_lock() {
            self.discard(&mut slot);
        }
    }

    fn state(&self) -> ConnectionState {
        self.stats.read().state()
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.read().clone()
    }

    fn reset_stats(&self) {
        self.stats.write().reset();
    }
}

// ================ Connection per database ================

// A handle plus the generation it was opened in, so a failure seen on an old
// handle cannot evict its replacement.
struct TrackedConnection {
    generation: u64,
    conn: MultiplexedConnection,
}

/// One multiplexed connection per logical database. Handles are cloned out of
/// the map, so requests to any database run concurrently.
pub struct AsyncDatabaseConnections {
    config: FacadeConfig,
    connections: TokioMutex<HashMap<i64, TrackedConnection>>,
    generation: AtomicU64,
    stats: Arc<RwLock<ConnectionStats>>,
}

impl AsyncDatabaseConnections {
    pub fn new(config: FacadeConfig) -> Self {
        Self {
            config,
            connections: TokioMutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            stats: Arc::new(RwLock::new(ConnectionStats::new())),
        }
    }

    async fn connection(&self, db: i64) -> FacadeResult<(u64, MultiplexedConnection)> {
        let mut connections = self.connections.lock().await;
        if let Some(tracked) = connections.get(&db) {
            return Ok((tracked.generation, tracked.conn.clone()));
        }
        let conn = open_async_connection(&self.config, db, &self.stats).await?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        connections.insert(db, TrackedConnection { generation, conn: conn.clone() });
        Ok((generation, conn))
    }

    /// Drops the handle for `db` if it is still the one opened in `generation`.
    async fn discard(&self, db: i64, generation: u64) -> bool {
        let mut connections = self.connections.lock().await;
        let current = connections.get(&db).is_some_and(|tracked| tracked.generation == generation);
        if current {
            connections.remove(&db);
            self.stats.write().record_disconnect();
        }
        current
    }

    fn forget(&self, connections: &mut HashMap<i64, TrackedConnection>) {
        let closed = connections.len();
        connections.clear();
        let mut stats = self.stats.write();
        for _ in 0..closed {
            stats.record_disconnect();
        }
    }
}

#[async_trait]
impl AsyncConnectionBackend for AsyncDatabaseConnections {
    async fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let (generation, mut conn) = self.connection(db).await?;
        let result = bounded(self.config.response_timeout, pipe.query_async::<Vec<Value>>(&mut conn)).await;

        match result {
            Ok(values) => {
                self.stats.write().record_success();
                Ok(values)
            }
            Err(err) => {
                self.stats.write().record_error();
                if err.is_connection_fault() {
                    warn!(address = %self.config.address(), db, error = %err, "discarding broken redis connection");
                    self.discard(db, generation).await;
                    return Err(err.into_unavailable());
                }
                Err(err)
            }
        }
    }

    async fn connect(&self) -> FacadeResult<()> {
        self.connection(self.config.database).await.map(|_| ())
    }

    async fn close(&self) {
        let mut connections = self.connections.lock().await;
        if !connections.is_empty() {
            self.forget(&mut connections);
            debug!(address = %self.config.address(), "redis connections closed");
        }
    }

    fn try_close(&self) {
        if let Ok(mut connections) = self.connections.try_lock() {
            self.forget(&mut connections);
        }
    }

    fn state(&self) -> ConnectionState {
        self.stats.read().state()
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.read().clone()
    }

    fn reset_stats(&self) {
        self.stats.write().reset();
    }
}
