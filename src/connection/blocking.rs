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
use std::sync::Arc;
use std::time::Instant;
use parking_lot::{Mutex, RwLock};
use redis::{Client, Connection, Pipeline, Value};
use tracing::{debug, error, warn};

use crate::config::FacadeConfig;
use crate::errors::{FacadeError, FacadeResult};
use crate::{ConnectionState, ConnectionStats};

/// Owns blocking connection handles and runs pipelines against a logical database.
pub trait ConnectionBackend: Send + Sync {
    /// Runs `pipe` on database `db`, connecting first when no handle is open.
    /// Returns the replies of the non-ignored commands.
    fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>>;

    /// Opens the handle for the configured default database if it is not open yet.
    fn connect(&self) -> FacadeResult<()>;

    fn state(&self) -> ConnectionState;

    fn stats(&self) -> ConnectionStats;

    /// Zeroes the counters; open handles stay counted.
    fn reset_stats(&self);

    /// Drops every open handle. Never fails.
    fn close(&self);
}

fn connect_blocking(config: &FacadeConfig, db: i64) -> FacadeResult<Connection> {
    let client = Client::open(config.connection_info(db)?)?;
    let conn = client.get_connection_with_timeout(config.connection_timeout)?;
    if let Some(timeout) = config.response_timeout {
        conn.set_read_timeout(Some(timeout))?;
        conn.set_write_timeout(Some(timeout))?;
    }
    Ok(conn)
}

// One connect attempt: no retry loop, failures are logged and counted
pub(crate) fn open_connection(config: &FacadeConfig, db: i64, stats: &RwLock<ConnectionStats>) -> FacadeResult<Connection> {
    let started = Instant::now();
    match connect_blocking(config, db) {
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

pub(crate) fn connect_error(err: FacadeError) -> FacadeError {
    match err {
        FacadeError::Redis(e) => FacadeError::Unavailable(e.to_string()),
        FacadeError::Timeout(limit) => FacadeError::Unavailable(format!("connect timed out after {:?}", limit)),
        other => other,
    }
}

fn not_connected() -> FacadeError {
    FacadeError::Unavailable("no open connection".to_string())
}

// ================ Shared connection ================

#[derive(Default)]
struct SharedSlot {
    conn: Option<Connection>,
    selected_db: Option<i64>,
}

/// A single persistent connection reused for every database.
///
/// The slot lock is held across `SELECT` and the command, so callers targeting
/// different databases can share one instance without stepping on each other.
pub struct SharedConnection {
    config: FacadeConfig,
    slot: Mutex<SharedSlot>,
    stats: Arc<RwLock<ConnectionStats>>,
}

impl SharedConnection {
    pub fn new(config: FacadeConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(SharedSlot::default()),
            stats: Arc::new(RwLock::new(ConnectionStats::new())),
        }
    }

    fn ensure_connected(&self, slot: &mut SharedSlot) -> FacadeResult<()> {
        if slot.conn.is_none() {
            let conn = open_connection(&self.config, self.config.database, &self.stats)?;
            slot.conn = Some(conn);
            slot.selected_db = Some(self.config.database);
        }
        Ok(())
    }

    fn discard(&self, slot: &mut SharedSlot) {
        slot.selected_db = None;
        if slot.conn.take().is_some() {
            self.stats.write().record_disconnect();
        }
    }

    fn run(slot: &mut SharedSlot, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let SharedSlot { conn, selected_db } = slot;
        let conn = conn.as_mut().ok_or_else(not_connected)?;

        if *selected_db != Some(db) {
            redis::cmd("SELECT").arg(db).query::<()>(conn)?;
            *selected_db = Some(db);
            debug!(db, "selected database");
        }

        Ok(pipe.query::<Vec<Value>>(conn)?)
    }
}

impl ConnectionBackend for SharedConnection {
    fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let mut slot = self.slot.lock();
        self.ensure_connected(&mut slot)?;

        match Self::run(&mut slot, db, pipe) {
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

    fn connect(&self) -> FacadeResult<()> {
        let mut slot = self.slot.lock();
        self.ensure_connected(&mut slot)
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

    fn close(&self) {
        let mut slot = self.slot.lock();
        if slot.conn.is_some() {
            self.discard(&mut slot);
            debug!(address = %self.config.address(), "redis connection closed");
        }
    }
}

// ================ Connection per database ================

type ConnectionSlot = Arc<Mutex<Option<Connection>>>;

/// One persistent connection per logical database, each opened on first use
/// with the index baked into its connection info. No `SELECT` is ever sent.
pub struct DatabaseConnections {
    config: FacadeConfig,
    slots: Mutex<HashMap<i64, ConnectionSlot>>,
    stats: Arc<RwLock<ConnectionStats>>,
}

impl DatabaseConnections {
    pub fn new(config: FacadeConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
            stats: Arc::new(RwLock::new(ConnectionStats::new())),
        }
    }

    fn slot(&self, db: i64) -> ConnectionSlot {
        self.slots.lock().entry(db).or_default().clone()
    }

    fn ensure_connected(&self, db: i64, conn: &mut Option<Connection>) -> FacadeResult<()> {
        if conn.is_none() {
            *conn = Some(open_connection(&self.config, db, &self.stats)?);
        }
        Ok(())
    }

    // Drops the map entry for `db` when it is still empty and nobody else holds it.
    // Takes the map lock, so the caller must not hold the slot lock.
    fn release_if_unused(&self, db: i64, slot: &ConnectionSlot) {
        let mut slots = self.slots.lock();
        let unused = slots
            .get(&db)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2 && current.lock().is_none());
        if unused {
            slots.remove(&db);
        }
    }
}

impl ConnectionBackend for DatabaseConnections {
    fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let slot = self.slot(db);
        let mut conn = slot.lock();
        if let Err(err) = self.ensure_connected(db, &mut conn) {
            drop(conn);
            self.release_if_unused(db, &slot);
            return Err(err);
        }

        let result = match conn.as_mut() {
            Some(conn) => pipe.query::<Vec<Value>>(conn).map_err(FacadeError::from),
            None => Err(not_connected()),
        };

        match result {
            Ok(values) => {
                self.stats.write().record_success();
                Ok(values)
            }
            Err(err) => {
                self.stats.write().record_error();
                if err.is_connection_fault() {
                    warn!(address = %self.config.address(), db, error = %err, "discarding broken redis connection");
                    if conn.take().is_some() {
                        self.stats.write().record_disconnect();
                    }
                    return Err(err.into_unavailable());
                }
                Err(err)
            }
        }
    }

    fn connect(&self) -> FacadeResult<()> {
        let db = self.config.database;
        let slot = self.slot(db);
        let mut conn = slot.lock();
        let result = self.ensure_connected(db, &mut conn);
        drop(conn);
        if result.is_err() {
            self.release_if_unused(db, &slot);
        }
        result
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

    fn close(&self) {
        let mut slots = self.slots.lock();
        slots.retain(|db, slot| {
            if slot.lock().take().is_some() {
                self.stats.write().record_disconnect();
                debug!(address = %self.config.address(), db, "redis connection closed");
            }
            // Keep slots another caller still holds; a later close reaches them
            Arc::strong_count(slot) > 1
        });
    }
}
