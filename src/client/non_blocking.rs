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
use std::time::Duration;
use redis::{FromRedisValue, Pipeline, ToRedisArgs};

use crate::client::check_db;
use crate::commands::{self, first_reply, KeyTtl};
use crate::{AsyncConnectionBackend, AsyncDatabaseConnections, AsyncSharedConnection, BackendKind, ConnectionState, ConnectionStats, FacadeConfig, FacadeResult};

/// Async client that reports every failure; see [`KeyValueClient`](crate::KeyValueClient).
#[derive(Clone)]
pub struct AsyncKeyValueClient {
    config: FacadeConfig,
    backend: Arc<dyn AsyncConnectionBackend>,
}

impl AsyncKeyValueClient {
    pub fn new(config: FacadeConfig) -> Self {
        let backend: Arc<dyn AsyncConnectionBackend> = match config.backend {
            BackendKind::Shared => Arc::new(AsyncSharedConnection::new(config.clone())),
            BackendKind::PerDatabase => Arc::new(AsyncDatabaseConnections::new(config.clone())),
        };
        Self { config, backend }
    }

    pub fn from_env() -> FacadeResult<Self> {
        Ok(Self::new(FacadeConfig::from_env()?))
    }

    pub fn with_backend(config: FacadeConfig, backend: Arc<dyn AsyncConnectionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    async fn query<T: FromRedisValue>(&self, db: i64, pipe: &Pipeline) -> FacadeResult<T> {
        check_db(db)?;
        let values = self.backend.query(db, pipe).await?;
        Ok(T::from_redis_value(first_reply(values))?)
    }

    // ================ Connection ================

    pub async fn connect(&self) -> FacadeResult<()> {
        self.backend.connect().await
    }

    pub fn is_connected(&self) -> bool {
        self.backend.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.backend.state()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.backend.stats()
    }

    /// Starts a fresh measurement window. [`stats`](Self::stats) returns a copy, so reset here.
    pub fn reset_stats(&self) {
        self.backend.reset_stats()
    }

    pub async fn close(&self) {
        self.backend.close().await
    }

    pub(crate) fn try_close(&self) {
        self.backend.try_close()
    }

    pub async fn ping(&self) -> FacadeResult<()> {
        self.query::<String>(self.config.database, &commands::ping()).await?;
        Ok(())
    }

    // ================ Strings ================

    pub async fn get<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::get(key)).await
    }

    pub async fn set<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<()> {
        let pipe = commands::set(key, value, expire)?;
        self.query(db, &pipe).await
    }

    pub async fn delete<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::delete(key)).await
    }

    pub async fn exists<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<bool> {
        let found: i64 = self.query(db, &commands::exists(key)).await?;
        Ok(found > 0)
    }

    pub async fn ttl<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<KeyTtl> {
        let seconds: i64 = self.query(db, &commands::ttl(key)).await?;
        Ok(KeyTtl::from_seconds(seconds))
    }

    pub async fn expire<K: ToRedisArgs>(&self, db: i64, key: K, expire: Duration) -> FacadeResult<bool> {
        let pipe = commands::expire(key, expire)?;
        let applied: i64 = self.query(db, &pipe).await?;
        Ok(applied > 0)
    }

    pub async fn keys(&self, db: i64, pattern: Option<&str>) -> FacadeResult<Vec<String>> {
        self.query(db, &commands::keys(pattern)).await
    }

    pub async fn incr<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::incr(key)).await
    }

    pub async fn decr<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::decr(key)).await
    }

    pub async fn append<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V) -> FacadeResult<i64> {
        self.query(db, &commands::append(key, value)).await
    }

    pub async fn mget<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<Option<T>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pipe = commands::mget(keys);
        self.query(db, &pipe).await
    }

    pub async fn mset<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, pairs: &[(K, V)]) -> FacadeResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let pipe = commands::mset(pairs);
        self.query(db, &pipe).await
    }

    // ================ Hashes ================

    pub async fn hget<K: ToRedisArgs, F: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K, field: F) -> FacadeResult<Option<T>> {
        self.query(db, &commands::hget(key, field)).await
    }

    pub async fn hset<K, F, V>(&self, db: i64, key: K, field: F, value: V, expire: Option<Duration>) -> FacadeResult<i64>
    where
        K: ToRedisArgs,
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        let pipe = commands::hset(key, field, value, expire)?;
        self.query(db, &pipe).await
    }

    pub async fn hgetall<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<HashMap<String, T>> {
        self.query(db, &commands::hgetall(key)).await
    }

    // ================ Lists ================

    pub async fn lpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<i64> {
        let pipe = commands::lpush(key, value, expire)?;
        self.query(db, &pipe).await
    }

    pub async fn rpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<i64> {
        let pipe = commands::rpush(key, value, expire)?;
        self.query(db, &pipe).await
    }

    pub async fn lpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::lpop(key)).await
    }

    pub async fn rpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::rpop(key)).await
    }

    pub async fn llen<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::llen(key)).await
    }

    // ================ Sets ================

    pub async fn sadd<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M, expire: Option<Duration>) -> FacadeResult<i64> {
        let pipe = commands::sadd(key, member, expire)?;
        self.query(db, &pipe).await
    }

    pub async fn srem<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> FacadeResult<i64> {
        self.query(db, &commands::srem(key, member)).await
    }

    pub async fn smembers<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Vec<T>> {
        self.query(db, &commands::smembers(key)).await
    }

    pub async fn scard<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::scard(key)).await
    }

    pub async fn sinter<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pipe = commands::sinter(keys);
        self.query(db, &pipe).await
    }

    pub async fn sunion<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pipe = commands::sunion(keys);
        self.query(db, &pipe).await
    }

    pub async fn sdiff<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pipe = commands::sdiff(keys);
        self.query(db, &pipe).await
    }

    pub async fn sismember<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> FacadeResult<bool> {
        let found: i64 = self.query(db, &commands::sismember(key, member)).await?;
        Ok(found > 0)
    }

    // ================ Server ================

    pub async fn flushdb(&self, db: i64) -> FacadeResult<()> {
        self.query(db, &commands::flushdb()).await
    }

    pub async fn info(&self) -> FacadeResult<String> {
        self.query(self.config.database, &commands::info()).await
    }
}
