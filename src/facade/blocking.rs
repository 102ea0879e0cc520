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
use redis::{FromRedisValue, ToRedisArgs};

use crate::facade::{config_from_env, settle};
use crate::{ConnectionBackend, ConnectionState, ConnectionStats, FacadeConfig, KeyValueClient};

/// Blocking key-value facade.
///
/// Connects on first use and returns a default instead of an error whenever
/// the server is unreachable or rejects a command. Use [`client`](Self::client)
/// when the difference between "absent" and "unavailable" matters.
///
/// ```no_run
/// use redis_facade::{FacadeConfig, KeyValueFacade};
///
/// let facade = KeyValueFacade::new(FacadeConfig::single_server("127.0.0.1", 6379));
/// facade.set(0, "greeting", "hello", None);
/// let value: Option<String> = facade.get(0, "greeting");
/// ```
pub struct KeyValueFacade {
    client: KeyValueClient,
}

impl KeyValueFacade {
    pub fn new(config: FacadeConfig) -> Self {
        Self { client: KeyValueClient::new(config) }
    }

    /// Reads `REDIS_*` variables (and `.env`); falls back to the defaults when they are malformed.
    pub fn from_env() -> Self {
        Self::new(config_from_env())
    }

    pub fn with_client(client: KeyValueClient) -> Self {
        Self { client }
    }

    pub fn with_backend(config: FacadeConfig, backend: Arc<dyn ConnectionBackend>) -> Self {
        Self::with_client(KeyValueClient::with_backend(config, backend))
    }

    pub fn client(&self) -> &KeyValueClient {
        &self.client
    }

    pub fn config(&self) -> &FacadeConfig {
        self.client.config()
    }

    // ================ Connection ================

    /// Opens the connection now instead of on first use.
    pub fn connect(&self) -> bool {
        settle("connect", self.config().database, self.client.connect().map(|_| true), false)
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.client.stats()
    }

    pub fn reset_stats(&self) {
        self.client.reset_stats()
    }

    pub fn close(&self) {
        self.client.close()
    }

    pub fn ping(&self) -> bool {
        settle("ping", self.config().database, self.client.ping().map(|_| true), false)
    }

    // ================ Strings ================

    pub fn get<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("get", db, self.client.get(db, key), None)
    }

    pub fn set<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> bool {
        settle("set", db, self.client.set(db, key, value, expire).map(|_| true), false)
    }

    pub fn delete<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("delete", db, self.client.delete(db, key), 0)
    }

    pub fn exists<K: ToRedisArgs>(&self, db: i64, key: K) -> bool {
        settle("exists", db, self.client.exists(db, key), false)
    }

    /// Remaining seconds; `-1` when the key has no expiry, does not exist, or the call failed.
    pub fn ttl<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("ttl", db, self.client.ttl(db, key).map(|ttl| ttl.as_seconds()), -1)
    }

    pub fn expire<K: ToRedisArgs>(&self, db: i64, key: K, expire: Duration) -> bool {
        settle("expire", db, self.client.expire(db, key, expire), false)
    }

    pub fn keys(&self, db: i64, pattern: Option<&str>) -> Vec<String> {
        settle("keys", db, self.client.keys(db, pattern), Vec::new())
    }

    pub fn incr<K: ToRedisArgs>(&self, db: i64, key: K) -> Option<i64> {
        settle("incr", db, self.client.incr(db, key).map(Some), None)
    }

    pub fn decr<K: ToRedisArgs>(&self, db: i64, key: K) -> Option<i64> {
        settle("decr", db, self.client.decr(db, key).map(Some), None)
    }

    pub fn append<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V) -> Option<i64> {
        settle("append", db, self.client.append(db, key, value).map(Some), None)
    }

    /// One entry per requested key, in request order.
    pub fn mget<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<Option<T>> {
        settle("mget", db, self.client.mget(db, keys), Vec::new())
    }

    pub fn mset<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, pairs: &[(K, V)]) -> bool {
        settle("mset", db, self.client.mset(db, pairs).map(|_| true), false)
    }

    // ================ Hashes ================

    pub fn hget<K: ToRedisArgs, F: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K, field: F) -> Option<T> {
        settle("hget", db, self.client.hget(db, key, field), None)
    }

    /// True once the field is written, whether it was created or overwritten.
    pub fn hset<K, F, V>(&self, db: i64, key: K, field: F, value: V, expire: Option<Duration>) -> bool
    where
        K: ToRedisArgs,
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        settle("hset", db, self.client.hset(db, key, field, value, expire).map(|_| true), false)
    }

    pub fn hgetall<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> HashMap<String, T> {
        settle("hgetall", db, self.client.hgetall(db, key), HashMap::new())
    }

    // ================ Lists ================

    pub fn lpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> Option<i64> {
        settle("lpush", db, self.client.lpush(db, key, value, expire).map(Some), None)
    }

    pub fn rpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> Option<i64> {
        settle("rpush", db, self.client.rpush(db, key, value, expire).map(Some), None)
    }

    pub fn lpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("lpop", db, self.client.lpop(db, key), None)
    }

    pub fn rpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("rpop", db, self.client.rpop(db, key), None)
    }

    pub fn llen<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("llen", db, self.client.llen(db, key), 0)
    }

    // ================ Sets ================

    pub fn sadd<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M, expire: Option<Duration>) -> Option<i64> {
        settle("sadd", db, self.client.sadd(db, key, member, expire).map(Some), None)
    }

    pub fn srem<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> Option<i64> {
        settle("srem", db, self.client.srem(db, key, member).map(Some), None)
    }

    pub fn smembers<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Vec<T> {
        settle("smembers", db, self.client.smembers(db, key), Vec::new())
    }

    pub fn scard<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("scard", db, self.client.scard(db, key), 0)
    }

    pub fn sinter<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sinter", db, self.client.sinter(db, keys), Vec::new())
    }

    pub fn sunion<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sunion", db, self.client.sunion(db, keys), Vec::new())
    }

    pub fn sdiff<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sdiff", db, self.client.sdiff(db, keys), Vec::new())
    }

    pub fn sismember<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> bool {
        settle("sismember", db, self.client.sismember(db, key, member), false)
    }

    // ================ Server ================

    pub fn flushdb(&self, db: i64) -> bool {
        settle("flushdb", db, self.client.flushdb(db).map(|_| true), false)
    }

    pub fn info(&self) -> Option<String> {
        settle("info", self.config().database, self.client.info().map(Some), None)
    }
}

impl Drop for KeyValueFacade {
    fn drop(&mut self) {
        self.client.close();
    }
}
