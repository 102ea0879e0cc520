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
use crate::{AsyncConnectionBackend, AsyncKeyValueClient, ConnectionState, ConnectionStats, FacadeConfig};

/// Async counterpart of [`KeyValueFacade`](crate::KeyValueFacade).
pub struct AsyncKeyValueFacade {
    client: AsyncKeyValueClient,
}

impl AsyncKeyValueFacade {
    pub fn new(config: FacadeConfig) -> Self {
        Self { client: AsyncKeyValueClient::new(config) }
    }

    pub fn from_env() -> Self {
        Self::new(config_from_env())
    }

    pub fn with_client(client: AsyncKeyValueClient) -> Self {
        Self { client }
    }

    pub fn with_backend(config: FacadeConfig, backend: Arc<dyn AsyncConnectionBackend>) -> Self {
        Self::with_client(AsyncKeyValueClient::with_backend(config, backend))
    }

    pub fn client(&self) -> &AsyncKeyValueClient {
        &self.client
    }

    pub fn config(&self) -> &FacadeConfig {
        self.client.config()
    }

    // ================ Connection ================

    pub async fn connect(&self) -> bool {
        settle("connect", self.config().database, self.client.connect().await.map(|_| true), false)
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

    pub async fn close(&self) {
        self.client.close().await
    }

    pub async fn ping(&self) -> bool {
        settle("ping", self.config().database, self.client.ping().await.map(|_| true), false)
    }

    // ================ Strings ================

    pub async fn get<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("get", db, self.client.get(db, key).await, None)
    }

    pub async fn set<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> bool {
        settle("set", db, self.client.set(db, key, value, expire).await.map(|_| true), false)
    }

    pub async fn delete<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("delete", db, self.client.delete(db, key).await, 0)
    }

    pub async fn exists<K: ToRedisArgs>(&self, db: i64, key: K) -> bool {
        settle("exists", db, self.client.exists(db, key).await, false)
    }

    pub async fn ttl<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("ttl", db, self.client.ttl(db, key).await.map(|ttl| ttl.as_seconds()), -1)
    }

    pub async fn expire<K: ToRedisArgs>(&self, db: i64, key: K, expire: Duration) -> bool {
        settle("expire", db, self.client.expire(db, key, expire).await, false)
    }

    pub async fn keys(&self, db: i64, pattern: Option<&str>) -> Vec<String> {
        settle("keys", db, self.client.keys(db, pattern).await, Vec::new())
    }

    pub async fn incr<K: ToRedisArgs>(&self, db: i64, key: K) -> Option<i64> {
        settle("incr", db, self.client.incr(db, key).await.map(Some), None)
    }

    pub async fn decr<K: ToRedisArgs>(&self, db: i64, key: K) -> Option<i64> {
        settle("decr", db, self.client.decr(db, key).await.map(Some), None)
    }

    pub async fn append<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V) -> Option<i64> {
        settle("append", db, self.client.append(db, key, value).await.map(Some), None)
    }

    pub async fn mget<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<Option<T>> {
        settle("mget", db, self.client.mget(db, keys).await, Vec::new())
    }

    pub async fn mset<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, pairs: &[(K, V)]) -> bool {
        settle("mset", db, self.client.mset(db, pairs).await.map(|_| true), false)
    }

    // ================ Hashes ================

    pub async fn hget<K: ToRedisArgs, F: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K, field: F) -> Option<T> {
        settle("hget", db, self.client.hget(db, key, field).await, None)
    }

    pub async fn hset<K, F, V>(&self, db: i64, key: K, field: F, value: V, expire: Option<Duration>) -> bool
    where
        K: ToRedisArgs,
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        settle("hset", db, self.client.hset(db, key, field, value, expire).await.map(|_| true), false)
    }

    pub async fn hgetall<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> HashMap<String, T> {
        settle("hgetall", db, self.client.hgetall(db, key).await, HashMap::new())
    }

    // ================ Lists ================

    pub async fn lpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> Option<i64> {
        settle("lpush", db, self.client.lpush(db, key, value, expire).await.map(Some), None)
    }

    pub async fn rpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> Option<i64> {
        settle("rpush", db, self.client.rpush(db, key, value, expire).await.map(Some), None)
    }

    pub async fn lpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("lpop", db, self.client.lpop(db, key).await, None)
    }

    pub async fn rpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Option<T> {
        settle("rpop", db, self.client.rpop(db, key).await, None)
    }

    pub async fn llen<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("llen", db, self.client.llen(db, key).await, 0)
    }

    // ================ Sets ================

    pub async fn sadd<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M, expire: Option<Duration>) -> Option<i64> {
        settle("sadd", db, self.client.sadd(db, key, member, expire).await.map(Some), None)
    }

    pub async fn srem<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> Option<i64> {
        settle("srem", db, self.client.srem(db, key, member).await.map(Some), None)
    }

    pub async fn smembers<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> Vec<T> {
        settle("smembers", db, self.client.smembers(db, key).await, Vec::new())
    }

    pub async fn scard<K: ToRedisArgs>(&self, db: i64, key: K) -> i64 {
        settle("scard", db, self.client.scard(db, key).await, 0)
    }

    pub async fn sinter<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sinter", db, self.client.sinter(db, keys).await, Vec::new())
    }

    pub async fn sunion<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sunion", db, self.client.sunion(db, keys).await, Vec::new())
    }

    pub async fn sdiff<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> Vec<T> {
        settle("sdiff", db, self.client.sdiff(db, keys).await, Vec::new())
    }

    pub async fn sismember<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> bool {
        settle("sismember", db, self.client.sismember(db, key, member).await, false)
    }

    // ================ Server ================

    pub async fn flushdb(&self, db: i64) -> bool {
        settle("flushdb", db, self.client.flushdb(db).await.map(|_| true), false)
    }

    pub async fn info(&self) -> Option<String> {
        settle("info", self.config().database, self.client.info().await.map(Some), None)
    }
}

impl Drop for AsyncKeyValueFacade {
    fn drop(&mut self) {
        // Cannot await here; releases whatever handle is not currently in use.
        self.client.try_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{bulk, Scripted, ScriptedBackend};
    use crate::BackendKind;
    use redis::Value;

    fn scripted() -> (Arc<ScriptedBackend>, AsyncKeyValueFacade) {
        let backend = Arc::new(ScriptedBackend::new());
        let facade = AsyncKeyValueFacade::with_backend(FacadeConfig::default(), backend.clone());
        (backend, facade)
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_defaults() {
        for kind in [BackendKind::Shared, BackendKind::PerDatabase] {
            let config = FacadeConfig::single_server("127.0.0.1", 1)
                .with_connection_timeout(Duration::from_millis(200))
                .with_backend(kind);
            let facade = AsyncKeyValueFacade::new(config);

            assert!(!facade.connect().await);
            assert_eq!(facade.get::<_, String>(0, "k").await, None);
            assert!(!facade.set(0, "k", "v", Some(Duration::from_secs(1))).await);
            assert_eq!(facade.ttl(0, "k").await, -1);
            assert_eq!(facade.decr(0, "n").await, None);
            assert_eq!(facade.append(0, "k", "tail").await, None);
            assert_eq!(facade.hget::<_, _, String>(0, "h", "f").await, None);
            assert_eq!(facade.rpop::<_, String>(0, "l").await, None);
            assert_eq!(facade.srem(0, "s", "m").await, None);
            assert_eq!(facade.scard(0, "s").await, 0);
            assert!(facade.sdiff::<_, String>(0, &["a", "b"]).await.is_empty());
            assert!(!facade.expire(0, "k", Duration::from_secs(5)).await);
            assert!(!facade.ping().await);
            assert!(!facade.is_connected());
        }
    }

    #[tokio::test]
    async fn test_reset_stats_reaches_the_backend() {
        for kind in [BackendKind::Shared, BackendKind::PerDatabase] {
            let config = FacadeConfig::single_server("127.0.0.1", 1)
                .with_connection_timeout(Duration::from_millis(200))
                .with_backend(kind);
            let facade = AsyncKeyValueFacade::new(config);
            assert_eq!(facade.incr(0, "n").await, None);
            assert_eq!(facade.stats().connect_failures, 1);

            facade.reset_stats();
            assert_eq!(facade.stats().connect_failures, 0);
        }
    }

    #[tokio::test]
    async fn test_values_pass_through() {
        let (backend, facade) = scripted();
        backend
            .reply(Value::Okay)
            .reply(bulk("v"))
            .reply(Value::Array(vec![bulk("1"), Value::Nil]))
            .reply(Value::Int(1));

        assert!(facade.set(3, "k", "v", None).await);
        assert_eq!(facade.get::<_, String>(3, "k").await, Some("v".to_string()));
        let values: Vec<Option<i64>> = facade.mget(3, &["a", "b"]).await;
        assert_eq!(values, vec![Some(1), None]);
        assert!(facade.sismember(3, "s", "m").await);
        assert!(backend.calls().iter().all(|(db, _)| *db == 3));
    }

    #[tokio::test]
    async fn test_failures_return_defaults() {
        let (backend, facade) = scripted();
        backend
            .push(Scripted::Down)
            .push(Scripted::Fail("ERR value is not an integer or out of range"));

        assert!(facade.hgetall::<_, String>(0, "h").await.is_empty());
        assert_eq!(facade.incr(0, "not-a-number").await, None);
        assert_eq!(facade.delete(-1, "k").await, 0);
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_close_and_drop_release_backend() {
        let (backend, facade) = scripted();
        facade.close().await;
        drop(facade);
        assert_eq!(backend.closed(), 2);
    }

    fn unique(name: &str) -> String {
        format!("facade-test:{}:{}", uuid::Uuid::new_v4(), name)
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_collections() {
        let facade = AsyncKeyValueFacade::new(FacadeConfig::from_env().unwrap_or_default());
        let (hash, list, left, right) = (unique("hash"), unique("list"), unique("left"), unique("right"));

        assert!(facade.hset(0, &hash, "name", "ada", None).await);
        assert_eq!(facade.hget::<_, _, String>(0, &hash, "name").await, Some("ada".to_string()));

        assert_eq!(facade.rpush(0, &list, "a", None).await, Some(1));
        assert_eq!(facade.lpush(0, &list, "b", None).await, Some(2));
        assert_eq!(facade.lpop::<_, String>(0, &list).await, Some("b".to_string()));
        assert_eq!(facade.llen(0, &list).await, 1);

        assert_eq!(facade.sadd(0, &left, "x", None).await, Some(1));
        assert_eq!(facade.sadd(0, &left, "y", None).await, Some(1));
        assert_eq!(facade.sadd(0, &right, "y", None).await, Some(1));
        let keys = [left.as_str(), right.as_str()];
        assert_eq!(facade.sinter::<_, String>(0, &keys).await, vec!["y".to_string()]);
        assert_eq!(facade.sdiff::<_, String>(0, &keys).await, vec!["x".to_string()]);
        assert_eq!(facade.sunion::<_, String>(0, &keys).await.len(), 2);

        for key in [&hash, &list, &left, &right] {
            facade.delete(0, key).await;
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_databases_do_not_interfere() {
        let facade = Arc::new(AsyncKeyValueFacade::new(FacadeConfig::from_env().unwrap_or_default()));
        let key = unique("shared-name");

        let mut tasks = Vec::new();
        for db in 1..=4i64 {
            let facade = facade.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..20 {
                    let value = format!("{}:{}", db, round);
                    assert!(facade.set(db, &key, &value, None).await);
                    assert_eq!(facade.get::<_, String>(db, &key).await, Some(value));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        for db in 1..=4 {
            facade.delete(db, &key).await;
        }
    }
}
