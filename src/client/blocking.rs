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
use crate::{BackendKind, ConnectionBackend, ConnectionState, ConnectionStats, DatabaseConnections, FacadeConfig, FacadeResult, SharedConnection};

/// Blocking client that reports every failure.
///
/// `Ok(None)` means the server answered "absent"; connection problems come back
/// as [`FacadeError::Unavailable`](crate::FacadeError::Unavailable) and command
/// problems as `Redis` or `UnexpectedReply`.
#[derive(Clone)]
pub struct KeyValueClient {
    config: FacadeConfig,
    backend: Arc<dyn ConnectionBackend>,
}

impl KeyValueClient {
    pub fn new(config: FacadeConfig) -> Self {
        let backend: Arc<dyn ConnectionBackend> = match config.backend {
            BackendKind::Shared => Arc::new(SharedConnection::new(config.clone())),
            BackendKind::PerDatabase => Arc::new(DatabaseConnections::new(config.clone())),
        };
        Self { config, backend }
    }

    pub fn from_env() -> FacadeResult<Self> {
        Ok(Self::new(FacadeConfig::from_env()?))
    }

    pub fn with_backend(config: FacadeConfig, backend: Arc<dyn ConnectionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    fn query<T: FromRedisValue>(&self, db: i64, pipe: &Pipeline) -> FacadeResult<T> {
        check_db(db)?;
        let values = self.backend.query(db, pipe)?;
        Ok(T::from_redis_value(first_reply(values))?)
    }

    // ================ Connection ================

    pub fn connect(&self) -> FacadeResult<()> {
        self.backend.connect()
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

    pub fn close(&self) {
        self.backend.close()
    }

    pub fn ping(&self) -> FacadeResult<()> {
        self.query::<String>(self.config.database, &commands::ping())?;
        Ok(())
    }

    // ================ Strings ================

    pub fn get<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::get(key))
    }

    pub fn set<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<()> {
        self.query(db, &commands::set(key, value, expire)?)
    }

    pub fn delete<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::delete(key))
    }

    pub fn exists<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<bool> {
        let found: i64 = self.query(db, &commands::exists(key))?;
        Ok(found > 0)
    }

    pub fn ttl<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<KeyTtl> {
        let seconds: i64 = self.query(db, &commands::ttl(key))?;
        Ok(KeyTtl::from_seconds(seconds))
    }

    /// Returns false when the key does not exist.
    pub fn expire<K: ToRedisArgs>(&self, db: i64, key: K, expire: Duration) -> FacadeResult<bool> {
        let applied: i64 = self.query(db, &commands::expire(key, expire)?)?;
        Ok(applied > 0)
    }

    /// `KEYS pattern` (all keys when `None`). Scans the whole keyspace of `db`.
    pub fn keys(&self, db: i64, pattern: Option<&str>) -> FacadeResult<Vec<String>> {
        self.query(db, &commands::keys(pattern))
    }

    pub fn incr<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::incr(key))
    }

    pub fn decr<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::decr(key))
    }

    pub fn append<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V) -> FacadeResult<i64> {
        self.query(db, &commands::append(key, value))
    }

    pub fn mget<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<Option<T>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(db, &commands::mget(keys))
    }

    pub fn mset<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, pairs: &[(K, V)]) -> FacadeResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        self.query(db, &commands::mset(pairs))
    }

    // ================ Hashes ================

    pub fn hget<K: ToRedisArgs, F: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K, field: F) -> FacadeResult<Option<T>> {
        self.query(db, &commands::hget(key, field))
    }

    /// Returns the number of fields created (0 when an existing field was overwritten).
    pub fn hset<K, F, V>(&self, db: i64, key: K, field: F, value: V, expire: Option<Duration>) -> FacadeResult<i64>
    where
        K: ToRedisArgs,
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        self.query(db, &commands::hset(key, field, value, expire)?)
    }

    pub fn hgetall<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<HashMap<String, T>> {
        self.query(db, &commands::hgetall(key))
    }

    // ================ Lists ================

    pub fn lpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<i64> {
        self.query(db, &commands::lpush(key, value, expire)?)
    }

    pub fn rpush<K: ToRedisArgs, V: ToRedisArgs>(&self, db: i64, key: K, value: V, expire: Option<Duration>) -> FacadeResult<i64> {
        self.query(db, &commands::rpush(key, value, expire)?)
    }

    pub fn lpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::lpop(key))
    }

    pub fn rpop<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Option<T>> {
        self.query(db, &commands::rpop(key))
    }

    pub fn llen<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::llen(key))
    }

    // ================ Sets ================

    pub fn sadd<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M, expire: Option<Duration>) -> FacadeResult<i64> {
        self.query(db, &commands::sadd(key, member, expire)?)
    }

    pub fn srem<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> FacadeResult<i64> {
        self.query(db, &commands::srem(key, member))
    }

    pub fn smembers<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, key: K) -> FacadeResult<Vec<T>> {
        self.query(db, &commands::smembers(key))
    }

    pub fn scard<K: ToRedisArgs>(&self, db: i64, key: K) -> FacadeResult<i64> {
        self.query(db, &commands::scard(key))
    }

    pub fn sinter<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(db, &commands::sinter(keys))
    }

    pub fn sunion<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(db, &commands::sunion(keys))
    }

    pub fn sdiff<K: ToRedisArgs, T: FromRedisValue>(&self, db: i64, keys: &[K]) -> FacadeResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(db, &commands::sdiff(keys))
    }

    pub fn sismember<K: ToRedisArgs, M: ToRedisArgs>(&self, db: i64, key: K, member: M) -> FacadeResult<bool> {
        let found: i64 = self.query(db, &commands::sismember(key, member))?;
        Ok(found > 0)
    }

    // ================ Server ================

    /// Removes every key of `db`. Irreversible.
    pub fn flushdb(&self, db: i64) -> FacadeResult<()> {
        self.query(db, &commands::flushdb())
    }

    pub fn info(&self) -> FacadeResult<String> {
        self.query(self.config.database, &commands::info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{bulk, Scripted, ScriptedBackend};
    use crate::FacadeError;
    use redis::Value;

    fn scripted() -> (Arc<ScriptedBackend>, KeyValueClient) {
        let backend = Arc::new(ScriptedBackend::new());
        let client = KeyValueClient::with_backend(FacadeConfig::default(), backend.clone());
        (backend, client)
    }

    #[test]
    fn test_get_distinguishes_absent_from_unavailable() {
        let (backend, client) = scripted();
        backend.reply(bulk("v")).reply(Value::Nil).push(Scripted::Down);

        assert_eq!(client.get::<_, String>(0, "k").unwrap(), Some("v".to_string()));
        assert_eq!(client.get::<_, String>(0, "k").unwrap(), None);
        let err = client.get::<_, String>(0, "k").unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_db_index_travels_with_every_call() {
        let (backend, client) = scripted();
        backend.reply(Value::Okay).reply(bulk("x"));

        client.set(7, "k", "x", None).unwrap();
        let _: Option<String> = client.get(2, "k").unwrap();

        let calls = backend.calls();
        assert_eq!(calls[0].0, 7);
        assert!(calls[0].1.contains("SET"));
        assert_eq!(calls[1].0, 2);
        assert!(calls[1].1.contains("GET"));
    }

    #[test]
    fn test_negative_db_never_reaches_backend() {
        let (backend, client) = scripted();
        let err = client.get::<_, String>(-1, "k").unwrap_err();
        assert!(matches!(err, FacadeError::InvalidArgument(_)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_ttl_decodes_sentinels() {
        let (backend, client) = scripted();
        backend.reply(Value::Int(-2)).reply(Value::Int(-1)).reply(Value::Int(30));

        assert_eq!(client.ttl(0, "gone").unwrap(), KeyTtl::Missing);
        assert_eq!(client.ttl(0, "forever").unwrap(), KeyTtl::Persistent);
        assert_eq!(client.ttl(0, "soon").unwrap(), KeyTtl::Expires(Duration::from_secs(30)));
    }

    #[test]
    fn test_mget_keeps_request_order() {
        let (backend, client) = scripted();
        backend.reply(Value::Array(vec![bulk("1"), Value::Nil, bulk("2")]));

        let values: Vec<Option<i64>> = client.mget(0, &["a", "missing", "b"]).unwrap();
        assert_eq!(values, vec![Some(1), None, Some(2)]);
    }

    #[test]
    fn test_empty_key_lists_skip_the_server() {
        let (backend, client) = scripted();
        let empty: [&str; 0] = [];

        assert!(client.mget::<_, String>(0, &empty).unwrap().is_empty());
        assert!(client.sinter::<_, String>(0, &empty).unwrap().is_empty());
        assert!(client.sunion::<_, String>(0, &empty).unwrap().is_empty());
        assert!(client.sdiff::<_, String>(0, &empty).unwrap().is_empty());
        client.mset::<&str, &str>(0, &[]).unwrap();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_hgetall_collects_pairs() {
        let (backend, client) = scripted();
        backend.reply(Value::Array(vec![bulk("name"), bulk("ada"), bulk("lang"), bulk("rust")]));

        let fields: HashMap<String, String> = client.hgetall(1, "user:1").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["lang"], "rust");
    }

    #[test]
    fn test_boolean_replies() {
        let (backend, client) = scripted();
        backend
            .reply(Value::Int(1))
            .reply(Value::Int(0))
            .reply(Value::Int(1))
            .reply(Value::Int(0));

        assert!(client.exists(0, "k").unwrap());
        assert!(!client.exists(0, "k").unwrap());
        assert!(client.sismember(0, "s", "m").unwrap());
        assert!(!client.expire(0, "missing", Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_command_error_is_not_unavailable() {
        let (backend, client) = scripted();
        backend.push(Scripted::Fail("WRONGTYPE Operation against a key holding the wrong kind of value"));

        let err = client.llen(0, "a-string").unwrap_err();
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_zero_expiry_rejected_before_sending() {
        let (backend, client) = scripted();
        let err = client.lpush(0, "l", "v", Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, FacadeError::InvalidArgument(_)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_info_runs_on_default_database() {
        let backend = Arc::new(ScriptedBackend::new());
        let client = KeyValueClient::with_backend(FacadeConfig::default().with_database(3), backend.clone());
        backend.reply(bulk("# Server\r\nredis_version:7.2.4\r\n"));

        let info = client.info().unwrap();
        assert!(info.contains("redis_version"));
        assert_eq!(backend.calls()[0].0, 3);
    }

    #[test]
    fn test_new_selects_backend_from_config() {
        let config = FacadeConfig::single_server("127.0.0.1", 1)
            .with_connection_timeout(Duration::from_millis(200))
            .with_backend(BackendKind::PerDatabase);
        let client = KeyValueClient::new(config);
        assert!(!client.is_connected());
        assert!(client.ping().unwrap_err().is_unavailable());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
