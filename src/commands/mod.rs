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


//! Command pipelines for every facade operation.
//!
//! Both the blocking and the non-blocking clients build their requests here, so
//! an operation is defined once no matter which runtime executes it. Each
//! builder returns a pipeline whose first non-ignored reply is the operation's
//! result.

use std::time::Duration;
use redis::{Pipeline, ToRedisArgs, Value};
use crate::{FacadeError, FacadeResult};

/// Pattern used by `keys` when the caller passes none
pub const ALL_KEYS: &str = "*";

/// Decoded `TTL` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Expires(Duration),
    /// The key exists without an expiry
    Persistent,
    /// The key does not exist
    Missing,
}

impl KeyTtl {
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            -1 => KeyTtl::Persistent,
            s if s < 0 => KeyTtl::Missing,
            s => KeyTtl::Expires(Duration::from_secs(s as u64)),
        }
    }

    /// Seconds remaining, or `-1` for both "no expiry" and "no such key".
    pub fn as_seconds(&self) -> i64 {
        match self {
            KeyTtl::Expires(remaining) => remaining.as_secs() as i64,
            KeyTtl::Persistent | KeyTtl::Missing => -1,
        }
    }
}

pub(crate) fn expiry_millis(expire: Duration) -> FacadeResult<u64> {
    if expire.is_zero() {
        return Err(FacadeError::InvalidArgument("expiry must be greater than zero".to_string()));
    }
    // Redis rejects expiries above i64::MAX milliseconds
    let millis = u64::try_from(expire.as_millis())
        .ok()
        .filter(|ms| *ms <= i64::MAX as u64)
        .ok_or_else(|| FacadeError::InvalidArgument(format!("expiry {:?} is too large", expire)))?;
    // Round sub-millisecond expiries up so they still expire rather than erroring
    Ok(millis.max(1))
}

// Wraps a write so the expiry lands in the same MULTI/EXEC as the write itself
fn expiring<K: ToRedisArgs>(mut pipe: Pipeline, key: &K, expire: Option<Duration>) -> FacadeResult<Pipeline> {
    if let Some(expire) = expire {
        let millis = expiry_millis(expire)?;
        pipe.atomic();
        pipe.cmd("PEXPIRE").arg(key).arg(millis).ignore();
    }
    Ok(pipe)
}

fn single<K: ToRedisArgs>(name: &str, key: K) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.cmd(name).arg(key);
    pipe
}

/// First reply of a pipeline; `Nil` when the pipeline produced none
pub(crate) fn first_reply(values: Vec<Value>) -> Value {
    values.into_iter().next().unwrap_or(Value::Nil)
}

// ================ Strings ================

pub fn get<K: ToRedisArgs>(key: K) -> Pipeline {
    single("GET", key)
}

/// `SET key value [PX ms]`: value and expiry land in one command.
pub fn set<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V, expire: Option<Duration>) -> FacadeResult<Pipeline> {
    let mut pipe = redis::pipe();
    pipe.cmd("SET").arg(key).arg(value);
    if let Some(expire) = expire {
        pipe.arg("PX").arg(expiry_millis(expire)?);
    }
    Ok(pipe)
}

pub fn delete<K: ToRedisArgs>(key: K) -> Pipeline {
    single("DEL", key)
}

pub fn exists<K: ToRedisArgs>(key: K) -> Pipeline {
    single("EXISTS", key)
}

pub fn ttl<K: ToRedisArgs>(key: K) -> Pipeline {
    single("TTL", key)
}

pub fn expire<K: ToRedisArgs>(key: K, expire: Duration) -> FacadeResult<Pipeline> {
    let mut pipe = redis::pipe();
    pipe.cmd("PEXPIRE").arg(key).arg(expiry_millis(expire)?);
    Ok(pipe)
}

pub fn keys(pattern: Option<&str>) -> Pipeline {
    single("KEYS", pattern.unwrap_or(ALL_KEYS))
}

pub fn incr<K: ToRedisArgs>(key: K) -> Pipeline {
    single("INCR", key)
}

pub fn decr<K: ToRedisArgs>(key: K) -> Pipeline {
    single("DECR", key)
}

pub fn append<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> Pipeline {
    let mut pipe = single("APPEND", key);
    pipe.arg(value);
    pipe
}

pub fn mget<K: ToRedisArgs>(keys: &[K]) -> Pipeline {
    single("MGET", keys)
}

pub fn mset<K: ToRedisArgs, V: ToRedisArgs>(pairs: &[(K, V)]) -> Pipeline {
    single("MSET", pairs)
}

// ================ Hashes ================

pub fn hget<K: ToRedisArgs, F: ToRedisArgs>(key: K, field: F) -> Pipeline {
    let mut pipe = single("HGET", key);
    pipe.arg(field);
    pipe
}

pub fn hset<K, F, V>(key: K, field: F, value: V, expire: Option<Duration>) -> FacadeResult<Pipeline>
where
    K: ToRedisArgs,
    F: ToRedisArgs,
    V: ToRedisArgs,
{
    let mut pipe = single("HSET", &key);
    pipe.arg(field).arg(value);
    expiring(pipe, &key, expire)
}

pub fn hgetall<K: ToRedisArgs>(key: K) -> Pipeline {
    single("HGETALL", key)
}

// ================ Lists ================

pub fn lpush<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V, expire: Option<Duration>) -> FacadeResult<Pipeline> {
    let mut pipe = single("LPUSH", &key);
    pipe.arg(value);
    expiring(pipe, &key, expire)
}

pub fn rpush<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V, expire: Option<Duration>) -> FacadeResult<Pipeline> {
    let mut pipe = single("RPUSH", &key);
    pipe.arg(value);
    expiring(pipe, &key, expire)
}

pub fn lpop<K: ToRedisArgs>(key: K) -> Pipeline {
    single("LPOP", key)
}

pub fn rpop<K: ToRedisArgs>(key: K) -> Pipeline {
    single("RPOP", key)
}

pub fn llen<K: ToRedisArgs>(key: K) -> Pipeline {
    single("LLEN", key)
}

// ================ Sets ================

pub fn sadd<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M, expire: Option<Duration>) -> FacadeResult<Pipeline> {
    let mut pipe = single("SADD", &key);
    pipe.arg(member);
    expiring(pipe, &key, expire)
}

pub fn srem<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> Pipeline {
    let mut pipe = single("SREM", key);
    pipe.arg(member);
    pipe
}

pub fn smembers<K: ToRedisArgs>(key: K) -> Pipeline {
    single("SMEMBERS", key)
}

pub fn scard<K: ToRedisArgs>(key: K) -> Pipeline {
    single("SCARD", key)
}

pub fn sinter<K: ToRedisArgs>(keys: &[K]) -> Pipeline {
    single("SINTER", keys)
}

pub fn sunion<K: ToRedisArgs>(keys: &[K]) -> Pipeline {
    single("SUNION", keys)
}

pub fn sdiff<K: ToRedisArgs>(keys: &[K]) -> Pipeline {
    single("SDIFF", keys)
}

pub fn sismember<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> Pipeline {
    let mut pipe = single("SISMEMBER", key);
    pipe.arg(member);
    pipe
}

// ================ Server ================

pub fn flushdb() -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.cmd("FLUSHDB");
    pipe
}

pub fn info() -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.cmd("INFO");
    pipe
}

pub fn ping() -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.cmd("PING");
    pipe
}
