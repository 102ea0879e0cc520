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

use std::time::Duration;
use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use crate::errors::{FacadeError, FacadeResult};

/// How connections are laid out across logical databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// One persistent connection; `SELECT` is issued whenever the requested db changes.
    #[default]
    Shared,
    /// One persistent connection per logical database, opened on first use.
    PerDatabase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacadeConfig {
    pub host: String,
    pub port: u16,
    /// Takes precedence over host/port when set
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Database selected right after connecting, also used by `info`
    pub database: i64,
    pub backend: BackendKind,
    pub connection_timeout: Duration,
    /// Read/write timeout for commands; unbounded when `None`
    pub response_timeout: Option<Duration>,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            url: None,
            username: None,
            password: None,
            database: 0,
            backend: BackendKind::Shared,
            connection_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: None,
        }
    }
}

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2500;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

// Raw `REDIS_*` variables as envy sees them
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    db: i64,
    #[serde(default)]
    backend: BackendKind,
    #[serde(default = "default_connect_timeout_ms")]
    connect_timeout_ms: u64,
    #[serde(default)]
    response_timeout_ms: Option<u64>,
}

impl From<EnvSettings> for FacadeConfig {
    fn from(env: EnvSettings) -> Self {
        Self {
            host: env.host,
            port: env.port,
            url: non_empty(env.url),
            username: non_empty(env.username),
            password: non_empty(env.password),
            database: env.db,
            backend: env.backend,
            connection_timeout: Duration::from_millis(env.connect_timeout_ms),
            response_timeout: env.response_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl FacadeConfig {
    /// Reads `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD` and friends, after loading `.env` if present.
    pub fn from_env() -> FacadeResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub(crate) fn from_vars<I>(vars: I) -> FacadeResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let settings: EnvSettings = envy::prefixed("REDIS_").from_iter(vars)?;
        Ok(settings.into())
    }

    pub fn single_server(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    pub fn from_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = non_empty(Some(password.to_string()));
        self
    }

    pub fn with_database(mut self, db: i64) -> Self {
        self.database = db;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Human readable target, used in log fields
    pub fn address(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("{}:{}", self.host, self.port),
        }
    }

    fn validate(&self) -> FacadeResult<()> {
        if self.url.is_none() && self.host.is_empty() {
            return Err(FacadeError::Config("either a URL or a host is required".to_string()));
        }
        if self.database < 0 {
            return Err(FacadeError::Config(format!("database index {} is negative", self.database)));
        }
        if self.connection_timeout.is_zero() {
            return Err(FacadeError::Config("connection timeout cannot be zero".to_string()));
        }
        Ok(())
    }

    /// Connection info for a session that starts on `db`, carrying the configured credentials.
    pub fn connection_info(&self, db: i64) -> FacadeResult<ConnectionInfo> {
        self.validate()?;
        if db < 0 {
            return Err(FacadeError::InvalidArgument(format!("database index {} is negative", db)));
        }

        let conn_info = match &self.url {
            Some(url) => url
                .as_str()
                .into_connection_info()
                .map_err(|e| FacadeError::Config(e.to_string()))?,
            None => ConnectionAddr::Tcp(self.host.clone(), self.port).into_connection_info()?,
        };

        let mut redis_info = RedisConnectionInfo::default().set_db(db);
        if let Some(username) = &self.username {
            redis_info = redis_info.set_username(username.as_str());
        }
        if let Some(password) = &self.password {
            redis_info = redis_info.set_password(password.as_str());
        }
        Ok(conn_info.set_redis_settings(redis_info))
    }
}
