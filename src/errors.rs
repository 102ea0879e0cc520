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
use redis::{ParsingError, RedisError};
use thiserror::Error;

pub type FacadeResult<T> = std::result::Result<T, FacadeError>;

#[derive(Error, Debug)]
pub enum FacadeError {
    /// The server could not be reached, or the connection broke mid-command.
    #[error("Redis unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FacadeError {
    /// True when the failure says nothing about the key, only about the connection.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FacadeError::Unavailable(_) | FacadeError::Timeout(_))
    }

    // A command error that means the handle is no longer usable
    pub(crate) fn is_connection_fault(&self) -> bool {
        match self {
            FacadeError::Redis(err) => err.is_io_error() || err.is_connection_dropped(),
            FacadeError::Timeout(_) => true,
            _ => false,
        }
    }

    pub(crate) fn into_unavailable(self) -> FacadeError {
        match self {
            FacadeError::Redis(err) => FacadeError::Unavailable(format!("connection lost: {}", err)),
            other => other,
        }
    }
}

impl From<ParsingError> for FacadeError {
    fn from(err: ParsingError) -> Self {
        FacadeError::UnexpectedReply(err.to_string())
    }
}

impl From<envy::Error> for FacadeError {
    fn from(err: envy::Error) -> Self {
        FacadeError::Config(err.to_string())
    }
}
