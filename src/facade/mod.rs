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


//! Facades that never fail: every operation hands back a default when the
//! server is unreachable or rejects the command, and logs why.

mod blocking;
mod non_blocking;

pub use blocking::*;
pub use non_blocking::*;

use tracing::{debug, warn};
use crate::{FacadeConfig, FacadeResult};

pub(crate) fn settle<T>(op: &'static str, db: i64, result: FacadeResult<T>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) if err.is_unavailable() => {
            debug!(op, db, error = %err, "redis unavailable, returning default");
            default
        }
        Err(err) => {
            warn!(op, db, error = %err, "redis command failed, returning default");
            default
        }
    }
}

pub(crate) fn config_from_env() -> FacadeConfig {
    FacadeConfig::from_env().unwrap_or_else(|err| {
        warn!(error = %err, "invalid redis configuration in environment, using defaults");
        FacadeConfig::default()
    })
}
