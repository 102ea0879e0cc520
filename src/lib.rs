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


//! A small key-value facade over Redis.
//!
//! [`KeyValueFacade`] and [`AsyncKeyValueFacade`] connect lazily, target a
//! logical database per call and hand back defaults instead of errors when the
//! server cannot be reached. [`KeyValueClient`] and [`AsyncKeyValueClient`]
//! expose the same operations with every failure reported.

mod config;
mod errors;
mod connection;
mod client;
mod facade;
pub mod commands;

pub use config::*;
pub use errors::*;
pub use connection::*;
pub use client::*;
pub use facade::*;
pub use commands::{KeyTtl, ALL_KEYS};
