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


//! Walks through the facade against the server described by `REDIS_*`
//! variables (or `.env`). Runs without a server too: every call then logs and
//! returns its default.
//!
//! ```text
//! RUST_LOG=redis_facade=debug cargo run --example basic_usage
//! ```

use std::time::Duration;
use tracing_subscriber::EnvFilter;
use redis_facade::{FacadeError, KeyTtl, KeyValueFacade};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let facade = KeyValueFacade::from_env();
    println!("connected: {}", facade.connect());

    // Strings
    facade.set(0, "demo:greeting", "hello", Some(Duration::from_secs(60)));
    let greeting: Option<String> = facade.get(0, "demo:greeting");
    println!("greeting = {:?}, ttl = {}s", greeting, facade.ttl(0, "demo:greeting"));
    println!("visits = {:?}", facade.incr(0, "demo:visits"));

    // The same key name in another database is a different key
    facade.set(1, "demo:greeting", "bonjour", None);
    let other: Option<String> = facade.get(1, "demo:greeting");
    println!("db 1 greeting = {:?}", other);

    // Hashes, lists, sets
    facade.hset(0, "demo:user:1", "name", "ada", None);
    let user: std::collections::HashMap<String, String> = facade.hgetall(0, "demo:user:1");
    println!("user = {:?}", user);

    facade.rpush(0, "demo:jobs", "resize", Some(Duration::from_secs(300)));
    let job: Option<String> = facade.lpop(0, "demo:jobs");
    println!("next job = {:?}", job);

    facade.sadd(0, "demo:tags:a", "rust", None);
    facade.sadd(0, "demo:tags:b", "rust", None);
    let shared: Vec<String> = facade.sinter(0, &["demo:tags:a", "demo:tags:b"]);
    println!("shared tags = {:?}", shared);

    // The strict client tells "absent" from "unavailable"
    match facade.client().ttl(0, "demo:nothing-here") {
        Ok(KeyTtl::Missing) => println!("demo:nothing-here does not exist"),
        Ok(ttl) => println!("demo:nothing-here ttl = {:?}", ttl),
        Err(FacadeError::Unavailable(reason)) => println!("server unavailable: {}", reason),
        Err(err) => println!("command failed: {}", err),
    }

    for key in ["demo:greeting", "demo:visits", "demo:user:1", "demo:jobs", "demo:tags:a", "demo:tags:b"] {
        facade.delete(0, key);
    }
    facade.delete(1, "demo:greeting");

    let stats = facade.stats();
    println!(
        "connections opened: {}, operations: {} in {:?}, error rate: {:.2}",
        stats.connections_opened,
        stats.total_operations,
        stats.since_reset(),
        stats.error_rate()
    );
}
