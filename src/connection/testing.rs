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

//! Test doubles: an in-memory backend that replays scripted replies, and a
//! loopback server speaking just enough RESP to exercise the real backends.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::{Pipeline, Value};

use crate::errors::{FacadeError, FacadeResult};
use crate::{AsyncConnectionBackend, ConnectionBackend, ConnectionState, ConnectionStats, FacadeConfig};

pub(crate) enum Scripted {
    Reply(Value),
    /// Server unreachable
    Down,
    /// Command-level failure such as WRONGTYPE
    Fail(&'static str),
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(i64, String)>>,
    closed: Mutex<u32>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, step: Scripted) -> &Self {
        self.script.lock().push_back(step);
        self
    }

    pub(crate) fn reply(&self, value: Value) -> &Self {
        self.push(Scripted::Reply(value))
    }

    /// Every pipeline run so far as (db, RESP text)
    pub(crate) fn calls(&self) -> Vec<(i64, String)> {
        self.calls.lock().clone()
    }

    pub(crate) fn closed(&self) -> u32 {
        *self.closed.lock()
    }

    fn next(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        let wire = String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned();
        self.calls.lock().push((db, wire));
        match self.script.lock().pop_front() {
            Some(Scripted::Reply(value)) => Ok(vec![value]),
            Some(Scripted::Down) => Err(FacadeError::Unavailable("connection refused".to_string())),
            Some(Scripted::Fail(message)) => Err(FacadeError::UnexpectedReply(message.to_string())),
            None => Ok(vec![Value::Nil]),
        }
    }
}

impl ConnectionBackend for ScriptedBackend {
    fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        self.next(db, pipe)
    }

    fn connect(&self) -> FacadeResult<()> {
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats::new()
    }

    fn reset_stats(&self) {}

    fn close(&self) {
        *self.closed.lock() += 1;
    }
}

#[async_trait]
impl AsyncConnectionBackend for ScriptedBackend {
    async fn query(&self, db: i64, pipe: &Pipeline) -> FacadeResult<Vec<Value>> {
        self.next(db, pipe)
    }

    async fn connect(&self) -> FacadeResult<()> {
        Ok(())
    }

    async fn close(&self) {
        *self.closed.lock() += 1;
    }

    fn try_close(&self) {
        *self.closed.lock() += 1;
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats::new()
    }

    fn reset_stats(&self) {}
}

pub(crate) fn bulk(text: &str) -> Value {
    Value::BulkString(text.as_bytes().to_vec())
}

// ================ Loopback server ================

type Store = Arc<Mutex<HashMap<(i64, String), String>>>;

/// Accepts any number of connections on an ephemeral port and answers
/// `PING`, `SELECT`, `SET` and `GET`; every other command gets `+OK`.
pub(crate) struct FakeServer {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
    sockets: Arc<Mutex<Vec<TcpStream>>>,
}

impl FakeServer {
    pub(crate) fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sockets = Arc::new(Mutex::new(Vec::new()));
        let store: Store = Arc::new(Mutex::new(HashMap::new()));

        let (log, open) = (received.clone(), sockets.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                if let Ok(handle) = stream.try_clone() {
                    open.lock().push(handle);
                }
                let (log, store) = (log.clone(), store.clone());
                thread::spawn(move || serve(stream, log, store));
            }
        });

        Self { port, received, sockets }
    }

    pub(crate) fn config(&self) -> FacadeConfig {
        FacadeConfig::single_server("127.0.0.1", self.port)
            .with_connection_timeout(Duration::from_secs(2))
            .with_response_timeout(Duration::from_secs(2))
    }

    /// Data commands received so far, as space-joined arguments. Handshake
    /// commands the client library sends on its own are left out.
    pub(crate) fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter(|line| ["SELECT ", "SET ", "GET ", "PING"].iter().any(|name| line.starts_with(name)))
            .cloned()
            .collect()
    }

    /// Connections accepted so far
    pub(crate) fn accepted(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Cuts every open connection, as a server restart would.
    pub(crate) fn drop_connections(&self) {
        for socket in self.sockets.lock().iter() {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }
}

fn serve(stream: TcpStream, log: Arc<Mutex<Vec<String>>>, store: Store) {
    let Ok(mut writer) = stream.try_clone() else { return };
    let mut reader = BufReader::new(stream);
    let mut db = 0i64;

    while let Some(args) = read_command(&mut reader) {
        log.lock().push(args.join(" "));
        let reply = respond(&args, &mut db, &store);
        if writer.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).ok()?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Some(args)
}

fn respond(args: &[String], db: &mut i64, store: &Store) -> String {
    let name = args.first().map(|a| a.to_ascii_uppercase()).unwrap_or_default();
    match (name.as_str(), args.len()) {
        ("PING", _) => "+PONG\r\n".to_string(),
        ("SELECT", 2) => {
            *db = args[1].parse().unwrap_or(0);
            "+OK\r\n".to_string()
        }
        ("SET", n) if n >= 3 => {
            store.lock().insert((*db, args[1].clone()), args[2].clone());
            "+OK\r\n".to_string()
        }
        ("GET", 2) => match store.lock().get(&(*db, args[1].clone())) {
            Some(value) => format!("${}\r\n{}\r\n", value.len(), value),
            None => "$-1\r\n".to_string(),
        },
        _ => "+OK\r\n".to_string(),
    }
}
