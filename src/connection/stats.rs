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

use std::time::{Duration, Instant};
use crate::ConnectionState;

#[derive(Clone, Debug)]
pub struct ConnectionStats {
    pub connections_opened: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
    pub open_connections: u32,
    pub peak_connections: u32,
    pub total_operations: u64,
    pub error_count: u64,
    pub total_connect_time_ms: f64,
    pub last_reset: Instant,
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self {
            connections_opened: 0,
            connect_failures: 0,
            disconnects: 0,
            open_connections: 0,
            peak_connections: 0,
            total_operations: 0,
            error_count: 0,
            total_connect_time_ms: 0.0,
            last_reset: Instant::now(),
        }
    }

    pub fn record_connected(&mut self, elapsed: Duration) {
        self.connections_opened += 1;
        self.open_connections += 1;
        self.total_connect_time_ms += elapsed.as_secs_f64() * 1000.0;

        if self.open_connections > self.peak_connections {
            self.peak_connections = self.open_connections;
        }
    }

    pub fn record_connect_failure(&mut self) {
        self.connect_failures += 1;
    }

    pub fn record_disconnect(&mut self) {
        self.disconnects += 1;
        self.open_connections = self.open_connections.saturating_sub(1);
    }

    pub fn record_success(&mut self) {
        self.total_operations += 1;
    }

    pub fn record_error(&mut self) {
        self.total_operations += 1;
        self.error_count += 1;
    }

    pub fn state(&self) -> ConnectionState {
        if self.open_connections > 0 {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn avg_connect_time_ms(&self) -> f64 {
        if self.connections_opened > 0 {
            self.total_connect_time_ms / self.connections_opened as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_operations > 0 {
            self.error_count as f64 / self.total_operations as f64
        } else {
            0.0
        }
    }

    /// Length of the window the counters cover
    pub fn since_reset(&self) -> Duration {
        self.last_reset.elapsed()
    }

    pub fn reset(&mut self) {
        // Open handles outlive a reset
        let open = self.open_connections;
        *self = Self::new();
        self.open_connections = open;
        self.peak_connections = open;
    }
}
