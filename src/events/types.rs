/// Per-phase timings of one request, in whole milliseconds.
///
/// Task bodies that only measure wall time fill `elapsed_ms` and leave the
/// rest at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestTimings {
    pub elapsed_ms: u64,
    pub dns_lookup_ms: u64,
    pub tcp_connection_ms: u64,
    pub tls_handshake_ms: u64,
    pub server_processing_ms: u64,
    pub name_lookup_ms: u64,
    pub connect_ms: u64,
    pub pre_transfer_ms: u64,
    pub start_transfer_ms: u64,
}

impl RequestTimings {
    #[must_use]
    pub const fn elapsed(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            dns_lookup_ms: 0,
            tcp_connection_ms: 0,
            tls_handshake_ms: 0,
            server_processing_ms: 0,
            name_lookup_ms: 0,
            connect_ms: 0,
            pre_transfer_ms: 0,
            start_transfer_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSuccess {
    pub method: String,
    pub name: String,
    pub timings: RequestTimings,
    pub content_length: u64,
}

impl RequestSuccess {
    #[must_use]
    pub fn new(method: &str, name: &str, timings: RequestTimings, content_length: u64) -> Self {
        Self {
            method: method.to_owned(),
            name: name.to_owned(),
            timings,
            content_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub method: String,
    pub name: String,
    pub elapsed_ms: u64,
    pub error: String,
}

impl RequestFailure {
    #[must_use]
    pub fn new(method: &str, name: &str, elapsed_ms: u64, error: String) -> Self {
        Self {
            method: method.to_owned(),
            name: name.to_owned(),
            elapsed_ms,
            error,
        }
    }
}
