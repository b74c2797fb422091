//! Request phase tracing
//!
//! A `PhaseTrace` lives for exactly one request. Transports record lifecycle
//! events into it as they happen; the executor turns it into a `TimingResult`
//! once the request has finished.

use std::time::{Duration, Instant};

use crate::models::{Outcome, PhaseDurations, Protocol, TimingResult};

/// Connection lifecycle events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEvent {
    DnsStart,
    DnsDone,
    ConnectStart,
    ConnectDone,
    TlsStart,
    TlsDone,
    FirstByte,
}

/// Timestamps captured for a single request
#[derive(Debug)]
pub struct PhaseTrace {
    start: Instant,
    dns_start: Option<Instant>,
    dns_done: Option<Instant>,
    connect_start: Option<Instant>,
    connect_done: Option<Instant>,
    tls_start: Option<Instant>,
    tls_done: Option<Instant>,
    first_byte: Option<Instant>,
    status: Option<u16>,
}

impl PhaseTrace {
    /// Start tracing a request issued now
    pub fn begin() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            dns_start: None,
            dns_done: None,
            connect_start: None,
            connect_done: None,
            tls_start: None,
            tls_done: None,
            first_byte: None,
            status: None,
        }
    }

    /// Record an event at the current instant
    pub fn record(&mut self, event: PhaseEvent) {
        self.record_at(event, Instant::now());
    }

    /// Record an event at a given instant. A repeated event overwrites the
    /// earlier timestamp, so multi-address connects measure the last attempt.
    pub fn record_at(&mut self, event: PhaseEvent, at: Instant) {
        let slot = match event {
            PhaseEvent::DnsStart => &mut self.dns_start,
            PhaseEvent::DnsDone => &mut self.dns_done,
            PhaseEvent::ConnectStart => &mut self.connect_start,
            PhaseEvent::ConnectDone => &mut self.connect_done,
            PhaseEvent::TlsStart => &mut self.tls_start,
            PhaseEvent::TlsDone => &mut self.tls_done,
            PhaseEvent::FirstByte => &mut self.first_byte,
        };
        *slot = Some(at);
    }

    /// Record the status line of the response head
    pub fn record_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    /// Phase durations as of `end`. Unset boundaries yield zero.
    pub fn phases(&self, end: Instant) -> PhaseDurations {
        PhaseDurations {
            dns_lookup: span(self.dns_start, self.dns_done),
            tcp_connect: span(self.connect_start, self.connect_done),
            tls_handshake: span(self.tls_start, self.tls_done),
            time_to_first_byte: span(Some(self.start), self.first_byte),
            content_transfer: span(self.first_byte, Some(end)),
        }
    }

    /// Consume the trace into the final result for this request
    pub fn finish(self, protocol: Protocol, end: Instant, outcome: Outcome) -> TimingResult {
        TimingResult {
            protocol,
            phases: self.phases(end),
            total_time: end.saturating_duration_since(self.start),
            status_code: self.status,
            outcome,
        }
    }
}

fn span(start: Option<Instant>, end: Option<Instant>) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) => end.saturating_duration_since(start),
        _ => Duration::ZERO,
    }
}
