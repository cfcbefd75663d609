// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transport sessions
//!
//! Client side: `ClientSessionManager` caches one session and deduplicates
//! handshakes. Server side: `HandshakeHandler` establishes sessions and
//! `SessionStore` keeps them until they expire or are closed.

pub mod client;
pub mod clock;
pub mod error;
pub mod handshake;
pub mod messages;
pub mod single_flight;
pub mod store;

pub use client::{ClientSession, ClientSessionManager};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, TransportError};
pub use handshake::{HandshakeHandler, HandshakeSettings};
pub use messages::{HandshakeRequest, HandshakeResponse};
pub use single_flight::SingleFlight;
pub use store::{spawn_cleanup_task, InMemorySessionStore, ServerSession, SessionStore};
