//! TCP frame server: exposes one camera to many clients.
//!
//! Clients connect over TCP, negotiate per-session capture parameters
//! through a small ASCII line protocol, and request single frames or
//! timed streams. The server keeps answering control messages on a
//! connection while frames for the same connection are in flight.
//!
//! # Architecture
//!
//! ```text
//!             ┌──────────┐  accept   ┌──────────────┐
//!  TCP  ────▶ │ Acceptor │──────────▶│ ClientSession│── parse ──▶ MessageRouter
//!             └──────────┘  per conn │  (read loop) │               │
//!                                    └──────┬───────┘           handlers
//!                                           │ writer lock           │
//!                        listener task ─────┤                       ▼
//!                              ▲            │              ┌────────────────┐
//!                              │ pop        │              │ FrameCollector │──▶ Camera
//!                        ┌───────────┐ push │              │  (scheduler)   │
//!                        │ FrameQueue│◀─────┴──────────────└────────────────┘
//!                        └───────────┘
//! ```
//!
//! One scheduler task multiplexes every client cadence onto the single
//! camera; per-client bounded queues decouple capture from delivery;
//! a per-session writer lock keeps command replies and binary frame
//! blocks from interleaving on the wire.

mod acceptor;
pub mod app;
pub mod collector;
pub mod config;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod session;

pub use app::{App, AppShared};
pub use collector::{ClientQueue, Frame, FrameCollector, FrameMetadata};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use handlers::{AssignmentAction, CommandAction, InquiryAction, MessageRouter, RoiParam};
pub use queue::FrameQueue;
pub use session::{ClientSession, StreamParams};
