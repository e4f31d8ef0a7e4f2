//! # Focus rooms
//!
//! Server side of a shared study timer. Clients join a room over WebSocket and
//! every member sees the same WORK/BREAK countdown; voice is used during breaks
//! and negotiated peer to peer by the clients, so the server only relays each
//! member's voice-peer id.
//!
//! ## Modules
//!
//! - `room`: the per-room state machine (`Room::apply`, `Room::tick`)
//! - `registry`: the room map with one lock per room
//! - `server`: connection sessions, message dispatch and broadcasting
//! - `scheduler`: the once-per-second tick driver
//! - `sink`: where completed WORK phases are recorded
//! - `messages`: the JSON wire protocol
//! - `config`, `tls`, `routes`: process setup for the binary
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use focus_room::{routes, scheduler, DiscardSink, Server, TimerSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Arc::new(Server::new(TimerSettings::default(), Arc::new(DiscardSink)));
//!     tokio::spawn(scheduler::run(Arc::clone(&server), Duration::from_secs(1)));
//!     warp::serve(routes::routes(server, "public".into()))
//!         .run(([127, 0, 0, 1], 3001))
//!         .await;
//! }
//! ```

pub mod config;
pub mod messages;
pub mod registry;
pub mod room;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod sink;
pub mod tls;

pub use messages::{ClientMessage, ServerMessage};
pub use room::{Command, Phase, Room, RoomEvent, TimerSettings, User};
pub use server::{Server, Stats};
pub use sink::{DiscardSink, RestSink, SinkError, StudyLog, StudyLogSink};
