//! # Concert Server Library
//!
//! This library provides the server side of the concert service. It owns the
//! canonical set of concerts, speaks the framed request/response protocol
//! defined in the `shared` crate, and serves any number of clients at once.
//!
//! ## Core Responsibilities
//!
//! ### Session Gating
//! Every connection starts with a handshake. The first message must be Hello;
//! anything else earns a failure response and the connection is closed. Once
//! a session is active, clients may issue any number of CRUD, List and Clear
//! requests and finish with Goodbye.
//!
//! ### Request Dispatch
//! Active-session requests are mapped onto the concert store and every one
//! of them receives exactly one response before the next request is read.
//! Unknown ids produce a not-found failure; the session carries on.
//!
//! ### Connection Management
//! Tracks live connections, enforces the configured capacity, and shuts all
//! sessions down when the server stops.
//!
//! ## Architecture Design
//!
//! ### One Task Per Connection
//! The accept loop spawns a tokio task for each accepted connection. Each task
//! runs its own session state machine and reads requests strictly in order,
//! so responses on one connection are never reordered.
//!
//! ### Single Store Lock
//! All tasks share one `ConcertStore` behind a `tokio::sync::RwLock`. Every
//! store operation takes the lock exactly once, which makes each create,
//! update and delete atomic with respect to every other session.
//!
//! ### TCP With Length-Prefixed Frames
//! Messages travel over TCP as bincode payloads behind a 4-byte length
//! header. A frame that cannot be decoded ends the connection, since the
//! stream can no longer be trusted to carry frame boundaries.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Listening address and connection limit, parsed from the command line.
//!
//! ### Connection Manager Module (`connection_manager`)
//! Roster of live connections, capacity enforcement and per-connection stats.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Translates a parsed request into a store operation and a response.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection transport loop and shutdown handling.
//!
//! ### Session Module (`session`)
//! The AwaitingHello → Active → Closed state machine.
//!
//! ### Store Module (`store`)
//! In-memory map from concert id to concert; the only issuer of ids.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = Server::bind(&config).await?;
//!
//!     // Serve until Ctrl+C, then close every live session
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection_manager;
pub mod dispatcher;
pub mod network;
pub mod session;
pub mod store;
