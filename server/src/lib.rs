//! # Pong Server Library
//!
//! Authoritative server for a two-player networked Pong match. The server owns
//! the only copy of the game state, advances the ball on a fixed tick and
//! broadcasts a full snapshot to both players after every change.
//!
//! ## Module Organization
//!
//! ### Physics (`physics`)
//! Pure helpers for stepping, clamping and bouncing integer coordinates.
//!
//! ### Game (`game`)
//! Ball, paddles and the [`game::GameState`] collision step. Exactly one
//! outcome applies per tick: a paddle return or miss, a wall bounce, or free
//! movement.
//!
//! ### Client Manager (`client_manager`)
//! The two-slot connection table. Each connection gets its own id so a late
//! disconnect from an old occupant never evicts the player that replaced it.
//!
//! ### Session (`session`)
//! The match monitor. All four mutation sources (join, move, disconnect, tick)
//! run through one lock-apply-broadcast cycle, so mutations never interleave.
//! A failed send is treated as that player leaving.
//!
//! ### Network (`network`)
//! Websocket transport built on `tokio-tungstenite`: accept loop, path check on
//! the upgrade request, and the adapters that plug a socket into the session.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig {
//!         addr: "127.0.0.1:8080".to_string(),
//!         tick_period: Duration::from_millis(100),
//!         path: "/game".to_string(),
//!     })
//!     .await?;
//!
//!     // Two clients connecting to ws://127.0.0.1:8080/game start the match,
//!     // a third one is told the match is full.
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod connection;
pub mod error;
pub mod game;
pub mod network;
pub mod physics;
pub mod session;

pub use error::ServerError;
pub use session::{JoinOutcome, Session};
