//! # Concert Client Library
//!
//! Typed access to a concert server. A [`ConcertClient`] owns one session:
//! it performs the Hello handshake when it connects, sends one request at a
//! time and waits for the matching response, and says Goodbye when it is
//! consumed.
//!
//! Failure responses from the server surface as
//! [`ClientError::Rejected`] carrying the server's failure kind and reason.
//! Arguments the protocol forbids, such as updating a concert that has no
//! id, are caught locally as [`ClientError::IllegalArgument`] and never
//! reach the wire.
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use client::ConcertClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::ClientError> {
//!     let mut client = ConcertClient::connect("127.0.0.1:8080").await?;
//!
//!     let date = Utc.with_ymd_and_hms(2017, 8, 4, 20, 0, 0).unwrap();
//!     let concert = client.create("One Night of Queen", date).await?;
//!     println!("Created concert {:?}", concert.id());
//!
//!     client.goodbye().await
//! }
//! ```

pub mod error;
pub mod network;

pub use error::ClientError;
pub use network::ConcertClient;
