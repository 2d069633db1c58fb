//! Testing utilities: a mock concatenator and a tiny HTTP fixture.
//!
//! These let the merge pipeline and the HTTP API be exercised end to end
//! without an ffmpeg binary or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelsplice_core::testing::{MockConcatenator, StaticHttpServer};
//!
//! let concatenator = MockConcatenator::new();
//! let server = StaticHttpServer::start()
//!     .await
//!     .route("/clip.mp4", 200, b"clip".to_vec());
//!
//! // Use server.url("/clip.mp4") as a remote input...
//! ```

mod http_server;
mod mock_concatenator;

pub use http_server::StaticHttpServer;
pub use mock_concatenator::MockConcatenator;
