//! # Reinhardt Multipart Engine
//!
//! Push-based parsing engine for `multipart/form-data` and
//! `application/x-www-form-urlencoded` request bodies.
//!
//! The engine is the collaborator that `reinhardt-multipart` drives: it accepts
//! request headers and raw body bytes as they become available and reports
//! decoded form parts through [`EngineEvent`]s. The wire format itself is
//! decoded by [`multer`].
//!
//! ## Engine Contract
//!
//! - [`ParsingEngine::write_headers`]: inspect `content-type` / `content-length`
//! - [`ParsingEngine::write`]: feed one chunk of body bytes
//! - [`ParsingEngine::end`]: signal end-of-input and flush remaining parts
//! - [`ParsingEngine::multiples`]: whether a field name may carry several files
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_multipart_engine::{EngineEvent, EngineOptions, MultipartEngine, ParsingEngine};
//! use http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     CONTENT_TYPE,
//!     HeaderValue::from_static("multipart/form-data; boundary=X"),
//! );
//!
//! let body = "--X\r\n\
//!     Content-Disposition: form-data; name=\"a\"\r\n\r\n\
//!     1\r\n\
//!     --X--\r\n";
//!
//! let mut engine = MultipartEngine::new(EngineOptions::default());
//! let mut events = Vec::new();
//! engine.write_headers(&headers).unwrap();
//! engine.write(body.as_bytes(), &mut |event| events.push(event)).unwrap();
//! engine.end(&mut |event| events.push(event)).unwrap();
//!
//! assert!(events.iter().any(|event| matches!(
//!     event,
//!     EngineEvent::Field { name, value } if name == "a" && value == "1"
//! )));
//! assert!(matches!(events.last(), Some(EngineEvent::End)));
//! ```

pub mod engine;
pub mod error;
pub mod file;
pub mod multer_engine;

pub use engine::{EngineEvent, ParsingEngine};
pub use error::EngineError;
pub use file::UploadedFile;
pub use multer_engine::{EngineOptions, MultipartEngine};
