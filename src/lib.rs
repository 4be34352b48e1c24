//! # Reinhardt Multipart
//!
//! Request-side adapter that feeds `multipart/form-data` (and urlencoded)
//! bodies into a push-based parsing engine, whether the body is still
//! streaming in from the transport or was already buffered by a serverless
//! platform or body-parsing middleware.
//!
//! ## Overview
//!
//! - [`ModeDetector`] classifies a [`Request`] as buffered or streaming by
//!   checking the payload slots ([`RawBody`], then [`ParsedBody`]) for bytes.
//! - [`IncomingForm::parse`] wires result aggregation, writes the headers and
//!   either replays the buffered payload or waits for [`RequestEvent`]s.
//! - [`IncomingForm::dispatch`] handles `Data`, `End`, `Error` and `Aborted`
//!   signals; [`drive`] and [`body_events`] connect a hyper body to it.
//! - The completion callback receives `(result, fields, files)` exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use reinhardt_multipart::{FormConfig, IncomingForm, Request, RequestEvent, on_complete};
//!
//! let request = Request::builder()
//!     .header("content-type", "multipart/form-data; boundary=X")
//!     .build()
//!     .unwrap();
//!
//! let mut form = IncomingForm::from_config(&FormConfig::default());
//! form.parse(&request, on_complete(|result, fields, files| {
//!     assert!(result.is_ok());
//!     assert_eq!(fields["name"], "value");
//!     assert!(files.is_empty());
//! }));
//!
//! form.dispatch(RequestEvent::data("--X\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n"));
//! form.dispatch(RequestEvent::data("value\r\n--X--\r\n"));
//! form.dispatch(RequestEvent::End);
//! assert!(form.is_complete());
//! ```

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod driver;
pub mod error;
pub mod extensions;
pub mod form;
pub mod notification;
pub mod request;

pub use reinhardt_multipart_engine as engine;
pub use reinhardt_multipart_engine::{
	EngineError, EngineEvent, EngineOptions, MultipartEngine, ParsingEngine, UploadedFile,
};

pub use aggregate::{CompletionCallback, FileEntry, Fields, Files, ResultAggregator, on_complete};
pub use config::FormConfig;
pub use detect::{ModeDetector, PayloadExtractor, PayloadSlot, RequestMode};
pub use driver::{body_events, drive};
pub use error::{FlowControlError, FormError, TransportError};
pub use extensions::Extensions;
pub use form::{CompletionState, IncomingForm, Subscriptions};
pub use notification::{Listener, Notification};
pub use request::{BodyValue, FlowControl, ParsedBody, RawBody, Request, RequestBuilder, RequestEvent};
