//! Error types for form parsing

use reinhardt_multipart_engine::EngineError;
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

/// Shared transport error as delivered by [`RequestEvent::Error`](crate::RequestEvent::Error)
pub type TransportError = Arc<dyn StdError + Send + Sync>;

/// Errors that terminate a parse
///
/// Cloning is cheap: sources are reference counted so one error can reach
/// every listener and the completion callback.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum FormError {
	/// The client went away before the body was complete
	#[error("Request aborted")]
	Aborted,
	/// The request itself reported an error
	#[error("{0}")]
	Request(#[source] TransportError),
	/// Feeding headers or body bytes into the engine failed
	#[error("{0}")]
	Feed(#[source] Arc<EngineError>),
	/// The engine rejected the end of input
	#[error("{0}")]
	Finalize(#[source] Arc<EngineError>),
	/// Pausing or resuming the request failed before it ended
	#[error("{0}")]
	FlowControl(#[source] Arc<FlowControlError>),
}

impl FormError {
	pub(crate) fn feed(err: EngineError) -> Self {
		Self::Feed(Arc::new(err))
	}

	pub(crate) fn finalize(err: EngineError) -> Self {
		Self::Finalize(Arc::new(err))
	}

	/// Returns the engine error behind a feed or finalization failure
	pub fn engine_error(&self) -> Option<&EngineError> {
		match self {
			Self::Feed(err) | Self::Finalize(err) => Some(err),
			_ => None,
		}
	}

	pub fn is_aborted(&self) -> bool {
		matches!(self, Self::Aborted)
	}
}

/// Errors raised by a request's native pause/resume
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FlowControlError {
	#[error("stream destroyed")]
	Destroyed,
	#[error("IO error: {0}")]
	Io(#[from] io::Error),
}
