//! Parsing engine contract.

use http::HeaderMap;

use crate::{EngineError, UploadedFile};

/// A structured notification produced while bytes are consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
	/// A decoded non-file form value.
	Field { name: String, value: String },
	/// A completed file upload.
	File { name: String, file: UploadedFile },
	/// Running byte count after each write.
	Progress {
		received: u64,
		expected: Option<u64>,
	},
	/// All input was consumed and every part has been reported.
	End,
}

/// Push-based form body decoder.
///
/// Implementations receive the request headers once, then body chunks in
/// delivery order, then a single end-of-input signal. Events produced during a
/// call are handed to `emit` before the call returns.
pub trait ParsingEngine {
	/// Whether several files under the same field name are kept.
	fn multiples(&self) -> bool;

	/// Feeds the request header metadata.
	///
	/// # Errors
	///
	/// Returns an error if the headers do not describe a body this engine can
	/// decode.
	fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), EngineError>;

	/// Feeds one chunk of body bytes, returning the number of bytes consumed.
	///
	/// # Errors
	///
	/// Returns an error if the chunk cannot be decoded or a limit is exceeded.
	fn write(
		&mut self,
		chunk: &[u8],
		emit: &mut dyn FnMut(EngineEvent),
	) -> Result<usize, EngineError>;

	/// Signals end-of-input and flushes the remaining parts.
	///
	/// # Errors
	///
	/// Returns an error if the body was incomplete or malformed.
	fn end(&mut self, emit: &mut dyn FnMut(EngineEvent)) -> Result<(), EngineError>;
}

impl<T: ParsingEngine + ?Sized> ParsingEngine for Box<T> {
	fn multiples(&self) -> bool {
		(**self).multiples()
	}

	fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), EngineError> {
		(**self).write_headers(headers)
	}

	fn write(
		&mut self,
		chunk: &[u8],
		emit: &mut dyn FnMut(EngineEvent),
	) -> Result<usize, EngineError> {
		(**self).write(chunk, emit)
	}

	fn end(&mut self, emit: &mut dyn FnMut(EngineEvent)) -> Result<(), EngineError> {
		(**self).end(emit)
	}
}
