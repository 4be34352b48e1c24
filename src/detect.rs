//! Request mode detection
//!
//! A request is either *buffered*, when an earlier layer already read the
//! whole body into one of the payload slots, or *streaming*, when the body
//! still has to arrive through [`RequestEvent`](crate::RequestEvent)s.
//!
//! Detection tries an ordered list of extractors and stops at the first one
//! that finds a byte payload. A slot holding anything other than bytes (for
//! example JSON decoded by middleware) does not count.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::request::{ParsedBody, RawBody, Request};

/// How the body of a request reaches the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
	/// The whole body is already in memory
	Buffered(Bytes),
	/// The body arrives incrementally
	Streaming,
}

impl RequestMode {
	pub fn is_buffered(&self) -> bool {
		matches!(self, Self::Buffered(_))
	}
}

/// Pulls a buffered byte payload out of a request, without side effects
pub type PayloadExtractor = fn(&Request) -> Option<Bytes>;

/// Known places where a buffered body may be attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSlot {
	/// [`RawBody`], set by serverless platforms
	RawBody,
	/// [`ParsedBody`], set by body-parsing middleware
	Body,
}

impl PayloadSlot {
	pub fn extractor(self) -> PayloadExtractor {
		match self {
			Self::RawBody => raw_body,
			Self::Body => parsed_body,
		}
	}
}

/// Reads the [`RawBody`] slot
pub fn raw_body(request: &Request) -> Option<Bytes> {
	request
		.extensions()
		.with(|RawBody(value): &RawBody| value.as_bytes().cloned())
		.flatten()
}

/// Reads the [`ParsedBody`] slot
pub fn parsed_body(request: &Request) -> Option<Bytes> {
	request
		.extensions()
		.with(|ParsedBody(value): &ParsedBody| value.as_bytes().cloned())
		.flatten()
}

/// Classifies requests as buffered or streaming
#[derive(Debug, Clone)]
pub struct ModeDetector {
	extractors: Vec<PayloadExtractor>,
}

impl Default for ModeDetector {
	fn default() -> Self {
		Self::from_slots(&[PayloadSlot::RawBody, PayloadSlot::Body])
	}
}

impl ModeDetector {
	/// A detector that never finds a payload
	pub fn streaming_only() -> Self {
		Self {
			extractors: Vec::new(),
		}
	}

	/// Build a detector checking `slots` in the given order
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::{ModeDetector, PayloadSlot, Request, RequestMode};
	///
	/// let request = Request::builder().body(b"payload".to_vec()).build().unwrap();
	///
	/// let only_raw = ModeDetector::from_slots(&[PayloadSlot::RawBody]);
	/// assert_eq!(only_raw.classify(&request), RequestMode::Streaming);
	///
	/// let both = ModeDetector::default();
	/// assert!(both.classify(&request).is_buffered());
	/// ```
	pub fn from_slots(slots: &[PayloadSlot]) -> Self {
		Self {
			extractors: slots.iter().map(|slot| slot.extractor()).collect(),
		}
	}

	/// Append an extractor, tried after the existing ones
	pub fn with_extractor(mut self, extractor: PayloadExtractor) -> Self {
		self.extractors.push(extractor);
		self
	}

	pub fn len(&self) -> usize {
		self.extractors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.extractors.is_empty()
	}

	/// Classify a request; the first extractor returning bytes wins
	pub fn classify(&self, request: &Request) -> RequestMode {
		self.extractors
			.iter()
			.find_map(|extract| extract(request))
			.map_or(RequestMode::Streaming, RequestMode::Buffered)
	}
}
