//! The request side of a parse
//!
//! A [`Request`] carries the header metadata, the properties attached by
//! whatever ran before the handler, and optionally the transport's native
//! flow control. Its body either sits in one of the payload slots already
//! (serverless platforms, body-parsing middleware) or arrives later as a
//! sequence of [`RequestEvent`]s.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::error::{FlowControlError, TransportError};
use crate::extensions::Extensions;

/// A body value stored in a payload slot
///
/// Only [`BodyValue::Bytes`] counts as a buffered payload; a slot holding
/// decoded text or JSON is ignored by mode detection.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
	Bytes(Bytes),
	Text(String),
	Json(serde_json::Value),
}

impl BodyValue {
	/// Returns the raw bytes if this value is a byte payload
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::BodyValue;
	/// use serde_json::json;
	///
	/// assert!(BodyValue::from(vec![1u8, 2]).as_bytes().is_some());
	/// assert!(BodyValue::from(json!({"a": 1})).as_bytes().is_none());
	/// ```
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			Self::Bytes(bytes) => Some(bytes),
			_ => None,
		}
	}
}

impl From<Bytes> for BodyValue {
	fn from(bytes: Bytes) -> Self {
		Self::Bytes(bytes)
	}
}

impl From<Vec<u8>> for BodyValue {
	fn from(bytes: Vec<u8>) -> Self {
		Self::Bytes(Bytes::from(bytes))
	}
}

impl From<&'static [u8]> for BodyValue {
	fn from(bytes: &'static [u8]) -> Self {
		Self::Bytes(Bytes::from_static(bytes))
	}
}

impl From<String> for BodyValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<serde_json::Value> for BodyValue {
	fn from(value: serde_json::Value) -> Self {
		Self::Json(value)
	}
}

/// Unparsed body attached by serverless platforms (Cloud Functions style `rawBody`)
#[derive(Debug, Clone, PartialEq)]
pub struct RawBody(pub BodyValue);

/// Body left behind by body-parsing middleware (`body`)
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub BodyValue);

/// Native pause/resume of the underlying transport
pub trait FlowControl: Send + Sync {
	/// # Errors
	///
	/// Fails when the transport has already been torn down.
	fn pause(&self) -> Result<(), FlowControlError>;

	/// # Errors
	///
	/// Fails when the transport has already been torn down.
	fn resume(&self) -> Result<(), FlowControlError>;
}

/// Signals emitted by a streaming request over its lifetime
#[derive(Debug, Clone)]
pub enum RequestEvent {
	Data(Bytes),
	End,
	Error(TransportError),
	Aborted,
}

impl RequestEvent {
	/// Wraps any transport error into a [`RequestEvent::Error`]
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::RequestEvent;
	///
	/// let event = RequestEvent::error("socket hang up");
	/// assert!(matches!(event, RequestEvent::Error(err) if err.to_string() == "socket hang up"));
	/// ```
	pub fn error<E>(err: E) -> Self
	where
		E: Into<Box<dyn StdError + Send + Sync>>,
	{
		Self::Error(Arc::from(err.into()))
	}

	pub fn data(chunk: impl Into<Bytes>) -> Self {
		Self::Data(chunk.into())
	}
}

/// An incoming request as seen by the form parser
#[derive(Clone, Default)]
pub struct Request {
	pub headers: HeaderMap,
	extensions: Extensions,
	flow_control: Option<Arc<dyn FlowControl>>,
}

impl Request {
	pub fn new(headers: HeaderMap) -> Self {
		Self {
			headers,
			..Self::default()
		}
	}

	/// Create a new RequestBuilder
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::{ParsedBody, Request};
	///
	/// let request = Request::builder()
	///     .header("content-type", "multipart/form-data; boundary=X")
	///     .body(b"--X--\r\n".to_vec())
	///     .build()
	///     .unwrap();
	///
	/// assert!(request.headers.contains_key("content-type"));
	/// assert!(request.extensions().contains::<ParsedBody>());
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn extensions(&self) -> &Extensions {
		&self.extensions
	}

	pub fn flow_control(&self) -> Option<Arc<dyn FlowControl>> {
		self.flow_control.clone()
	}

	pub fn set_flow_control(&mut self, flow_control: Arc<dyn FlowControl>) {
		self.flow_control = Some(flow_control);
	}
}

impl fmt::Debug for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("headers", &self.headers)
			.field("extensions", &self.extensions)
			.field("flow_control", &self.flow_control.is_some())
			.finish()
	}
}

/// Builder for [`Request`]
#[derive(Default)]
pub struct RequestBuilder {
	request: Request,
	error: Option<http::Error>,
}

impl RequestBuilder {
	/// Append a header, deferring conversion errors to [`build`](Self::build)
	pub fn header<K, V>(mut self, key: K, value: V) -> Self
	where
		HeaderName: TryFrom<K>,
		<HeaderName as TryFrom<K>>::Error: Into<http::Error>,
		HeaderValue: TryFrom<V>,
		<HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
	{
		if self.error.is_some() {
			return self;
		}
		let name = match HeaderName::try_from(key) {
			Ok(name) => name,
			Err(err) => {
				self.error = Some(err.into());
				return self;
			}
		};
		match HeaderValue::try_from(value) {
			Ok(value) => {
				self.request.headers.append(name, value);
			}
			Err(err) => self.error = Some(err.into()),
		}
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.request.headers = headers;
		self
	}

	/// Attach a platform-buffered raw body
	pub fn raw_body(self, value: impl Into<BodyValue>) -> Self {
		self.request.extensions.insert(RawBody(value.into()));
		self
	}

	/// Attach a body left by body-parsing middleware
	pub fn body(self, value: impl Into<BodyValue>) -> Self {
		self.request.extensions.insert(ParsedBody(value.into()));
		self
	}

	pub fn extension<T: Send + Sync + 'static>(self, value: T) -> Self {
		self.request.extensions.insert(value);
		self
	}

	pub fn flow_control(mut self, flow_control: Arc<dyn FlowControl>) -> Self {
		self.request.flow_control = Some(flow_control);
		self
	}

	/// # Errors
	///
	/// Returns the first invalid header name or value passed to
	/// [`header`](Self::header).
	pub fn build(self) -> Result<Request, http::Error> {
		match self.error {
			Some(err) => Err(err),
			None => Ok(self.request),
		}
	}
}
