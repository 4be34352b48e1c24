//! Default engine backed by `multer`
//!
//! Body chunks are pushed into an in-memory channel that feeds a
//! [`multer::Multipart`] decoder. After every write the decoder is polled
//! without blocking, so every part completed by the bytes seen so far is
//! reported immediately and the rest waits for the next chunk.

use bytes::{Bytes, BytesMut};
use futures::FutureExt;
use futures::channel::mpsc;
use http::HeaderMap;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::io;

use crate::{EngineError, EngineEvent, ParsingEngine, UploadedFile};

const DEFAULT_MAX_FIELDS: usize = 1000;
const DEFAULT_MAX_FIELDS_SIZE: usize = 20 * 1024 * 1024;
const DEFAULT_MAX_FILE_SIZE: usize = 200 * 1024 * 1024;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
	/// Keep every file submitted under the same field name
	pub multiples: bool,
	/// Maximum number of parts (fields and files)
	pub max_fields: usize,
	/// Maximum combined size of all non-file values, in bytes
	pub max_fields_size: usize,
	/// Maximum size of a single file, in bytes
	pub max_file_size: usize,
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self {
			multiples: false,
			max_fields: DEFAULT_MAX_FIELDS,
			max_fields_size: DEFAULT_MAX_FIELDS_SIZE,
			max_file_size: DEFAULT_MAX_FILE_SIZE,
		}
	}
}

impl EngineOptions {
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart_engine::EngineOptions;
	///
	/// let options = EngineOptions::default().with_multiples(true);
	/// assert!(options.multiples);
	/// assert_eq!(options.max_fields, 1000);
	/// ```
	pub fn with_multiples(mut self, multiples: bool) -> Self {
		self.multiples = multiples;
		self
	}

	pub fn with_max_fields(mut self, max_fields: usize) -> Self {
		self.max_fields = max_fields;
		self
	}

	pub fn with_max_fields_size(mut self, max_fields_size: usize) -> Self {
		self.max_fields_size = max_fields_size;
		self
	}

	pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
		self.max_file_size = max_file_size;
		self
	}
}

type ChunkSender = mpsc::UnboundedSender<Result<Bytes, io::Error>>;

enum Body {
	Unset,
	Multipart(MultipartBody),
	Urlencoded(BytesMut),
}

#[derive(Debug, Default)]
struct Tally {
	parts: usize,
	fields_size: usize,
}

impl Tally {
	fn admit_part(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
		self.parts += 1;
		if self.parts > options.max_fields {
			return Err(EngineError::TooManyFields(options.max_fields));
		}
		Ok(())
	}

	fn admit_field_bytes(&mut self, options: &EngineOptions, len: usize) -> Result<(), EngineError> {
		self.fields_size += len;
		if self.fields_size > options.max_fields_size {
			return Err(EngineError::FieldsTooLarge(options.max_fields_size));
		}
		Ok(())
	}
}

struct OpenPart {
	field: multer::Field<'static>,
	name: String,
	filename: Option<String>,
	content_type: Option<String>,
	data: BytesMut,
}

impl OpenPart {
	fn new(field: multer::Field<'static>) -> Self {
		let name = field.name().unwrap_or_default().to_string();
		let filename = field.file_name().map(str::to_string);
		let content_type = field.content_type().map(|mime| mime.to_string());
		Self {
			field,
			name,
			filename,
			content_type,
			data: BytesMut::new(),
		}
	}

	fn append(
		&mut self,
		bytes: &[u8],
		options: &EngineOptions,
		tally: &mut Tally,
	) -> Result<(), EngineError> {
		match &self.filename {
			Some(filename) => {
				if self.data.len() + bytes.len() > options.max_file_size {
					return Err(EngineError::FileTooLarge {
						filename: filename.clone(),
						limit: options.max_file_size,
					});
				}
			}
			None => tally.admit_field_bytes(options, bytes.len())?,
		}
		self.data.extend_from_slice(bytes);
		Ok(())
	}

	fn finish(self) -> EngineEvent {
		match self.filename {
			Some(filename) => {
				let mut file = UploadedFile::new(self.name.clone(), filename, self.data.freeze());
				if let Some(content_type) = self.content_type {
					file = file.with_content_type(content_type);
				}
				EngineEvent::File {
					name: self.name,
					file,
				}
			}
			None => EngineEvent::Field {
				name: self.name,
				value: String::from_utf8_lossy(&self.data).into_owned(),
			},
		}
	}
}

struct MultipartBody {
	sender: Option<ChunkSender>,
	decoder: multer::Multipart<'static>,
	open: Option<OpenPart>,
	finished: bool,
}

impl MultipartBody {
	fn new(boundary: String) -> Self {
		let (sender, receiver) = mpsc::unbounded();
		Self {
			sender: Some(sender),
			decoder: multer::Multipart::new(receiver, boundary),
			open: None,
			finished: false,
		}
	}

	fn push(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
		let sender = self.sender.as_ref().ok_or(EngineError::AlreadyEnded)?;
		sender
			.unbounded_send(Ok(Bytes::copy_from_slice(chunk)))
			.map_err(|_| EngineError::AlreadyEnded)
	}

	/// Closes the channel so the decoder observes the end of the stream.
	fn close(&mut self) {
		self.sender.take();
	}

	/// Decodes as far as the buffered bytes allow.
	fn pump(
		&mut self,
		options: &EngineOptions,
		tally: &mut Tally,
		emit: &mut dyn FnMut(EngineEvent),
	) -> Result<(), EngineError> {
		loop {
			if let Some(part) = self.open.as_mut() {
				match part.field.chunk().now_or_never() {
					None => return Ok(()),
					Some(Ok(Some(bytes))) => part.append(&bytes, options, tally)?,
					Some(Ok(None)) => {
						// The field must be dropped before the decoder hands out the next one.
						if let Some(part) = self.open.take() {
							tracing::trace!(name = %part.name, size = part.data.len(), "part complete");
							emit(part.finish());
						}
					}
					Some(Err(err)) => return Err(err.into()),
				}
				continue;
			}

			if self.finished {
				return Ok(());
			}

			match self.decoder.next_field().now_or_never() {
				None => return Ok(()),
				Some(Ok(Some(field))) => {
					tally.admit_part(options)?;
					self.open = Some(OpenPart::new(field));
				}
				Some(Ok(None)) => {
					self.finished = true;
					return Ok(());
				}
				Some(Err(err)) => return Err(err.into()),
			}
		}
	}
}

/// Parsing engine for multipart and urlencoded form bodies
///
/// # Examples
///
/// ```
/// use reinhardt_multipart_engine::{EngineEvent, EngineOptions, MultipartEngine, ParsingEngine};
/// use http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     CONTENT_TYPE,
///     HeaderValue::from_static("application/x-www-form-urlencoded"),
/// );
///
/// let mut engine = MultipartEngine::new(EngineOptions::default());
/// let mut events = Vec::new();
/// engine.write_headers(&headers).unwrap();
/// engine.write(b"a=1&b=2", &mut |event| events.push(event)).unwrap();
/// engine.end(&mut |event| events.push(event)).unwrap();
///
/// let fields: Vec<_> = events
///     .iter()
///     .filter_map(|event| match event {
///         EngineEvent::Field { name, value } => Some((name.as_str(), value.as_str())),
///         _ => None,
///     })
///     .collect();
/// assert_eq!(fields, vec![("a", "1"), ("b", "2")]);
/// ```
pub struct MultipartEngine {
	options: EngineOptions,
	body: Body,
	tally: Tally,
	received: u64,
	expected: Option<u64>,
	ended: bool,
}

impl MultipartEngine {
	pub fn new(options: EngineOptions) -> Self {
		Self {
			options,
			body: Body::Unset,
			tally: Tally::default(),
			received: 0,
			expected: None,
			ended: false,
		}
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	/// Total number of body bytes written so far
	pub fn bytes_received(&self) -> u64 {
		self.received
	}

	/// Body size announced by `content-length`, if any
	pub fn bytes_expected(&self) -> Option<u64> {
		self.expected
	}
}

impl Default for MultipartEngine {
	fn default() -> Self {
		Self::new(EngineOptions::default())
	}
}

impl ParsingEngine for MultipartEngine {
	fn multiples(&self) -> bool {
		self.options.multiples
	}

	fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), EngineError> {
		self.expected = match headers.get(CONTENT_LENGTH) {
			Some(value) => Some(
				value
					.to_str()
					.ok()
					.and_then(|length| length.trim().parse().ok())
					.ok_or(EngineError::InvalidHeader("content-length"))?,
			),
			None => None,
		};

		let content_type = headers
			.get(CONTENT_TYPE)
			.ok_or(EngineError::MissingContentType)?
			.to_str()
			.map_err(|_| EngineError::InvalidHeader("content-type"))?;
		let lowered = content_type.to_ascii_lowercase();

		self.body = if lowered.contains("multipart") {
			let boundary = multer::parse_boundary(content_type).map_err(|err| match err {
				multer::Error::NoBoundary => EngineError::MissingBoundary,
				other => EngineError::Multipart(other),
			})?;
			Body::Multipart(MultipartBody::new(boundary))
		} else if lowered.starts_with("application/x-www-form-urlencoded") {
			Body::Urlencoded(BytesMut::new())
		} else {
			return Err(EngineError::UnsupportedContentType(content_type.to_string()));
		};

		tracing::debug!(content_type, expected = ?self.expected, "engine headers written");
		Ok(())
	}

	fn write(
		&mut self,
		chunk: &[u8],
		emit: &mut dyn FnMut(EngineEvent),
	) -> Result<usize, EngineError> {
		if self.ended {
			return Err(EngineError::AlreadyEnded);
		}
		if matches!(self.body, Body::Unset) {
			return Err(EngineError::HeadersNotWritten);
		}

		self.received += chunk.len() as u64;
		emit(EngineEvent::Progress {
			received: self.received,
			expected: self.expected,
		});

		match &mut self.body {
			Body::Unset => return Err(EngineError::HeadersNotWritten),
			Body::Urlencoded(buffer) => buffer.extend_from_slice(chunk),
			Body::Multipart(multipart) => {
				multipart.push(chunk)?;
				multipart.pump(&self.options, &mut self.tally, emit)?;
			}
		}
		Ok(chunk.len())
	}

	fn end(&mut self, emit: &mut dyn FnMut(EngineEvent)) -> Result<(), EngineError> {
		if self.ended {
			return Err(EngineError::AlreadyEnded);
		}
		self.ended = true;

		match &mut self.body {
			Body::Unset => return Err(EngineError::HeadersNotWritten),
			Body::Urlencoded(buffer) => {
				let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&buffer[..])?;
				for (name, value) in pairs {
					self.tally.admit_part(&self.options)?;
					self.tally.admit_field_bytes(&self.options, value.len())?;
					emit(EngineEvent::Field { name, value });
				}
			}
			Body::Multipart(multipart) => {
				multipart.close();
				multipart.pump(&self.options, &mut self.tally, emit)?;
				if !multipart.finished {
					return Err(EngineError::Multipart(multer::Error::IncompleteStream));
				}
			}
		}

		tracing::debug!(received = self.received, "engine reached end of input");
		emit(EngineEvent::End);
		Ok(())
	}
}
