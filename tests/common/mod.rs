//! Shared helpers for the form integration tests

#![allow(dead_code)]

use bytes::Bytes;
use http::HeaderMap;
use reinhardt_multipart::{
	EngineError, EngineEvent, Fields, Files, FormError, ParsingEngine, UploadedFile, on_complete,
};
use reinhardt_multipart::CompletionCallback;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const BOUNDARY: &str = "X";

pub type Outcome = (Result<(), FormError>, Fields, Files);

/// Every completion the callback observed, in order
#[derive(Clone, Default)]
pub struct Completions(Rc<RefCell<Vec<Outcome>>>);

impl Completions {
	pub fn callback(&self) -> Option<CompletionCallback> {
		let sink = self.0.clone();
		on_complete(move |result, fields, files| {
			sink.borrow_mut().push((result, fields, files));
		})
	}

	pub fn count(&self) -> usize {
		self.0.borrow().len()
	}

	/// The single completion, panicking if the callback ran zero or several times
	pub fn only(&self) -> Outcome {
		let outcomes = self.0.borrow();
		assert_eq!(outcomes.len(), 1, "callback must run exactly once");
		outcomes[0].clone()
	}
}

/// Engine replaying scripted events, one batch per write
#[derive(Default)]
pub struct ScriptedEngine {
	pub multiples: bool,
	pub per_write: VecDeque<Result<Vec<EngineEvent>, ()>>,
	pub at_end: Vec<EngineEvent>,
	pub fail_headers: bool,
	pub fail_end: bool,
	pub headers: Option<HeaderMap>,
	pub written: Vec<Bytes>,
	pub ends: usize,
}

impl ScriptedEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_multiples(mut self) -> Self {
		self.multiples = true;
		self
	}

	/// Events emitted by the next write
	pub fn on_write(mut self, events: Vec<EngineEvent>) -> Self {
		self.per_write.push_back(Ok(events));
		self
	}

	/// Make the next write fail
	pub fn failing_write(mut self) -> Self {
		self.per_write.push_back(Err(()));
		self
	}

	/// Make `write_headers` reject the request
	pub fn failing_headers(mut self) -> Self {
		self.fail_headers = true;
		self
	}

	/// Events emitted by `end`, before `End`
	pub fn on_end(mut self, events: Vec<EngineEvent>) -> Self {
		self.at_end = events;
		self
	}
}

impl ParsingEngine for ScriptedEngine {
	fn multiples(&self) -> bool {
		self.multiples
	}

	fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), EngineError> {
		self.headers = Some(headers.clone());
		if self.fail_headers {
			return Err(EngineError::MissingContentType);
		}
		Ok(())
	}

	fn write(
		&mut self,
		chunk: &[u8],
		emit: &mut dyn FnMut(EngineEvent),
	) -> Result<usize, EngineError> {
		self.written.push(Bytes::copy_from_slice(chunk));
		match self.per_write.pop_front() {
			Some(Ok(events)) => events.into_iter().for_each(&mut *emit),
			Some(Err(())) => return Err(EngineError::HeadersNotWritten),
			None => {}
		}
		Ok(chunk.len())
	}

	fn end(&mut self, emit: &mut dyn FnMut(EngineEvent)) -> Result<(), EngineError> {
		self.ends += 1;
		if self.fail_end {
			return Err(EngineError::AlreadyEnded);
		}
		self.at_end.drain(..).for_each(&mut *emit);
		emit(EngineEvent::End);
		Ok(())
	}
}

pub fn field(name: &str, value: &str) -> EngineEvent {
	EngineEvent::Field {
		name: name.to_string(),
		value: value.to_string(),
	}
}

pub fn file(name: &str, filename: &str) -> EngineEvent {
	EngineEvent::File {
		name: name.to_string(),
		file: UploadedFile::new(name, filename, filename.as_bytes().to_vec()),
	}
}

/// A multipart part for [`multipart_body`]
pub enum Part<'a> {
	Field(&'a str, &'a str),
	File(&'a str, &'a str, &'a str),
}

/// Encode `parts` as a `multipart/form-data` body delimited by [`BOUNDARY`]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
	let mut body = String::new();
	for part in parts {
		body.push_str(&format!("--{BOUNDARY}\r\n"));
		match part {
			Part::Field(name, value) => {
				body.push_str(&format!(
					"Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
				));
			}
			Part::File(name, filename, content) => {
				body.push_str(&format!(
					"Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
					 Content-Type: text/plain\r\n\r\n{content}\r\n"
				));
			}
		}
	}
	body.push_str(&format!("--{BOUNDARY}--\r\n"));
	body.into_bytes()
}

pub fn multipart_content_type() -> String {
	format!("multipart/form-data; boundary={BOUNDARY}")
}
