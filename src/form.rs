//! The parse entry point
//!
//! [`IncomingForm`] wraps one [`ParsingEngine`] per request. `parse` wires the
//! result aggregation first, classifies the request, and then either replays a
//! buffered body into the engine right away or waits for the transport to
//! deliver [`RequestEvent`]s through [`IncomingForm::dispatch`].
//!
//! ## Event flow
//!
//! ```text
//! parse(request, callback)
//!   ├─ aggregator installed (if callback)
//!   ├─ ModeDetector::classify
//!   ├─ Buffered:  write_headers → write(payload)
//!   └─ Streaming: write_headers → flow control → data/aborted subscribed
//!
//! dispatch(Data)    → engine.write        → Field/File/Progress
//! dispatch(End)     → engine.end          → End   → callback(Ok)
//! dispatch(Error)   → report_error        → Error → callback(Err)
//! dispatch(Aborted) → Aborted, report_error(Aborted)
//! ```

use reinhardt_multipart_engine::{EngineEvent, MultipartEngine, ParsingEngine};
use std::sync::Arc;

use crate::aggregate::{CompletionCallback, ResultAggregator};
use crate::config::FormConfig;
use crate::detect::{ModeDetector, RequestMode};
use crate::error::FormError;
use crate::notification::{Listener, Notification};
use crate::request::{FlowControl, Request, RequestEvent};

/// Terminal state of one parse
///
/// At most one of `errored` / `ended` is ever entered first; the other
/// transition is refused afterwards, which is what keeps the completion
/// callback to a single call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompletionState {
	errored: bool,
	ended: bool,
}

impl CompletionState {
	pub fn is_errored(&self) -> bool {
		self.errored
	}

	pub fn is_ended(&self) -> bool {
		self.ended
	}

	pub fn is_settled(&self) -> bool {
		self.errored || self.ended
	}

	/// Enter the error state; `false` if already settled
	pub fn try_error(&mut self) -> bool {
		if self.is_settled() {
			return false;
		}
		self.errored = true;
		true
	}

	/// Enter the ended state; `false` if already settled
	pub fn try_end(&mut self) -> bool {
		if self.is_settled() {
			return false;
		}
		self.ended = true;
		true
	}
}

/// Request signals a parse listens to
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Subscriptions {
	pub data: bool,
	pub end: bool,
	pub error: bool,
	pub aborted: bool,
}

impl Subscriptions {
	fn buffered() -> Self {
		Self {
			end: true,
			error: true,
			..Self::default()
		}
	}

	fn streaming() -> Self {
		Self {
			data: true,
			end: true,
			error: true,
			aborted: true,
		}
	}

	fn accepts(&self, event: &RequestEvent) -> bool {
		match event {
			RequestEvent::Data(_) => self.data,
			RequestEvent::End => self.end,
			RequestEvent::Error(_) => self.error,
			RequestEvent::Aborted => self.aborted,
		}
	}
}

#[derive(Debug, Clone, Copy)]
enum FlowAction {
	Pause,
	Resume,
}

/// Form parser bound to a single request
///
/// # Examples
///
/// ```
/// use reinhardt_multipart::{IncomingForm, FileEntry, Request, on_complete};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let body = "--X\r\n\
///     Content-Disposition: form-data; name=\"a\"\r\n\r\n\
///     1\r\n\
///     --X\r\n\
///     Content-Disposition: form-data; name=\"f\"; filename=\"f.txt\"\r\n\r\n\
///     file body\r\n\
///     --X--\r\n";
///
/// let request = Request::builder()
///     .header("content-type", "multipart/form-data; boundary=X")
///     .raw_body(body.as_bytes().to_vec())
///     .build()
///     .unwrap();
///
/// let outcome = Rc::new(RefCell::new(None));
/// let sink = outcome.clone();
///
/// let mut form: IncomingForm = IncomingForm::default();
/// form.parse(&request, on_complete(move |result, fields, files| {
///     *sink.borrow_mut() = Some((result, fields, files));
/// }));
/// form.dispatch(reinhardt_multipart::RequestEvent::End);
///
/// let (result, fields, files) = outcome.borrow_mut().take().unwrap();
/// assert!(result.is_ok());
/// assert_eq!(fields["a"], "1");
/// assert!(matches!(&files["f"], FileEntry::Single(file) if file.filename() == "f.txt"));
/// ```
pub struct IncomingForm<E = MultipartEngine> {
	engine: E,
	detector: ModeDetector,
	state: CompletionState,
	listeners: Vec<Listener>,
	aggregator: Option<ResultAggregator>,
	mode: Option<RequestMode>,
	subscriptions: Subscriptions,
	flow_control: Option<Arc<dyn FlowControl>>,
	request_ended: bool,
}

impl IncomingForm<MultipartEngine> {
	/// Build a form around the default engine configured from `config`
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::{FormConfig, IncomingForm, ParsingEngine};
	///
	/// let form = IncomingForm::from_config(&FormConfig::default().with_multiples(true));
	/// assert!(form.engine().multiples());
	/// ```
	pub fn from_config(config: &FormConfig) -> Self {
		Self::new(MultipartEngine::new(config.engine_options())).with_detector(config.detector())
	}
}

impl Default for IncomingForm<MultipartEngine> {
	fn default() -> Self {
		Self::from_config(&FormConfig::default())
	}
}

impl<E: ParsingEngine> IncomingForm<E> {
	pub fn new(engine: E) -> Self {
		Self {
			engine,
			detector: ModeDetector::default(),
			state: CompletionState::default(),
			listeners: Vec::new(),
			aggregator: None,
			mode: None,
			subscriptions: Subscriptions::default(),
			flow_control: None,
			request_ended: false,
		}
	}

	pub fn with_detector(mut self, detector: ModeDetector) -> Self {
		self.detector = detector;
		self
	}

	pub fn engine(&self) -> &E {
		&self.engine
	}

	pub fn engine_mut(&mut self) -> &mut E {
		&mut self.engine
	}

	pub fn state(&self) -> CompletionState {
		self.state
	}

	/// Whether an error or the end of the body has been reached
	pub fn is_complete(&self) -> bool {
		self.state.is_settled()
	}

	/// The classification made by [`parse`](Self::parse), if it ran
	pub fn mode(&self) -> Option<&RequestMode> {
		self.mode.as_ref()
	}

	pub fn subscriptions(&self) -> Subscriptions {
		self.subscriptions
	}

	/// Observe every notification
	///
	/// Register before [`parse`](Self::parse) to see what a buffered body
	/// produces; those notifications are emitted before `parse` returns.
	pub fn subscribe<F>(&mut self, listener: F) -> &mut Self
	where
		F: FnMut(&Notification) + 'static,
	{
		self.listeners.push(Box::new(listener));
		self
	}

	/// Start parsing `request`
	///
	/// With a callback, fields and files are aggregated and the callback runs
	/// exactly once, with the first error or after the end of the body.
	/// Without one, nothing is aggregated and only listeners registered through
	/// [`subscribe`](Self::subscribe) observe the parse.
	pub fn parse(&mut self, request: &Request, callback: Option<CompletionCallback>) -> &mut Self {
		if let Some(callback) = callback {
			self.aggregator = Some(ResultAggregator::new(self.engine.multiples(), callback));
		}

		let mode = self.detector.classify(request);
		tracing::debug!(buffered = mode.is_buffered(), "parsing form request");

		match &mode {
			RequestMode::Buffered(payload) => {
				self.subscriptions = Subscriptions::buffered();
				let fed = self
					.engine
					.write_headers(&request.headers)
					.and_then(|()| self.write_engine(payload));
				if let Err(err) = fed {
					self.report_error(FormError::feed(err));
				}
			}
			RequestMode::Streaming => {
				if let Err(err) = self.engine.write_headers(&request.headers) {
					self.report_error(FormError::feed(err));
				}
				self.flow_control = request.flow_control();
				self.subscriptions = Subscriptions::streaming();
			}
		}

		self.mode = Some(mode);
		self
	}

	/// Deliver one request signal
	///
	/// Signals the current parse is not subscribed to are ignored.
	pub fn dispatch(&mut self, event: RequestEvent) {
		if !self.subscriptions.accepts(&event) {
			tracing::trace!(?event, "ignoring unsubscribed request event");
			return;
		}

		match event {
			RequestEvent::Data(chunk) => {
				tracing::trace!(len = chunk.len(), "feeding request chunk");
				// Later chunks are still written after a failed one.
				if let Err(err) = self.write_engine(&chunk) {
					self.report_error(FormError::feed(err));
				}
			}
			RequestEvent::End => self.on_request_end(),
			RequestEvent::Error(err) => self.report_error(FormError::Request(err)),
			RequestEvent::Aborted => {
				self.emit(Notification::Aborted);
				self.report_error(FormError::Aborted);
			}
		}
	}

	/// Ask the transport to stop delivering data
	///
	/// Returns `false` when there is no flow control or it failed. A failure
	/// before the request ended terminates the parse.
	pub fn pause(&mut self) -> bool {
		self.flow(FlowAction::Pause)
	}

	/// Ask the transport to resume delivering data
	pub fn resume(&mut self) -> bool {
		self.flow(FlowAction::Resume)
	}

	fn flow(&mut self, action: FlowAction) -> bool {
		let Some(flow_control) = self.flow_control.clone() else {
			return false;
		};
		let result = match action {
			FlowAction::Pause => flow_control.pause(),
			FlowAction::Resume => flow_control.resume(),
		};
		match result {
			Ok(()) => true,
			Err(err) => {
				if self.request_ended || self.state.is_ended() {
					tracing::debug!(?action, error = %err, "flow control failed after request end");
				} else {
					self.report_error(FormError::FlowControl(Arc::new(err)));
				}
				false
			}
		}
	}

	fn on_request_end(&mut self) {
		self.request_ended = true;
		if self.state.is_settled() {
			return;
		}

		let mut events = Vec::new();
		let finished = self.engine.end(&mut |event| events.push(event));
		self.deliver(events);
		if let Err(err) = finished {
			self.report_error(FormError::finalize(err));
		}
	}

	fn write_engine(&mut self, chunk: &[u8]) -> Result<usize, reinhardt_multipart_engine::EngineError> {
		let mut events = Vec::new();
		let written = self.engine.write(chunk, &mut |event| events.push(event));
		self.deliver(events);
		written
	}

	fn deliver(&mut self, events: Vec<EngineEvent>) {
		for event in events {
			match event {
				EngineEvent::End => {
					if self.state.try_end() {
						self.emit(Notification::End);
					}
				}
				other => self.emit(other.into()),
			}
		}
	}

	fn report_error(&mut self, err: FormError) {
		if !self.state.try_error() {
			tracing::debug!(error = %err, "suppressing error after parse settled");
			return;
		}
		tracing::debug!(error = %err, "form parse failed");
		self.emit(Notification::Error(err));
	}

	fn emit(&mut self, notification: Notification) {
		for listener in &mut self.listeners {
			listener(&notification);
		}
		if let Some(aggregator) = self.aggregator.as_mut() {
			aggregator.observe(&notification);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::aggregate::{Fields, Files, on_complete};
	use crate::error::FlowControlError;
	use bytes::Bytes;
	use http::HeaderMap;
	use reinhardt_multipart_engine::{EngineError, UploadedFile};
	use rstest::rstest;
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::rc::Rc;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

	/// Engine that replays canned events and records what it was fed
	#[derive(Default)]
	struct ScriptedEngine {
		multiples: bool,
		fail_headers: bool,
		fail_writes: VecDeque<bool>,
		on_write: VecDeque<Vec<EngineEvent>>,
		on_end: Vec<EngineEvent>,
		fail_end: bool,
		headers_written: usize,
		writes: Vec<Bytes>,
		ends: usize,
	}

	impl ParsingEngine for ScriptedEngine {
		fn multiples(&self) -> bool {
			self.multiples
		}

		fn write_headers(&mut self, _headers: &HeaderMap) -> Result<(), EngineError> {
			self.headers_written += 1;
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
			self.writes.push(Bytes::copy_from_slice(chunk));
			for event in self.on_write.pop_front().unwrap_or_default() {
				emit(event);
			}
			if self.fail_writes.pop_front().unwrap_or(false) {
				return Err(EngineError::HeadersNotWritten);
			}
			Ok(chunk.len())
		}

		fn end(&mut self, emit: &mut dyn FnMut(EngineEvent)) -> Result<(), EngineError> {
			self.ends += 1;
			if self.fail_end {
				return Err(EngineError::AlreadyEnded);
			}
			for event in self.on_end.drain(..) {
				emit(event);
			}
			emit(EngineEvent::End);
			Ok(())
		}
	}

	type Outcomes = Rc<RefCell<Vec<(Result<(), FormError>, Fields, Files)>>>;

	fn recorder() -> (Outcomes, Option<CompletionCallback>) {
		let outcomes: Outcomes = Rc::new(RefCell::new(Vec::new()));
		let sink = outcomes.clone();
		let callback = on_complete(move |result, fields, files| {
			sink.borrow_mut().push((result, fields, files));
		});
		(outcomes, callback)
	}

	fn field(name: &str, value: &str) -> EngineEvent {
		EngineEvent::Field {
			name: name.to_string(),
			value: value.to_string(),
		}
	}

	fn streaming_request() -> Request {
		Request::builder()
			.header("content-type", "multipart/form-data; boundary=X")
			.build()
			.unwrap()
	}

	fn buffered_request(payload: &'static [u8]) -> Request {
		Request::builder()
			.header("content-type", "multipart/form-data; boundary=X")
			.raw_body(payload)
			.build()
			.unwrap()
	}

	struct RecordingFlow {
		fail: AtomicBool,
		pauses: AtomicUsize,
		resumes: AtomicUsize,
	}

	impl RecordingFlow {
		fn new(fail: bool) -> Arc<Self> {
			Arc::new(Self {
				fail: AtomicBool::new(fail),
				pauses: AtomicUsize::new(0),
				resumes: AtomicUsize::new(0),
			})
		}

		fn outcome(&self) -> Result<(), FlowControlError> {
			if self.fail.load(Ordering::SeqCst) {
				return Err(FlowControlError::Destroyed);
			}
			Ok(())
		}
	}

	impl FlowControl for RecordingFlow {
		fn pause(&self) -> Result<(), FlowControlError> {
			self.pauses.fetch_add(1, Ordering::SeqCst);
			self.outcome()
		}

		fn resume(&self) -> Result<(), FlowControlError> {
			self.resumes.fetch_add(1, Ordering::SeqCst);
			self.outcome()
		}
	}

	#[rstest]
	fn test_completion_state_transitions() {
		let mut state = CompletionState::default();
		assert!(state.try_error());
		assert!(!state.try_error());
		assert!(!state.try_end());
		assert!(state.is_errored() && !state.is_ended());

		let mut state = CompletionState::default();
		assert!(state.try_end());
		assert!(!state.try_error());
		assert!(state.is_settled());
	}

	#[rstest]
	fn test_buffered_request_is_fed_synchronously() {
		// Arrange
		let engine = ScriptedEngine {
			on_write: VecDeque::from(vec![vec![field("a", "1")]]),
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		form.subscribe(move |notification| sink.borrow_mut().push(notification.clone()));

		// Act
		form.parse(&buffered_request(b"payload"), None);

		// Assert
		assert_eq!(form.engine().headers_written, 1);
		assert_eq!(form.engine().writes, vec![Bytes::from_static(b"payload")]);
		assert_eq!(form.engine().ends, 0);
		assert!(form.mode().is_some_and(RequestMode::is_buffered));
		assert_eq!(form.subscriptions(), Subscriptions::buffered());
		assert!(matches!(&seen.borrow()[0], Notification::Field { name, .. } if name == "a"));
	}

	#[rstest]
	fn test_buffered_request_completes_on_request_end() {
		// Arrange
		let engine = ScriptedEngine {
			on_write: VecDeque::from(vec![vec![field("a", "1")]]),
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();
		form.parse(&buffered_request(b"payload"), callback);

		// Act
		form.dispatch(RequestEvent::End);

		// Assert
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(outcomes[0].0.is_ok());
		assert_eq!(outcomes[0].1.get("a").map(String::as_str), Some("1"));
		assert_eq!(form.engine().ends, 1);
	}

	#[rstest]
	fn test_buffered_request_ignores_data_and_abort() {
		// Arrange
		let mut form = IncomingForm::new(ScriptedEngine::default());
		let (outcomes, callback) = recorder();
		form.parse(&buffered_request(b"payload"), callback);

		// Act
		form.dispatch(RequestEvent::data("late chunk"));
		form.dispatch(RequestEvent::Aborted);

		// Assert
		assert_eq!(form.engine().writes.len(), 1);
		assert!(outcomes.borrow().is_empty());
	}

	#[rstest]
	fn test_buffered_header_failure_skips_payload() {
		// Arrange
		let engine = ScriptedEngine {
			fail_headers: true,
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();

		// Act
		form.parse(&buffered_request(b"payload"), callback);
		form.dispatch(RequestEvent::End);

		// Assert
		assert!(form.engine().writes.is_empty());
		assert_eq!(form.engine().ends, 0);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(matches!(
			outcomes[0].0.as_ref().unwrap_err().engine_error(),
			Some(EngineError::MissingContentType)
		));
	}

	#[rstest]
	fn test_streaming_header_failure_keeps_subscriptions() {
		// Arrange
		let engine = ScriptedEngine {
			fail_headers: true,
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();

		// Act
		form.parse(&streaming_request(), callback);
		form.dispatch(RequestEvent::data("chunk"));
		form.dispatch(RequestEvent::End);

		// Assert
		assert_eq!(form.subscriptions(), Subscriptions::streaming());
		assert_eq!(form.engine().writes, vec![Bytes::from_static(b"chunk")]);
		assert_eq!(form.engine().ends, 0);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		let err = outcomes[0].0.as_ref().unwrap_err();
		assert!(matches!(err, FormError::Feed(_)));
		assert!(matches!(err.engine_error(), Some(EngineError::MissingContentType)));
	}

	#[rstest]
	fn test_buffered_payload_failure_is_reported() {
		// Arrange
		let engine = ScriptedEngine {
			fail_writes: VecDeque::from(vec![true]),
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();

		// Act
		form.parse(&buffered_request(b"payload"), callback);

		// Assert
		assert!(form.state().is_errored());
		assert!(matches!(outcomes.borrow()[0].0, Err(FormError::Feed(_))));
	}

	#[rstest]
	fn test_streaming_request_subscribes_without_feeding() {
		// Arrange
		let mut form = IncomingForm::new(ScriptedEngine::default());

		// Act
		form.parse(&streaming_request(), None);

		// Assert
		assert_eq!(form.mode(), Some(&RequestMode::Streaming));
		assert_eq!(form.subscriptions(), Subscriptions::streaming());
		assert_eq!(form.engine().headers_written, 1);
		assert!(form.engine().writes.is_empty());
	}

	#[rstest]
	fn test_streaming_chunks_fed_in_order() {
		// Arrange
		let engine = ScriptedEngine {
			on_end: vec![field("b", "2")],
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);

		// Act
		form.dispatch(RequestEvent::data("first"));
		form.dispatch(RequestEvent::data("second"));
		form.dispatch(RequestEvent::End);

		// Assert
		assert_eq!(
			form.engine().writes,
			vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
		);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(outcomes[0].0.is_ok());
		assert_eq!(outcomes[0].1.get("b").map(String::as_str), Some("2"));
		assert!(outcomes[0].2.is_empty());
	}

	#[rstest]
	fn test_failed_chunk_does_not_stop_later_chunks() {
		// Arrange
		let engine = ScriptedEngine {
			fail_writes: VecDeque::from(vec![true, false]),
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);

		// Act
		form.dispatch(RequestEvent::data("bad"));
		form.dispatch(RequestEvent::data("good"));
		form.dispatch(RequestEvent::End);

		// Assert
		assert_eq!(form.engine().writes.len(), 2);
		assert_eq!(form.engine().ends, 0);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(matches!(outcomes[0].0, Err(FormError::Feed(_))));
	}

	#[rstest]
	fn test_abort_emits_notification_and_fixed_error() {
		// Arrange
		let engine = ScriptedEngine {
			on_write: VecDeque::from(vec![vec![field("a", "1")]]),
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let aborted = Rc::new(RefCell::new(0));
		let counter = aborted.clone();
		form.subscribe(move |notification| {
			if matches!(notification, Notification::Aborted) {
				*counter.borrow_mut() += 1;
			}
		});
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);
		form.dispatch(RequestEvent::data("partial"));

		// Act
		form.dispatch(RequestEvent::Aborted);
		form.dispatch(RequestEvent::End);

		// Assert
		assert_eq!(*aborted.borrow(), 1);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		let err = outcomes[0].0.as_ref().unwrap_err();
		assert_eq!(err.to_string(), "Request aborted");
		assert_eq!(outcomes[0].1.get("a").map(String::as_str), Some("1"));
		assert_eq!(form.engine().ends, 0);
	}

	#[rstest]
	fn test_request_error_then_end_fires_callback_once() {
		// Arrange
		let mut form = IncomingForm::new(ScriptedEngine::default());
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);

		// Act
		form.dispatch(RequestEvent::error("socket hang up"));
		form.dispatch(RequestEvent::error("second failure"));
		form.dispatch(RequestEvent::End);

		// Assert
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert_eq!(
			outcomes[0].0.as_ref().unwrap_err().to_string(),
			"socket hang up"
		);
		assert_eq!(form.engine().ends, 0);
	}

	#[rstest]
	fn test_finalization_error_is_reported() {
		// Arrange
		let engine = ScriptedEngine {
			fail_end: true,
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);

		// Act
		form.dispatch(RequestEvent::End);

		// Assert
		assert!(matches!(outcomes.borrow()[0].0, Err(FormError::Finalize(_))));
	}

	#[rstest]
	fn test_error_after_end_is_suppressed() {
		// Arrange
		let mut form = IncomingForm::new(ScriptedEngine::default());
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);
		form.dispatch(RequestEvent::End);

		// Act
		form.dispatch(RequestEvent::error("too late"));

		// Assert
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(outcomes[0].0.is_ok());
		assert!(form.state().is_ended());
		assert!(!form.state().is_errored());
	}

	#[rstest]
	fn test_no_callback_still_sets_error_state() {
		// Arrange
		let mut form = IncomingForm::new(ScriptedEngine::default());
		form.parse(&streaming_request(), None);

		// Act
		form.dispatch(RequestEvent::Aborted);
		form.dispatch(RequestEvent::End);

		// Assert
		assert!(form.state().is_errored());
		assert_eq!(form.engine().ends, 0);
	}

	#[rstest]
	fn test_multiples_taken_from_engine() {
		// Arrange
		let file = |filename: &str| EngineEvent::File {
			name: "f".to_string(),
			file: UploadedFile::new("f", filename, Bytes::new()),
		};
		let engine = ScriptedEngine {
			multiples: true,
			on_end: vec![file("a.txt"), file("b.txt")],
			..ScriptedEngine::default()
		};
		let mut form = IncomingForm::new(engine);
		let (outcomes, callback) = recorder();
		form.parse(&streaming_request(), callback);

		// Act
		form.dispatch(RequestEvent::End);

		// Assert
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes[0].2.get("f").map(|entry| entry.len()), Some(2));
	}

	#[rstest]
	fn test_pause_and_resume_delegate_to_request() {
		// Arrange
		let flow = RecordingFlow::new(false);
		let mut request = streaming_request();
		request.set_flow_control(flow.clone());
		let mut form = IncomingForm::new(ScriptedEngine::default());
		form.parse(&request, None);

		// Act
		let paused = form.pause();
		let resumed = form.resume();

		// Assert
		assert!(paused && resumed);
		assert_eq!(flow.pauses.load(Ordering::SeqCst), 1);
		assert_eq!(flow.resumes.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_flow_control_failure_before_end_is_fatal() {
		// Arrange
		let mut request = streaming_request();
		request.set_flow_control(RecordingFlow::new(true));
		let mut form = IncomingForm::new(ScriptedEngine::default());
		let (outcomes, callback) = recorder();
		form.parse(&request, callback);

		// Act
		let paused = form.pause();

		// Assert
		assert!(!paused);
		assert!(matches!(outcomes.borrow()[0].0, Err(FormError::FlowControl(_))));
	}

	#[rstest]
	fn test_flow_control_failure_after_end_is_tolerated() {
		// Arrange
		let flow = RecordingFlow::new(false);
		let mut request = streaming_request();
		request.set_flow_control(flow.clone());
		let mut form = IncomingForm::new(ScriptedEngine::default());
		let (outcomes, callback) = recorder();
		form.parse(&request, callback);
		form.dispatch(RequestEvent::End);
		flow.fail.store(true, Ordering::SeqCst);

		// Act
		let resumed = form.resume();

		// Assert
		assert!(!resumed);
		let outcomes = outcomes.borrow();
		assert_eq!(outcomes.len(), 1);
		assert!(outcomes[0].0.is_ok());
	}

	#[rstest]
	fn test_pause_without_flow_control_returns_false() {
		let mut form = IncomingForm::new(ScriptedEngine::default());
		form.parse(&buffered_request(b"payload"), None);

		assert!(!form.pause());
		assert!(!form.state().is_errored());
	}

	#[rstest]
	fn test_dispatch_before_parse_is_ignored() {
		let mut form = IncomingForm::new(ScriptedEngine::default());

		form.dispatch(RequestEvent::data("chunk"));
		form.dispatch(RequestEvent::End);

		assert!(form.engine().writes.is_empty());
		assert_eq!(form.engine().ends, 0);
	}
}
