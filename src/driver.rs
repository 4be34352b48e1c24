//! Async pumps between a transport and a form
//!
//! [`IncomingForm`] itself is synchronous: every signal is handled to
//! completion inside [`IncomingForm::dispatch`]. These helpers connect it to
//! an async transport by turning a hyper body into [`RequestEvent`]s and
//! delivering them in order.

use bytes::Buf;
use futures::stream::{self, Stream, StreamExt};
use http_body_util::BodyExt;
use reinhardt_multipart_engine::ParsingEngine;
use std::error::Error as StdError;

use crate::form::{CompletionState, IncomingForm};
use crate::request::RequestEvent;

/// Deliver `events` to `form` until the form settles or the stream ends
///
/// # Examples
///
/// ```
/// use futures::stream;
/// use reinhardt_multipart::{IncomingForm, Request, RequestEvent, drive, on_complete};
///
/// # tokio_test::block_on(async {
/// let request = Request::builder()
///     .header("content-type", "application/x-www-form-urlencoded")
///     .build()
///     .unwrap();
///
/// let mut form: IncomingForm = IncomingForm::default();
/// form.parse(&request, on_complete(|result, fields, _files| {
///     assert!(result.is_ok());
///     assert_eq!(fields["b"], "2");
/// }));
///
/// let events = stream::iter(vec![
///     RequestEvent::data("a=1&"),
///     RequestEvent::data("b=2"),
///     RequestEvent::End,
/// ]);
/// let state = drive(&mut form, events).await;
/// assert!(state.is_ended());
/// # });
/// ```
pub async fn drive<E, S>(form: &mut IncomingForm<E>, events: S) -> CompletionState
where
	E: ParsingEngine,
	S: Stream<Item = RequestEvent>,
{
	futures::pin_mut!(events);
	while !form.is_complete() {
		let Some(event) = events.next().await else {
			tracing::debug!("request stream closed before the form settled");
			break;
		};
		form.dispatch(event);
	}
	form.state()
}

/// Turn an HTTP body into request signals
///
/// Each data frame becomes [`RequestEvent::Data`]; the stream ends with
/// [`RequestEvent::End`], or with [`RequestEvent::Error`] if the body fails.
/// Trailers are skipped.
pub fn body_events<B>(body: B) -> impl Stream<Item = RequestEvent>
where
	B: hyper::body::Body + Unpin,
	B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
	stream::unfold(Some(body), |state| async move {
		let mut body = state?;
		loop {
			match body.frame().await {
				Some(Ok(frame)) => {
					let Ok(mut data) = frame.into_data() else {
						continue;
					};
					let chunk = data.copy_to_bytes(data.remaining());
					return Some((RequestEvent::Data(chunk), Some(body)));
				}
				Some(Err(err)) => return Some((RequestEvent::error(err), None)),
				None => return Some((RequestEvent::End, None)),
			}
		}
	})
}
