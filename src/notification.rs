//! Notifications emitted by a form while it parses

use reinhardt_multipart_engine::{EngineEvent, UploadedFile};

use crate::error::FormError;

/// What an [`IncomingForm`](crate::IncomingForm) reports to its listeners
#[derive(Debug, Clone)]
pub enum Notification {
	Field { name: String, value: String },
	File { name: String, file: UploadedFile },
	Progress { received: u64, expected: Option<u64> },
	Error(FormError),
	End,
	Aborted,
}

impl Notification {
	/// `true` for the notifications that settle a parse
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Error(_) | Self::End)
	}
}

impl From<EngineEvent> for Notification {
	fn from(event: EngineEvent) -> Self {
		match event {
			EngineEvent::Field { name, value } => Self::Field { name, value },
			EngineEvent::File { name, file } => Self::File { name, file },
			EngineEvent::Progress { received, expected } => Self::Progress { received, expected },
			EngineEvent::End => Self::End,
		}
	}
}

/// Observer of every notification a form emits
pub type Listener = Box<dyn FnMut(&Notification)>;
