//! Result aggregation
//!
//! Collects the field and file notifications of one parse and hands them to
//! the completion callback when the parse settles.

use reinhardt_multipart_engine::UploadedFile;
use std::collections::HashMap;

use crate::error::FormError;
use crate::notification::Notification;

/// Field name to value; a repeated name keeps the last value
pub type Fields = HashMap<String, String>;

/// Field name to uploaded file(s)
pub type Files = HashMap<String, FileEntry>;

/// Completion callback invoked once per parse
pub type CompletionCallback = Box<dyn FnOnce(Result<(), FormError>, Fields, Files)>;

/// Wraps a closure into a [`CompletionCallback`] for [`IncomingForm::parse`](crate::IncomingForm::parse)
///
/// # Examples
///
/// ```
/// use reinhardt_multipart::on_complete;
///
/// let callback = on_complete(|result, fields, files| {
///     assert!(result.is_ok());
///     assert!(fields.is_empty() && files.is_empty());
/// });
/// assert!(callback.is_some());
/// ```
pub fn on_complete<F>(callback: F) -> Option<CompletionCallback>
where
	F: FnOnce(Result<(), FormError>, Fields, Files) + 'static,
{
	Some(Box::new(callback))
}

/// One file, or every file under the name when multiples are enabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
	Single(UploadedFile),
	Multiple(Vec<UploadedFile>),
}

impl FileEntry {
	/// The first file under this name
	pub fn first(&self) -> Option<&UploadedFile> {
		self.iter().next()
	}

	pub fn len(&self) -> usize {
		match self {
			Self::Single(_) => 1,
			Self::Multiple(files) => files.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn iter(&self) -> std::slice::Iter<'_, UploadedFile> {
		match self {
			Self::Single(file) => std::slice::from_ref(file).iter(),
			Self::Multiple(files) => files.iter(),
		}
	}

	fn push(&mut self, file: UploadedFile) {
		match std::mem::replace(self, Self::Multiple(Vec::new())) {
			Self::Single(first) => *self = Self::Multiple(vec![first, file]),
			Self::Multiple(mut files) => {
				files.push(file);
				*self = Self::Multiple(files);
			}
		}
	}
}

/// Accumulates fields and files until the parse settles
pub struct ResultAggregator {
	multiples: bool,
	fields: Fields,
	files: Files,
	callback: Option<CompletionCallback>,
}

impl ResultAggregator {
	pub fn new(multiples: bool, callback: CompletionCallback) -> Self {
		Self {
			multiples,
			fields: Fields::new(),
			files: Files::new(),
			callback: Some(callback),
		}
	}

	pub fn fields(&self) -> &Fields {
		&self.fields
	}

	pub fn files(&self) -> &Files {
		&self.files
	}

	/// Whether the completion callback already ran
	pub fn is_complete(&self) -> bool {
		self.callback.is_none()
	}

	pub fn observe(&mut self, notification: &Notification) {
		match notification {
			Notification::Field { name, value } => {
				self.fields.insert(name.clone(), value.clone());
			}
			Notification::File { name, file } => self.add_file(name, file.clone()),
			Notification::Error(err) => self.complete(Err(err.clone())),
			Notification::End => self.complete(Ok(())),
			Notification::Progress { .. } | Notification::Aborted => {}
		}
	}

	fn add_file(&mut self, name: &str, file: UploadedFile) {
		if !self.multiples {
			self.files.insert(name.to_string(), FileEntry::Single(file));
			return;
		}
		match self.files.get_mut(name) {
			Some(entry) => entry.push(file),
			None => {
				self.files.insert(name.to_string(), FileEntry::Single(file));
			}
		}
	}

	fn complete(&mut self, result: Result<(), FormError>) {
		let Some(callback) = self.callback.take() else {
			return;
		};
		let fields = std::mem::take(&mut self.fields);
		let files = std::mem::take(&mut self.files);
		callback(result, fields, files);
	}
}
