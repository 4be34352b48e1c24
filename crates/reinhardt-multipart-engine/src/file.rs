//! Uploaded file descriptors
//!
//! Files are held in memory; persisting them is left to the caller.

use bytes::Bytes;

/// An uploaded file as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
	field_name: String,
	filename: String,
	content_type: Option<String>,
	content: Bytes,
}

impl UploadedFile {
	/// Create a new UploadedFile
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart_engine::UploadedFile;
	///
	/// let file = UploadedFile::new("avatar", "me.png", vec![1, 2, 3]);
	/// assert_eq!(file.field_name(), "avatar");
	/// assert_eq!(file.filename(), "me.png");
	/// assert_eq!(file.size(), 3);
	/// assert_eq!(file.content_type(), None);
	/// ```
	pub fn new(
		field_name: impl Into<String>,
		filename: impl Into<String>,
		content: impl Into<Bytes>,
	) -> Self {
		Self {
			field_name: field_name.into(),
			filename: filename.into(),
			content_type: None,
			content: content.into(),
		}
	}

	/// Set the content type declared by the client
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart_engine::UploadedFile;
	///
	/// let file = UploadedFile::new("doc", "a.txt", "hi").with_content_type("text/plain");
	/// assert_eq!(file.content_type(), Some("text/plain"));
	/// ```
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());
		self
	}

	/// Form field the file was submitted under
	pub fn field_name(&self) -> &str {
		&self.field_name
	}

	/// Original filename sent by the client
	pub fn filename(&self) -> &str {
		&self.filename
	}

	pub fn content_type(&self) -> Option<&str> {
		self.content_type.as_deref()
	}

	pub fn content(&self) -> &Bytes {
		&self.content
	}

	/// Size of the file content in bytes
	pub fn size(&self) -> usize {
		self.content.len()
	}

	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}
}
