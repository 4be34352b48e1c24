//! Engine error types

/// Errors that can occur while decoding a form body
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	#[error("bad content-type header, no content-type")]
	MissingContentType,
	#[error("bad content-type header, no multipart boundary")]
	MissingBoundary,
	#[error("bad content-type header, unknown content-type: {0}")]
	UnsupportedContentType(String),
	#[error("invalid {0} header")]
	InvalidHeader(&'static str),
	#[error("body written before headers")]
	HeadersNotWritten,
	#[error("body written after end of input")]
	AlreadyEnded,
	#[error("multipart decode failed: {0}")]
	Multipart(#[from] multer::Error),
	#[error("urlencoded decode failed: {0}")]
	Urlencoded(#[from] serde_urlencoded::de::Error),
	#[error("maxFields ({0}) exceeded")]
	TooManyFields(usize),
	#[error("maxFieldsSize ({0} bytes) exceeded")]
	FieldsTooLarge(usize),
	#[error("maxFileSize ({limit} bytes) exceeded by {filename}")]
	FileTooLarge { filename: String, limit: usize },
}
