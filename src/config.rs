//! Form parser configuration

use reinhardt_multipart_engine::EngineOptions;
use serde::{Deserialize, Serialize};

use crate::detect::{ModeDetector, PayloadSlot};

/// Configuration for [`IncomingForm::from_config`](crate::IncomingForm::from_config)
///
/// Missing keys fall back to the defaults, so a settings file only has to
/// name what it changes.
///
/// # Examples
///
/// ```
/// use reinhardt_multipart::{FormConfig, PayloadSlot};
///
/// let config: FormConfig = serde_json::from_str(r#"{
///     "multiples": true,
///     "payload_slots": ["body"]
/// }"#).unwrap();
///
/// assert!(config.multiples);
/// assert_eq!(config.max_fields, 1000);
/// assert_eq!(config.payload_slots, vec![PayloadSlot::Body]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
	/// Keep every file submitted under the same field name
	pub multiples: bool,

	/// Maximum number of fields and files
	pub max_fields: usize,

	/// Maximum combined size of field values, in bytes
	pub max_fields_size: usize,

	/// Maximum size of a single uploaded file, in bytes
	pub max_file_size: usize,

	/// Request slots checked for an already buffered body, in priority order
	pub payload_slots: Vec<PayloadSlot>,
}

impl Default for FormConfig {
	fn default() -> Self {
		let engine = EngineOptions::default();
		Self {
			multiples: engine.multiples,
			max_fields: engine.max_fields,
			max_fields_size: engine.max_fields_size,
			max_file_size: engine.max_file_size,
			payload_slots: vec![PayloadSlot::RawBody, PayloadSlot::Body],
		}
	}
}

impl FormConfig {
	pub fn new() -> Self {
		Self::default()
	}

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

	/// Replace the payload slots; an empty list makes every request streaming
	pub fn with_payload_slots(mut self, slots: impl IntoIterator<Item = PayloadSlot>) -> Self {
		self.payload_slots = slots.into_iter().collect();
		self
	}

	pub fn engine_options(&self) -> EngineOptions {
		EngineOptions::default()
			.with_multiples(self.multiples)
			.with_max_fields(self.max_fields)
			.with_max_fields_size(self.max_fields_size)
			.with_max_file_size(self.max_file_size)
	}

	pub fn detector(&self) -> ModeDetector {
		ModeDetector::from_slots(&self.payload_slots)
	}
}
