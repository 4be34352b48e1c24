//! Type-keyed request properties
//!
//! Platforms and middleware that run before a form is parsed attach data to
//! the request here, most notably an already-buffered body (see
//! [`RawBody`](crate::RawBody) and [`ParsedBody`](crate::ParsedBody)).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Type-safe property storage
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	/// Create a new Extensions instance
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::Extensions;
	///
	/// let extensions = Extensions::new();
	/// assert!(!extensions.contains::<String>());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, replacing any previous value of the same type
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::{BodyValue, Extensions, RawBody};
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(RawBody(BodyValue::from(&b"payload"[..])));
	///
	/// assert!(extensions.contains::<RawBody>());
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Get a cloned value
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(42u32);
	///
	/// assert_eq!(extensions.get::<u32>(), Some(42));
	/// assert_eq!(extensions.get::<String>(), None);
	/// ```
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		self.with(|value: &T| value.clone())
	}

	/// Inspect a value in place without cloning it
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_multipart::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(vec![1u8, 2, 3]);
	///
	/// assert_eq!(extensions.with(|bytes: &Vec<u8>| bytes.len()), Some(3));
	/// assert_eq!(extensions.with(|text: &String| text.len()), None);
	/// ```
	pub fn with<T, R, F>(&self, f: F) -> Option<R>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&T) -> R,
	{
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.map(f)
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.contains_key(&TypeId::of::<T>())
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		f.debug_struct("Extensions").field("len", &map.len()).finish()
	}
}
