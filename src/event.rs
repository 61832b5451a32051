//! Stream event names and payload decoding.

use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

/// What a named stream event does to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
	Upsert,
	Remove,
	Reset,
}

/// The stream event names that map to each [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
	pub upsert: Cow<'static, str>,
	pub remove: Cow<'static, str>,
	pub reset: Cow<'static, str>,
}

impl Default for EventNames {
	fn default() -> Self {
		Self {
			upsert: Cow::Borrowed("connect"),
			remove: Cow::Borrowed("disconnect"),
			reset: Cow::Borrowed("error"),
		}
	}
}

impl EventNames {
	#[must_use]
	pub fn kind(&self, name: &str) -> Option<EventKind> {
		if name == self.upsert {
			Some(EventKind::Upsert)
		} else if name == self.remove {
			Some(EventKind::Remove)
		} else if name == self.reset {
			Some(EventKind::Reset)
		} else {
			None
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, EventKind)> {
		vec![(&*self.upsert, EventKind::Upsert), (&*self.remove, EventKind::Remove), (&*self.reset, EventKind::Reset)].into_iter()
	}
}

#[derive(Debug, Error)]
pub enum PayloadError {
	#[error("upsert payload is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("upsert payload is a JSON {0}, expected an array")]
	NotAnArray(&'static str),
}

/// Decodes an upsert payload into the row's cell values.
///
/// # Errors
///
/// Iff the payload isn't a JSON array.
pub fn decode_upsert(payload: &str) -> Result<Vec<Value>, PayloadError> {
	match serde_json::from_str(payload)? {
		Value::Array(values) => Ok(values),
		other => Err(PayloadError::NotAnArray(json_kind(&other))),
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// One step in resolving which row a remove event targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
	/// The named field of a JSON object payload, unless absent or `null`.
	Field(Cow<'static, str>),
	/// The whole decoded JSON payload.
	Whole,
}

impl RemoveTarget {
	fn extract<'a>(&self, parsed: &'a Value) -> Option<&'a Value> {
		match self {
			RemoveTarget::Field(name) => parsed.as_object()?.get(&**name).filter(|value| !value.is_null()),
			RemoveTarget::Whole => Some(parsed),
		}
	}
}

/// The ordered extractors tried on a remove payload that decodes as JSON.
///
/// A payload that isn't JSON is used as the key verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveTargetChain(Vec<RemoveTarget>);

impl Default for RemoveTargetChain {
	/// `key`, then `s`, then the whole payload.
	fn default() -> Self {
		Self(vec![RemoveTarget::Field(Cow::Borrowed("key")), RemoveTarget::Field(Cow::Borrowed("s")), RemoveTarget::Whole])
	}
}

impl RemoveTargetChain {
	#[must_use]
	pub fn new(steps: Vec<RemoveTarget>) -> Self {
		Self(steps)
	}

	#[must_use]
	pub fn steps(&self) -> &[RemoveTarget] {
		&self.0
	}

	/// Resolves the identity key a remove payload targets.
	///
	/// Returns [`None`] if the first matching extractor yields anything but a non-empty string,
	/// or if no extractor matches at all.
	///
	/// ```
	/// use live_table_dom::event::RemoveTargetChain;
	///
	/// let chain = RemoveTargetChain::default();
	/// assert_eq!(chain.resolve(r#"{"key":"bob"}"#).as_deref(), Some("bob"));
	/// assert_eq!(chain.resolve(r#"{"s":"bob"}"#).as_deref(), Some("bob"));
	/// assert_eq!(chain.resolve(r#""bob""#).as_deref(), Some("bob"));
	/// assert_eq!(chain.resolve("bob").as_deref(), Some("bob"));
	/// assert_eq!(chain.resolve(r#"{"key":5}"#), None);
	/// ```
	#[must_use]
	pub fn resolve(&self, payload: &str) -> Option<String> {
		let target = match serde_json::from_str::<Value>(payload) {
			Ok(parsed) => match self.0.iter().find_map(|step| step.extract(&parsed)) {
				Some(Value::String(target)) => target.clone(),
				_ => return None,
			},
			Err(_) => payload.to_owned(),
		};
		Some(target).filter(|target| !target.is_empty())
	}
}
