//! The incremental table synchronizer.
//!
//! [`TableSync`] owns an ordered [`RowList`] and applies stream events to it one row at a time.
//! The list is kept sorted by [`collate::compare`] of each row's display key.
//! An upsert replaces the row with the same [`collate::identity`] in place. Other order-equivalent rows stay, ordered by [`collate::compare_total`].

use crate::{
	collate,
	config::Config,
	event::{self, EventKind},
	redact,
	row::{Row, Sanitize},
};
use core::cmp::Ordering;
use tracing::{instrument, trace, trace_span, warn};

/// An ordered, mutable list of rendered rows.
///
/// Indices are positions in iteration order. Implementations log and swallow rendering failures.
pub trait RowList {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The text the row's first cell displays.
	///
	/// # Panics
	///
	/// May panic iff `index` is out of bounds.
	fn display_key(&self, index: usize) -> String;

	/// The display key `row` will have once inserted.
	fn key_of(&self, row: &Row) -> String {
		row.display_key().into_owned()
	}

	/// The precomputed sort key stored on the row's first cell, if any.
	fn sort_key_attribute(&self, index: usize) -> Option<String>;

	/// Inserts `row` before the row at `index`, or appends it iff `index == self.len()`.
	fn insert(&mut self, index: usize, row: Row);

	fn replace(&mut self, index: usize, row: Row);

	fn remove(&mut self, index: usize);

	fn clear(&mut self);
}

/// Per stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
	Disconnected,
	Connecting,
	Live,
	/// Synchronization was lost and the table was cleared. Waiting for the stream to repopulate it.
	Empty,
	/// Detached. Further events are ignored.
	Closed,
}

/// What handling a single event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Inserted(usize),
	Replaced(usize),
	Appended(usize),
	Removed(usize),
	/// A remove event that matched no row.
	NotFound,
	/// The payload was unusable or the synchronizer is closed.
	Dropped,
	/// The number of rows that were cleared.
	Cleared(usize),
}

pub struct TableSync<L> {
	rows: L,
	columns: usize,
	config: Config,
	sanitizer: Option<Box<dyn Sanitize>>,
	state: StreamState,
}

impl<L: core::fmt::Debug> core::fmt::Debug for TableSync<L> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("TableSync")
			.field("rows", &self.rows)
			.field("columns", &self.columns)
			.field("config", &self.config)
			.field("sanitizer", &self.sanitizer.is_some())
			.field("state", &self.state)
			.finish()
	}
}

impl<L: RowList> TableSync<L> {
	/// Creates a disconnected synchronizer over `rows`, rendering `columns` cells per row.
	///
	/// `rows` is expected to be sorted already. It is usually empty.
	#[must_use]
	pub fn new(rows: L, columns: usize, config: Config) -> Self {
		Self {
			rows,
			columns,
			config,
			sanitizer: None,
			state: StreamState::Disconnected,
		}
	}

	/// Sets the sanitizer applied to HTML cells.
	///
	/// Without one, HTML cells are inserted verbatim and must come from a trusted source.
	#[must_use]
	pub fn with_sanitizer(self, sanitizer: impl Sanitize + 'static) -> Self {
		Self {
			sanitizer: Some(Box::new(sanitizer)),
			..self
		}
	}

	#[must_use]
	pub fn rows(&self) -> &L {
		&self.rows
	}

	#[must_use]
	pub fn columns(&self) -> usize {
		self.columns
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn state(&self) -> StreamState {
		self.state
	}

	#[must_use]
	pub fn has_sanitizer(&self) -> bool {
		self.sanitizer.is_some()
	}

	/// The stream connection was requested.
	pub fn on_connecting(&mut self) {
		if self.state == StreamState::Disconnected {
			self.state = StreamState::Connecting;
		}
	}

	/// The stream connection (re)opened.
	pub fn on_open(&mut self) {
		if self.state != StreamState::Closed {
			self.state = StreamState::Live;
		}
	}

	/// Stops handling events. This is terminal.
	pub fn close(&mut self) {
		self.state = StreamState::Closed;
	}

	/// Routes a named event's payload to its handler.
	pub fn dispatch(&mut self, kind: EventKind, payload: &str) -> Outcome {
		match kind {
			EventKind::Upsert => self.on_upsert(payload),
			EventKind::Remove => self.on_remove(payload),
			EventKind::Reset => self.on_reset(),
		}
	}

	/// Inserts or replaces the row described by a JSON array payload.
	///
	/// Payloads that aren't JSON arrays are logged and dropped without touching the table.
	#[instrument(skip(self, payload))]
	pub fn on_upsert(&mut self, payload: &str) -> Outcome {
		if self.state == StreamState::Closed {
			return Outcome::Dropped;
		}

		let values = match event::decode_upsert(payload) {
			Ok(values) => values,
			Err(error) => {
				warn!("Dropping upsert event: {} (payload: {:?})", error, redact(payload));
				return Outcome::Dropped;
			}
		};

		let row = Row::build(&values, self.columns, &self.config.html_columns, self.sanitizer.as_deref());
		self.upsert_row(row)
	}

	/// Places `row` at its sorted position, replacing the row with the same identity if there is one.
	///
	/// Only the run of rows that [`collate::compare`] equal to the new key is searched for its identity.
	pub fn upsert_row(&mut self, row: Row) -> Outcome {
		if self.state == StreamState::Closed {
			return Outcome::Dropped;
		}
		self.state = StreamState::Live;

		let key = self.rows.key_of(&row);
		let span = trace_span!("upsert_row", key = redact(&key));
		let _enter = span.enter();

		let identity = collate::identity(key.as_str());
		let len = self.rows.len();
		let mut position = None;
		for i in 0..len {
			let existing = self.rows.display_key(i);
			match collate::compare(&key, &existing) {
				Ordering::Greater => continue,
				Ordering::Equal if collate::identity(existing.as_str()) == identity => {
					trace!("Replacing row {}.", i);
					self.rows.replace(i, row);
					return Outcome::Replaced(i);
				}
				Ordering::Equal => {
					if position.is_none() && collate::compare_total(&key, &existing) == Ordering::Less {
						position = Some(i);
					}
				}
				Ordering::Less => {
					position = position.or(Some(i));
					break;
				}
			}
		}

		match position {
			Some(i) => {
				trace!("Inserting before row {}.", i);
				self.rows.insert(i, row);
				Outcome::Inserted(i)
			}
			None => {
				trace!("Appending as row {}.", len);
				self.rows.insert(len, row);
				Outcome::Appended(len)
			}
		}
	}

	/// Removes the first row whose key matches the payload's target case-insensitively.
	///
	/// See [`RemoveTargetChain::resolve`](`crate::event::RemoveTargetChain::resolve`) for how the target is found.
	/// Unusable payloads are dropped silently.
	#[instrument(skip(self, payload))]
	pub fn on_remove(&mut self, payload: &str) -> Outcome {
		if self.state == StreamState::Closed {
			return Outcome::Dropped;
		}

		match self.config.remove_target_chain.resolve(payload) {
			Some(target) => self.remove_key(&target),
			None => {
				trace!("Ignoring remove event without a usable target (payload: {:?})", redact(payload));
				Outcome::Dropped
			}
		}
	}

	/// Removes the first row, in iteration order, whose sort key attribute (or else display key)
	/// equals `target` case-insensitively.
	pub fn remove_key(&mut self, target: &str) -> Outcome {
		if self.state == StreamState::Closed {
			return Outcome::Dropped;
		}
		self.state = StreamState::Live;

		let target = target.to_lowercase();
		for i in 0..self.rows.len() {
			let hay = self.rows.sort_key_attribute(i).filter(|key| !key.is_empty()).unwrap_or_else(|| self.rows.display_key(i));
			if hay.to_lowercase() == target {
				trace!("Removing row {}.", i);
				self.rows.remove(i);
				return Outcome::Removed(i);
			}
		}

		trace!("No row matched {:?}.", redact(&target));
		Outcome::NotFound
	}

	/// Clears the table because synchronization was lost.
	#[instrument(skip(self))]
	pub fn on_reset(&mut self) -> Outcome {
		if self.state == StreamState::Closed {
			return Outcome::Dropped;
		}

		let cleared = self.rows.len();
		self.rows.clear();
		self.state = StreamState::Empty;
		trace!("Cleared {} row(s).", cleared);
		Outcome::Cleared(cleared)
	}
}
