use crate::{row::Row, sync::RowList};

/// A [`RowList`] kept in memory, for use outside of a browser.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VecRows {
	rows: Vec<(Row, Option<String>)>,
}

impl VecRows {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a row as if it had been rendered into the page ahead of time, optionally with a precomputed sort key.
	pub fn push_prerendered(&mut self, row: Row, sort_key: Option<String>) {
		self.rows.push((row, sort_key));
	}

	pub fn iter(&self) -> impl Iterator<Item = &Row> {
		self.rows.iter().map(|(row, _)| row)
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<&Row> {
		self.rows.get(index).map(|(row, _)| row)
	}

	/// Each row's display key, in order.
	#[must_use]
	pub fn display_keys(&self) -> Vec<String> {
		self.iter().map(|row| row.display_key().into_owned()).collect()
	}
}

impl RowList for VecRows {
	fn len(&self) -> usize {
		self.rows.len()
	}

	fn display_key(&self, index: usize) -> String {
		self.rows[index].0.display_key().into_owned()
	}

	fn sort_key_attribute(&self, index: usize) -> Option<String> {
		self.rows[index].1.clone()
	}

	fn insert(&mut self, index: usize, row: Row) {
		self.rows.insert(index, (row, None));
	}

	fn replace(&mut self, index: usize, row: Row) {
		self.rows[index] = (row, None);
	}

	fn remove(&mut self, index: usize) {
		self.rows.remove(index);
	}

	fn clear(&mut self) {
		self.rows.clear();
	}
}
