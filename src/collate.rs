//! Row key normalization and collation.
//!
//! The collator is implemented here rather than borrowed from the browser's [***Intl.Collator***](https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Intl/Collator)
//! so that the same pair of keys always orders the same way, regardless of the visitor's locale.

use core::cmp::Ordering;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Collapses whitespace runs into single spaces, trims and applies Unicode NFKC.
///
/// A missing key normalizes to the empty string.
///
/// ```
/// use live_table_dom::collate::normalize;
///
/// assert_eq!(normalize("  two \t words\n"), "two words");
/// assert_eq!(normalize(None), "");
/// assert_eq!(normalize("ｆｕｌｌ１"), "full1");
/// ```
#[must_use]
pub fn normalize<'a>(raw: impl Into<Option<&'a str>>) -> String {
	let raw = raw.into().unwrap_or_default();
	let mut collapsed = String::with_capacity(raw.len());
	for word in raw.split_whitespace() {
		if !collapsed.is_empty() {
			collapsed.push(' ');
		}
		collapsed.push_str(word);
	}
	collapsed.nfkc().collect()
}

/// Orders two row keys with the [default `Collator`](`Collator::default`).
///
/// Returns [`Ordering::Equal`] exactly when the keys are order-equivalent,
/// that is when they differ at most in case, accents, punctuation, whitespace or leading zeros.
/// This is a preorder: it places rows, but distinct keys may compare equal. See [`identity`] for which rows an upsert replaces.
///
/// ```
/// use core::cmp::Ordering;
/// use live_table_dom::collate::compare;
///
/// assert_eq!(compare("item2", "item10"), Ordering::Less);
/// assert_eq!(compare("Café!", "cafe"), Ordering::Equal);
/// ```
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
	Collator::default().compare(a, b)
}

/// Like [`compare`], but breaks collation ties by code point order of the normalized keys.
///
/// This is a strict total order: only keys that normalize identically compare equal.
/// It places a row among the order-equivalent rows it doesn't replace.
#[must_use]
pub fn compare_total(a: &str, b: &str) -> Ordering {
	Collator::default().compare_total(a, b)
}

/// The case-folded form of a row key that decides which row an upsert replaces.
///
/// Keys with the same identity always [`compare`] equal, but not the other way around.
///
/// ```
/// use live_table_dom::collate::identity;
///
/// assert_eq!(identity("Bob"), identity(" bob"));
/// assert_ne!(identity("sensor01"), identity("sensor1"));
/// assert_ne!(identity("client-1"), identity("client_1"));
/// ```
#[must_use]
pub fn identity<'a>(key: impl Into<Option<&'a str>>) -> String {
	normalize(key).to_lowercase()
}

/// Which differences between letters are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
	/// `a = á = A`
	Base,
	/// `a ≠ á`, `a = A`
	Accent,
	/// `a = á`, `a ≠ A`
	Case,
	/// `a ≠ á ≠ A`
	Variant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collator {
	pub sensitivity: Sensitivity,
	pub ignore_punctuation: bool,
	pub numeric: bool,
}

impl Default for Collator {
	/// Case- and accent-insensitive, punctuation-insensitive and numeric.
	fn default() -> Self {
		Self {
			sensitivity: Sensitivity::Base,
			ignore_punctuation: true,
			numeric: true,
		}
	}
}

/// One collation element.
///
/// Variant order is significant: digit runs sort before any other character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Element {
	/// A run of ASCII digits without leading zeros, ordered by length first so that it orders by value.
	///
	/// NFKD folds compatibility digits like `１` into this range. Digits of other scripts are [`Element::Char`]s.
	Number { len: usize, digits: String },
	Char(char),
}

#[derive(Debug, Clone, Copy)]
struct Level {
	keep_accents: bool,
	keep_case: bool,
}

impl Collator {
	/// Compares two keys by collation only, after normalizing both.
	#[must_use]
	pub fn compare(&self, a: &str, b: &str) -> Ordering {
		let (a, b) = (normalize(a), normalize(b));
		if a == b {
			return Ordering::Equal;
		}
		self.collate_normalized(&a, &b)
	}

	/// Compares two keys by collation and then by code point order, after normalizing both.
	#[must_use]
	pub fn compare_total(&self, a: &str, b: &str) -> Ordering {
		let (a, b) = (normalize(a), normalize(b));
		if a == b {
			return Ordering::Equal;
		}
		self.collate_normalized(&a, &b).then_with(|| a.cmp(&b))
	}

	fn collate_normalized(&self, a: &str, b: &str) -> Ordering {
		for level in self.levels() {
			match self.elements(a, *level).cmp(&self.elements(b, *level)) {
				Ordering::Equal => continue,
				unequal => return unequal,
			}
		}
		Ordering::Equal
	}

	fn levels(&self) -> &'static [Level] {
		const PRIMARY: Level = Level { keep_accents: false, keep_case: false };
		const ACCENTS: Level = Level { keep_accents: true, keep_case: false };
		const CASE: Level = Level { keep_accents: false, keep_case: true };
		const BOTH: Level = Level { keep_accents: true, keep_case: true };
		match self.sensitivity {
			Sensitivity::Base => &[PRIMARY],
			Sensitivity::Accent => &[PRIMARY, ACCENTS],
			Sensitivity::Case => &[PRIMARY, CASE],
			Sensitivity::Variant => &[PRIMARY, ACCENTS, CASE, BOTH],
		}
	}

	fn elements(&self, normalized: &str, level: Level) -> Vec<Element> {
		let mut elements = Vec::with_capacity(normalized.len());
		let mut digits: Option<String> = None;

		let chars = normalized
			.nfkd()
			.filter(|c| level.keep_accents || !is_combining_mark(*c))
			.filter(|c| !self.ignore_punctuation || c.is_alphanumeric() || (level.keep_accents && is_combining_mark(*c)))
			.flat_map(|c| -> Box<dyn Iterator<Item = char>> {
				if level.keep_case {
					Box::new(core::iter::once(c))
				} else {
					Box::new(c.to_lowercase())
				}
			});

		for c in chars {
			if self.numeric && c.is_ascii_digit() {
				let run = digits.get_or_insert_with(String::new);
				if !(run.is_empty() && c == '0') {
					run.push(c);
				}
				continue;
			}
			if let Some(run) = digits.take() {
				elements.push(Element::Number { len: run.len(), digits: run });
			}
			elements.push(Element::Char(c));
		}
		if let Some(run) = digits {
			elements.push(Element::Number { len: run.len(), digits: run });
		}

		elements
	}
}
