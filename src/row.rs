use core::iter::FromIterator;
use hashbrown::HashSet;
use serde_json::Value;
use std::borrow::Cow;

/// Turns an untrusted HTML fragment into one that is safe to assign to [***innerHTML***](https://developer.mozilla.org/en-US/docs/Web/API/Element/innerHTML).
pub trait Sanitize {
	fn sanitize(&self, html: &str) -> String;
}

impl<F: Fn(&str) -> String> Sanitize for F {
	fn sanitize(&self, html: &str) -> String {
		self(html)
	}
}

/// The column indices whose cells carry HTML fragments. All other cells are plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlColumns(HashSet<usize>);

impl HtmlColumns {
	#[must_use]
	pub fn none() -> Self {
		Self(HashSet::new())
	}

	#[must_use]
	pub fn contains(&self, column: usize) -> bool {
		self.0.contains(&column)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Default for HtmlColumns {
	/// The client id link, the online duration and the disconnect button.
	fn default() -> Self {
		[0, 2, 6].iter().copied().collect()
	}
}

impl FromIterator<usize> for HtmlColumns {
	fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
	Text(String),
	/// Already sanitized, if a sanitizer was available.
	Html(String),
}

impl Cell {
	/// What the cell displays as text, which for HTML cells is the fragment's text content.
	#[must_use]
	pub fn text_content(&self) -> Cow<'_, str> {
		match self {
			Cell::Text(text) => Cow::Borrowed(text),
			Cell::Html(html) => html_text_content(html),
		}
	}
}

/// One table row, built from an upsert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
	key: String,
	cells: Vec<Cell>,
}

impl Row {
	/// Builds a row with exactly `columns` cells from the payload's values.
	///
	/// Values beyond `columns` are ignored and missing values render as empty cells.
	/// Cells in `html_columns` are passed through `sanitizer` if there is one, and are otherwise kept verbatim.
	#[must_use]
	pub fn build(values: &[Value], columns: usize, html_columns: &HtmlColumns, sanitizer: Option<&dyn Sanitize>) -> Self {
		let cells = (0..columns)
			.map(|i| {
				let value = values.get(i).map_or(Cow::Borrowed(""), value_text);
				if html_columns.contains(i) {
					Cell::Html(match sanitizer {
						Some(sanitizer) => sanitizer.sanitize(&value),
						None => value.into_owned(),
					})
				} else {
					Cell::Text(value.into_owned())
				}
			})
			.collect();

		Self {
			key: values.first().map_or(Cow::Borrowed(""), value_text).into_owned(),
			cells,
		}
	}

	/// The raw identity value from the payload's first field, before rendering.
	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	/// The text the first cell displays. Empty if the table has no columns.
	#[must_use]
	pub fn display_key(&self) -> Cow<'_, str> {
		self.cells.first().map_or(Cow::Borrowed(""), Cell::text_content)
	}

	#[must_use]
	pub fn cells(&self) -> &[Cell] {
		&self.cells
	}
}

/// Strings are used verbatim and `null` is empty. Other values render as their JSON text.
fn value_text(value: &Value) -> Cow<'_, str> {
	match value {
		Value::Null => Cow::Borrowed(""),
		Value::String(string) => Cow::Borrowed(string),
		other => Cow::Owned(other.to_string()),
	}
}

/// Drops tags and decodes character references.
///
/// This only approximates [***textContent***](https://developer.mozilla.org/en-US/docs/Web/API/Node/textContent)
/// for the well-formed fragments the broker sends and must never be used to sanitize.
#[must_use]
pub fn html_text_content(html: &str) -> Cow<'_, str> {
	if !html.contains(&['<', '&'][..]) {
		return Cow::Borrowed(html);
	}

	let mut text = String::with_capacity(html.len());
	let mut rest = html;
	while let Some(c) = rest.chars().next() {
		match c {
			'<' => match rest.find('>') {
				Some(end) => rest = &rest[end + 1..],
				None => break,
			},
			'&' => {
				let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| decode_reference(&rest[1..end]).map(|c| (c, end)));
				match decoded {
					Some((decoded, end)) => {
						text.push(decoded);
						rest = &rest[end + 1..];
					}
					None => {
						text.push('&');
						rest = &rest[1..];
					}
				}
			}
			c => {
				text.push(c);
				rest = &rest[c.len_utf8()..];
			}
		}
	}
	Cow::Owned(text)
}

fn decode_reference(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{A0}'),
		numeric => {
			let code = if let Some(hex) = numeric.strip_prefix("#x").or_else(|| numeric.strip_prefix("#X")) {
				u32::from_str_radix(hex, 16).ok()?
			} else {
				numeric.strip_prefix('#')?.parse().ok()?
			};
			core::char::from_u32(code)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn text_content_of_client_link() {
		let html = r##"<a href="#" onClick="return false;" style="color:inherit;">bob &amp; co</a>"##;
		assert_eq!(html_text_content(html), "bob & co");
	}

	#[test]
	fn text_content_keeps_stray_ampersand() {
		assert_eq!(html_text_content("a & b &#x41;&#66;"), "a & b AB");
	}

	#[test]
	fn build_pads_and_truncates() {
		let row = Row::build(&[json!("a"), json!(1), json!(null), json!("extra")], 4, &HtmlColumns::none(), None);
		assert_eq!(row.cells(), &[Cell::Text("a".into()), Cell::Text("1".into()), Cell::Text(String::new()), Cell::Text("extra".into())]);

		let row = Row::build(&[json!("a"), json!("b"), json!("c")], 2, &HtmlColumns::none(), None);
		assert_eq!(row.cells().len(), 2);

		let row = Row::build(&[json!("a")], 3, &HtmlColumns::none(), None);
		assert_eq!(row.cells()[2], Cell::Text(String::new()));
	}

	#[test]
	fn only_html_columns_are_sanitized() {
		let sanitizer = |html: &str| html.replace("<script>", "");
		let row = Row::build(&[json!("<b>a</b>"), json!("<script>")], 2, &[0].iter().copied().collect(), Some(&sanitizer));
		assert_eq!(row.cells(), &[Cell::Html("<b>a</b>".into()), Cell::Text("<script>".into())]);
		assert_eq!(row.display_key(), "a");
		assert_eq!(row.key(), "<b>a</b>");
	}

	#[test]
	fn unsanitized_html_is_verbatim() {
		let row = Row::build(&[json!("<img src=x onerror=alert(1)>")], 1, &HtmlColumns::default(), None);
		assert_eq!(row.cells(), &[Cell::Html("<img src=x onerror=alert(1)>".into())]);
	}

	#[test]
	fn no_columns_means_no_display_key() {
		let row = Row::build(&[json!("bob")], 0, &HtmlColumns::default(), None);
		assert_eq!(row.display_key(), "");
		assert_eq!(row.key(), "bob");
	}
}
