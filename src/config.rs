use crate::{
	event::{EventNames, RemoveTargetChain},
	row::HtmlColumns,
};
use std::borrow::Cow;

/// How a table is synchronized. The [`Default`] matches the broker's connected clients page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub html_columns: HtmlColumns,
	pub event_names: EventNames,
	pub remove_target_chain: RemoveTargetChain,
	/// The [***dataset***](https://developer.mozilla.org/en-US/docs/Web/API/HTMLElement/dataset) entry on a row's first cell that overrides its text when matching removals.
	pub sort_key_attribute: Cow<'static, str>,
	/// The [***dataset***](https://developer.mozilla.org/en-US/docs/Web/API/HTMLElement/dataset) entry on each inserted row that records its raw identity key.
	pub identity_attribute: Cow<'static, str>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			html_columns: HtmlColumns::default(),
			event_names: EventNames::default(),
			remove_target_chain: RemoveTargetChain::default(),
			sort_key_attribute: Cow::Borrowed("sortKey"),
			identity_attribute: Cow::Borrowed("key"),
		}
	}
}

impl Config {
	#[must_use]
	pub fn html_columns(self, html_columns: HtmlColumns) -> Self {
		Self { html_columns, ..self }
	}

	#[must_use]
	pub fn event_names(self, event_names: EventNames) -> Self {
		Self { event_names, ..self }
	}

	#[must_use]
	pub fn remove_target_chain(self, remove_target_chain: RemoveTargetChain) -> Self {
		Self { remove_target_chain, ..self }
	}

	#[must_use]
	pub fn sort_key_attribute(self, sort_key_attribute: impl Into<Cow<'static, str>>) -> Self {
		Self {
			sort_key_attribute: sort_key_attribute.into(),
			..self
		}
	}

	#[must_use]
	pub fn identity_attribute(self, identity_attribute: impl Into<Cow<'static, str>>) -> Self {
		Self {
			identity_attribute: identity_attribute.into(),
			..self
		}
	}
}
