//! Keeps an HTML table in sync with a server-sent event stream, one row at a time.
//!
//! The ordering and identity rules live in [`collate`] and [`sync`] and don't depend on the DOM.
//! [`dom`] adapts them to a `<table>` and an [***EventSource***](https://developer.mozilla.org/en-US/docs/Web/API/EventSource).

#![doc(html_root_url = "https://docs.rs/live-table-dom/0.0.1")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod collate;
pub mod config;
pub mod dom;
pub mod event;
mod listeners;
pub mod load;
pub mod memory;
pub mod row;
pub mod sync;

pub use config::Config;
pub use dom::{attach, AttachError, Attachment};
pub use memory::VecRows;
pub use sync::{Outcome, RowList, StreamState, TableSync};

/// Stream payloads may contain personal data, so they are only logged with the `"dangerous-logging"` feature.
fn redact(payload: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		payload
	} else {
		"[redacted]"
	}
}
