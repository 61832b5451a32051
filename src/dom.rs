//! Binding a [`TableSync`] to an HTML table and an [***EventSource***](https://developer.mozilla.org/en-US/docs/Web/API/EventSource).

use crate::{
	config::Config,
	event::EventKind,
	listeners::Listeners,
	load,
	row::{Cell, Row, Sanitize},
	sync::{RowList, TableSync},
};
use core::cell::RefCell;
use js_sys::{Function, Reflect};
use std::{borrow::Cow, rc::Rc};
use thiserror::Error;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
use web_sys::{Document, EventSource, HtmlElement, HtmlTableElement, HtmlTableRowElement, HtmlTableSectionElement, MessageEvent, Node, Window};

#[derive(Debug, Error)]
pub enum AttachError {
	#[error("no global `window` exists")]
	NoWindow,
	#[error("the window or table has no document")]
	NoDocument,
	#[error("table not found: {0:?}")]
	TableNotFound(String),
	#[error("element {0:?} is not a <table>")]
	NotATable(String),
	#[error("couldn't open the event stream: {0}")]
	Stream(String),
	#[error("couldn't listen for stream events: {0}")]
	Listener(String),
	#[error("DOM operation failed: {0}")]
	Dom(String),
}

/// A [`RowList`] over the rows of all `<tbody>`s of a table, in document order.
///
/// Appended rows go into the last body.
#[derive(Debug, Clone)]
pub struct DomRows {
	document: Document,
	table: HtmlTableElement,
	sort_key_attribute: Cow<'static, str>,
	identity_attribute: Cow<'static, str>,
}

impl DomRows {
	/// Creates the table's first `<tbody>` if it has none.
	///
	/// # Errors
	///
	/// Iff the table isn't in a document or the `<tbody>` can't be created.
	pub fn new(table: HtmlTableElement, config: &Config) -> Result<Self, AttachError> {
		let document = table.owner_document().ok_or(AttachError::NoDocument)?;
		load::load_or_create_body(&table)?;
		Ok(Self {
			document,
			table,
			sort_key_attribute: config.sort_key_attribute.clone(),
			identity_attribute: config.identity_attribute.clone(),
		})
	}

	#[must_use]
	pub fn table(&self) -> &HtmlTableElement {
		&self.table
	}

	fn bodies(&self) -> Vec<HtmlTableSectionElement> {
		load::load_bodies(&self.table)
	}

	fn row(&self, mut index: usize) -> Option<HtmlTableRowElement> {
		for body in self.bodies() {
			let rows = body.rows();
			let len = rows.length() as usize;
			if index < len {
				return rows.item(index as u32)?.dyn_into().ok();
			}
			index -= len;
		}
		None
	}

	fn first_cell(&self, index: usize) -> Option<HtmlElement> {
		load::load_first_cell(&self.row(index)?)
	}

	fn render(&self, row: &Row) -> Result<HtmlTableRowElement, JsValue> {
		let tr: HtmlTableRowElement = self.document.create_element("tr")?.dyn_into()?;
		tr.dataset().set(&self.identity_attribute, row.key())?;
		for cell in row.cells() {
			let td = self.document.create_element("td")?;
			match cell {
				Cell::Text(text) => td.set_text_content(Some(text.as_str())),
				Cell::Html(html) => td.set_inner_html(html),
			}
			tr.append_child(&td)?;
		}
		Ok(tr)
	}

	fn try_insert(&self, index: usize, row: &Row) -> Result<(), JsValue> {
		let tr = self.render(row)?;
		match self.row(index) {
			Some(anchor) => {
				let anchor: &Node = anchor.as_ref();
				let parent = anchor.parent_node().ok_or_else(|| JsValue::from_str("row has no parent"))?;
				parent.insert_before(&tr, Some(anchor))?;
			}
			None => {
				let body = match self.bodies().pop() {
					Some(body) => body,
					None => load::load_or_create_body(&self.table).map_err(|error| JsValue::from_str(&error.to_string()))?,
				};
				body.append_child(&tr)?;
			}
		}
		Ok(())
	}

	fn try_replace(&self, index: usize, row: &Row) -> Result<(), JsValue> {
		let old = self.row(index).ok_or_else(|| JsValue::from_str("row index out of bounds"))?;
		let tr = self.render(row)?;
		let parent = old.parent_node().ok_or_else(|| JsValue::from_str("row has no parent"))?;
		parent.replace_child(&tr, &old)?;
		Ok(())
	}
}

impl RowList for DomRows {
	fn len(&self) -> usize {
		self.bodies().iter().map(|body| body.rows().length() as usize).sum()
	}

	fn display_key(&self, index: usize) -> String {
		self.first_cell(index).map(|cell| load::load_cell_text(&cell)).unwrap_or_default()
	}

	/// Reads the first cell of the detached rendered row, so that the browser parses its HTML exactly as it will once inserted.
	fn key_of(&self, row: &Row) -> String {
		match self.render(row) {
			Ok(tr) => load::load_first_cell(&tr).map(|cell| load::load_cell_text(&cell)).unwrap_or_default(),
			Err(error) => {
				error!("Couldn't render row to read its key: {:?}", error);
				row.display_key().into_owned()
			}
		}
	}

	fn sort_key_attribute(&self, index: usize) -> Option<String> {
		load::load_dataset_entry(&self.first_cell(index)?, &self.sort_key_attribute)
	}

	fn insert(&mut self, index: usize, row: Row) {
		if let Err(error) = self.try_insert(index, &row) {
			error!("Couldn't insert row {}: {:?}", index, error);
		}
	}

	fn replace(&mut self, index: usize, row: Row) {
		if let Err(error) = self.try_replace(index, &row) {
			error!("Couldn't replace row {}: {:?}", index, error);
		}
	}

	fn remove(&mut self, index: usize) {
		match self.row(index) {
			Some(row) => row.remove(),
			None => error!("Couldn't remove row {}: out of bounds", index),
		}
	}

	fn clear(&mut self) {
		for body in self.bodies() {
			body.set_text_content(None);
		}
	}
}

/// The page's [DOMPurify](https://github.com/cure53/DOMPurify).
///
/// `window.DOMPurify` is looked up on each call, so a sanitizer script that loads after [`attach`] still applies to later rows.
#[derive(Debug, Clone)]
pub struct DomPurify {
	window: Window,
}

impl DomPurify {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}

	/// `window.DOMPurify` and its `sanitize` method, if loaded right now.
	fn lookup(&self) -> Option<(JsValue, Function)> {
		let purify = Reflect::get(&self.window, &JsValue::from_str("DOMPurify")).ok().filter(|purify| !purify.is_undefined() && !purify.is_null())?;
		let sanitize = Reflect::get(&purify, &JsValue::from_str("sanitize")).ok()?.dyn_into::<Function>().ok()?;
		Some((purify, sanitize))
	}

	#[must_use]
	pub fn is_loaded(&self) -> bool {
		self.lookup().is_some()
	}
}

impl Sanitize for DomPurify {
	/// Inserts `html` verbatim iff DOMPurify isn't loaded yet.
	///
	/// Otherwise fails closed: if DOMPurify throws or returns something other than a string, the cell is left empty.
	fn sanitize(&self, html: &str) -> String {
		let (purify, sanitize) = match self.lookup() {
			Some(found) => found,
			None => {
				trace!("DOMPurify is not loaded. Inserting HTML unsanitized.");
				return html.to_owned();
			}
		};
		match sanitize.call1(&purify, &JsValue::from_str(html)) {
			Ok(safe) => safe.as_string().unwrap_or_else(|| {
				error!("DOMPurify.sanitize returned a non-string: {:?}", safe);
				String::new()
			}),
			Err(error) => {
				error!("DOMPurify.sanitize threw: {:?}", error);
				String::new()
			}
		}
	}
}

/// A table kept in sync with an event stream.
///
/// Dropping this closes the stream and unregisters its listeners. The table keeps its current rows.
#[derive(Debug)]
pub struct Attachment {
	source: EventSource,
	sync: Rc<RefCell<TableSync<DomRows>>>,
	listeners: Listeners,
}

impl Attachment {
	#[must_use]
	pub fn sync(&self) -> &Rc<RefCell<TableSync<DomRows>>> {
		&self.sync
	}

	#[must_use]
	pub fn source(&self) -> &EventSource {
		&self.source
	}

	pub fn detach(self) {
		drop(self)
	}

	/// Keeps the table in sync for the lifetime of the page.
	pub fn keep_alive(self) {
		core::mem::forget(self)
	}
}

impl Drop for Attachment {
	fn drop(&mut self) {
		self.source.close();
		match self.sync.try_borrow_mut() {
			Ok(mut sync) => sync.close(),
			Err(_) => error!("Attachment dropped while handling a stream event."),
		}
		trace!("Detached.");
	}
}

/// Binds the table with id `table_id` to the event stream at `stream_url`.
///
/// # Errors
///
/// Iff the table can't be found or the stream can't be opened.
/// Errors are also logged, and no stream is left open.
#[instrument(skip(config))]
pub fn attach(table_id: &str, stream_url: &str, config: Config) -> Result<Attachment, AttachError> {
	let result = try_attach(table_id, stream_url, config);
	if let Err(error) = &result {
		error!("Couldn't attach to table: {}", error);
	}
	result
}

fn try_attach(table_id: &str, stream_url: &str, config: Config) -> Result<Attachment, AttachError> {
	let window = web_sys::window().ok_or(AttachError::NoWindow)?;
	let document = window.document().ok_or(AttachError::NoDocument)?;
	let table = load::load_table(&document, table_id)?;

	let columns = load::load_column_count(&table);
	if columns == 0 {
		warn!("Table {:?} has no header row. Rows will be rendered without cells.", table_id);
	}

	let rows = DomRows::new(table, &config)?;
	let purify = DomPurify::new(window);
	if !purify.is_loaded() && !config.html_columns.is_empty() {
		warn!("DOMPurify is not loaded yet. HTML cells will be inserted unsanitized until it is.");
	}
	let mut sync = TableSync::new(rows, columns, config).with_sanitizer(purify);

	let source = EventSource::new(stream_url).map_err(|error| AttachError::Stream(format!("{:?}", error)))?;
	sync.on_connecting();
	let event_names = sync.config().event_names.clone();

	let mut attachment = Attachment {
		listeners: Listeners::new(source.clone().into()),
		source,
		sync: Rc::new(RefCell::new(sync)),
	};

	for (name, kind) in event_names.iter() {
		let sync = Rc::clone(&attachment.sync);
		attachment
			.listeners
			.listen(name, move |event| handle_event(&sync, kind, &event))
			.map_err(|error| AttachError::Listener(format!("{:?}", error)))?;
	}

	let sync = Rc::clone(&attachment.sync);
	attachment
		.listeners
		.listen("open", move |_| match sync.try_borrow_mut() {
			Ok(mut sync) => sync.on_open(),
			Err(_) => error!("Stream opened while handling a stream event."),
		})
		.map_err(|error| AttachError::Listener(format!("{:?}", error)))?;

	Ok(attachment)
}

fn handle_event(sync: &RefCell<TableSync<DomRows>>, kind: EventKind, event: &web_sys::Event) {
	let payload = event.dyn_ref::<MessageEvent>().and_then(|message| message.data().as_string()).unwrap_or_default();
	match sync.try_borrow_mut() {
		Ok(mut sync) => {
			let outcome = sync.dispatch(kind, &payload);
			trace!("{:?} event: {:?}", kind, outcome);
		}
		Err(_) => error!("Dropped a re-entrant {:?} event.", kind),
	}
}

/// Keeps the `<table>` with id `table_id` in sync with the event stream at `stream_url` for the lifetime of the page.
///
/// `html_columns` lists the column indices whose cells carry HTML, and defaults to `[0, 2, 6]`.
///
/// # Errors
///
/// Throws iff the table can't be found or the stream can't be opened.
#[wasm_bindgen(js_name = attach)]
pub fn attach_js(table_id: &str, stream_url: &str, html_columns: Option<Box<[u32]>>) -> Result<(), JsValue> {
	let mut config = Config::default();
	if let Some(html_columns) = html_columns {
		config = config.html_columns(html_columns.iter().map(|column| *column as usize).collect());
	}
	attach(table_id, stream_url, config).map(Attachment::keep_alive).map_err(|error| JsValue::from_str(&error.to_string()))
}
