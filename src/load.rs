use crate::dom::AttachError;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, HtmlTableElement, HtmlTableRowElement, HtmlTableSectionElement};

pub fn load_table(document: &Document, id: &str) -> Result<HtmlTableElement, AttachError> {
	document
		.get_element_by_id(id)
		.ok_or_else(|| AttachError::TableNotFound(id.to_owned()))?
		.dyn_into::<HtmlTableElement>()
		.map_err(|_| AttachError::NotATable(id.to_owned()))
}

/// The number of cells in the first header row, or `0` if there is no header.
#[must_use]
pub fn load_column_count(table: &HtmlTableElement) -> usize {
	table
		.t_head()
		.and_then(|head| head.rows().item(0))
		.and_then(|row| row.dyn_into::<HtmlTableRowElement>().ok())
		.map_or(0, |row| row.cells().length() as usize)
}

/// The table's bodies in document order.
#[must_use]
pub fn load_bodies(table: &HtmlTableElement) -> Vec<HtmlTableSectionElement> {
	let bodies = table.t_bodies();
	(0..bodies.length()).filter_map(|i| bodies.item(i)).filter_map(|body| body.dyn_into::<HtmlTableSectionElement>().ok()).collect()
}

/// The first body of the table, which is created if there is none.
pub fn load_or_create_body(table: &HtmlTableElement) -> Result<HtmlTableSectionElement, AttachError> {
	match load_bodies(table).into_iter().next() {
		Some(body) => Ok(body),
		None => table.create_t_body().dyn_into().map_err(|element| AttachError::Dom(format!("Expected <tbody> but created {:?}", element))),
	}
}

#[must_use]
pub fn load_rows(body: &HtmlTableSectionElement) -> Vec<HtmlTableRowElement> {
	let rows = body.rows();
	(0..rows.length()).filter_map(|i| rows.item(i)).filter_map(|row| row.dyn_into::<HtmlTableRowElement>().ok()).collect()
}

#[must_use]
pub fn load_first_cell(row: &HtmlTableRowElement) -> Option<HtmlElement> {
	row.cells().item(0)?.dyn_into().ok()
}

/// The cell's rendered text, falling back to its text content if it isn't rendered.
#[must_use]
pub fn load_cell_text(cell: &HtmlElement) -> String {
	match cell.inner_text() {
		text if text.is_empty() => cell.text_content().unwrap_or_default(),
		text => text,
	}
}

#[must_use]
pub fn load_dataset_entry(element: &HtmlElement, name: &str) -> Option<String> {
	element.dataset().get(name)
}
