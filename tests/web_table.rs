#![cfg(target_arch = "wasm32")]

use live_table_dom::{
	attach,
	dom::{AttachError, DomRows},
	load, Config, Outcome, RowList, StreamState, TableSync,
};
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, HtmlElement, HtmlTableElement};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

fn document() -> Document {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}

	window().unwrap().document().unwrap()
}

fn create_table(id: &str, inner_html: &str) -> HtmlTableElement {
	let document = document();
	if let Some(old) = document.get_element_by_id(id) {
		old.remove();
	}
	let table: HtmlTableElement = document.create_element("table").unwrap().dyn_into().unwrap();
	table.set_id(id);
	table.set_inner_html(inner_html);
	document.body().unwrap().append_child(&table).unwrap();
	table
}

fn body_texts(table: &HtmlTableElement) -> Vec<String> {
	load::load_bodies(table)
		.iter()
		.flat_map(load::load_rows)
		.map(|row| load::load_cell_text(&load::load_first_cell(&row).unwrap()))
		.collect()
}

const HEADER: &str = "<thead><tr><th>Client</th><th>Since</th><th>Duration</th></tr></thead>";

#[wasm_bindgen_test]
fn column_count_comes_from_header() {
	assert_eq!(load::load_column_count(&create_table("columns", HEADER)), 3);
	assert_eq!(load::load_column_count(&create_table("no-columns", "")), 0);
}

#[wasm_bindgen_test]
fn missing_tbody_is_created() {
	let table = create_table("tbody", HEADER);
	assert!(load::load_bodies(&table).is_empty());
	DomRows::new(table.clone(), &Config::default()).unwrap();
	assert_eq!(load::load_bodies(&table).len(), 1);
}

#[wasm_bindgen_test]
fn upsert_remove_reset() {
	let table = create_table("clients", HEADER);
	let rows = DomRows::new(table.clone(), &Config::default()).unwrap();
	let mut sync = TableSync::new(rows, load::load_column_count(&table), Config::default());

	assert_eq!(sync.on_upsert(r##"["<a href=\"#\">bob</a>", "today", "<duration>00:00:01</duration>"]"##), Outcome::Appended(0));
	assert_eq!(sync.on_upsert(r##"["<a href=\"#\">alice</a>", "today"]"##), Outcome::Inserted(0));
	assert_eq!(sync.on_upsert(r##"["<a href=\"#\">Bob</a>", "now"]"##), Outcome::Replaced(1));
	assert_eq!(body_texts(&table), ["alice", "Bob"]);

	let tr = load::load_rows(&load::load_bodies(&table)[0]).remove(1);
	assert_eq!(tr.cells().length(), 3);
	assert_eq!(tr.dataset().get("key").as_deref(), Some(r##"<a href="#">Bob</a>"##));
	let since: HtmlElement = tr.cells().item(1).unwrap().dyn_into().unwrap();
	assert_eq!(since.inner_html(), "now");

	assert_eq!(sync.on_upsert("not json"), Outcome::Dropped);
	assert_eq!(sync.on_remove(r#"{"key":"BOB"}"#), Outcome::Removed(1));
	assert_eq!(sync.on_remove("carol"), Outcome::NotFound);
	assert_eq!(body_texts(&table), ["alice"]);

	assert_eq!(sync.on_reset(), Outcome::Cleared(1));
	assert!(body_texts(&table).is_empty());
	assert_eq!(sync.state(), StreamState::Empty);
}

#[wasm_bindgen_test]
fn html_keys_match_by_rendered_text() {
	let table = create_table("entities", HEADER);
	let rows = DomRows::new(table.clone(), &Config::default()).unwrap();
	let mut sync = TableSync::new(rows, 3, Config::default());

	assert_eq!(sync.on_upsert(r#"["Ren&eacute;"]"#), Outcome::Appended(0));
	assert_eq!(sync.on_upsert(r#"["a &lt; b"]"#), Outcome::Inserted(0));
	assert_eq!(body_texts(&table), ["a < b", "René"]);

	assert_eq!(sync.on_upsert(r#"["a < b", "again"]"#), Outcome::Replaced(0));
	assert_eq!(sync.on_upsert(r#"["REN&Eacute;", "again"]"#), Outcome::Replaced(1));
	assert_eq!(body_texts(&table), ["a < b", "RENÉ"]);
}

#[wasm_bindgen_test]
fn order_equivalent_identities_get_their_own_rows() {
	let table = create_table("sensors", HEADER);
	let rows = DomRows::new(table.clone(), &Config::default()).unwrap();
	let mut sync = TableSync::new(rows, 3, Config::default());

	for key in &["sensor01", "sensor1", "client-1", "client_1"] {
		sync.on_upsert(&format!("[{:?}]", key));
	}
	assert_eq!(body_texts(&table), ["client-1", "client_1", "sensor01", "sensor1"]);
	assert_eq!(sync.on_upsert(r#"["Sensor1"]"#), Outcome::Replaced(3));
	assert_eq!(sync.rows().len(), 4);
}

#[wasm_bindgen_test]
fn text_cells_are_not_parsed() {
	let table = create_table("text", "<thead><tr><th>A</th><th>B</th></tr></thead>");
	let rows = DomRows::new(table.clone(), &Config::default()).unwrap();
	let mut sync = TableSync::new(rows, 2, Config::default());

	sync.on_upsert(r#"["a", "<b>bold</b>"]"#);
	let tr = load::load_rows(&load::load_bodies(&table)[0]).remove(0);
	let cell: HtmlElement = tr.cells().item(1).unwrap().dyn_into().unwrap();
	assert_eq!(cell.text_content().as_deref(), Some("<b>bold</b>"));
	assert_eq!(cell.child_element_count(), 0);
}

#[wasm_bindgen_test]
fn remove_spans_bodies_and_prefers_sort_key() {
	let table = create_table(
		"bodies",
		r#"<thead><tr><th>Client</th></tr></thead>
		<tbody><tr><td data-sort-key="alice">Alice (admin)</td></tr></tbody>
		<tbody><tr><td>bob</td></tr><tr><td>Bob</td></tr></tbody>"#,
	);
	let mut sync = TableSync::new(DomRows::new(table.clone(), &Config::default()).unwrap(), 1, Config::default());
	assert_eq!(sync.rows().len(), 3);
	assert_eq!(sync.rows().sort_key_attribute(0).as_deref(), Some("alice"));

	assert_eq!(sync.on_remove("Alice (admin)"), Outcome::NotFound);
	assert_eq!(sync.on_remove("ALICE"), Outcome::Removed(0));
	assert_eq!(sync.on_remove("bob"), Outcome::Removed(0));
	assert_eq!(body_texts(&table), ["Bob"]);

	assert_eq!(sync.on_upsert(r#"["carol"]"#), Outcome::Appended(1));
	assert_eq!(load::load_rows(&load::load_bodies(&table)[1]).len(), 2);

	sync.on_reset();
	assert_eq!(load::load_bodies(&table).len(), 2);
	assert!(body_texts(&table).is_empty());
}

#[wasm_bindgen_test]
fn dompurify_loaded_after_attach_applies() {
	create_table("late-purify", HEADER);
	let window = window().unwrap();
	let attachment = attach("late-purify", "/events", Config::default()).unwrap();
	assert!(attachment.sync().borrow().has_sanitizer());

	attachment.sync().borrow_mut().on_upsert(r#"["<b onclick=\"a()\">amy</b>"]"#);

	let purify = Object::new();
	let sanitize = Function::new_with_args("html", "return html.replace(/onclick/g, 'title')");
	Reflect::set(&purify, &JsValue::from_str("sanitize"), &sanitize).unwrap();
	Reflect::set(&window, &JsValue::from_str("DOMPurify"), &purify).unwrap();

	attachment.sync().borrow_mut().on_upsert(r#"["<b onclick=\"b()\">bob</b>"]"#);
	Reflect::delete_property(&window, &JsValue::from_str("DOMPurify")).unwrap();

	let table = attachment.sync().borrow().rows().table().clone();
	let cells: Vec<String> = load::load_bodies(&table)
		.iter()
		.flat_map(load::load_rows)
		.map(|row| load::load_first_cell(&row).unwrap().inner_html())
		.collect();
	assert_eq!(cells, [r#"<b onclick="a()">amy</b>"#, r#"<b title="b()">bob</b>"#]);
	attachment.detach();
}

#[wasm_bindgen_test]
fn attach_to_missing_table_fails() {
	document();
	assert!(matches!(attach("no-such-table", "/events", Config::default()), Err(AttachError::TableNotFound(id)) if id == "no-such-table"));
}

#[wasm_bindgen_test]
fn attach_to_non_table_fails() {
	let document = document();
	let div = document.create_element("div").unwrap();
	div.set_id("not-a-table");
	document.body().unwrap().append_child(&div).unwrap();
	assert!(matches!(attach("not-a-table", "/events", Config::default()), Err(AttachError::NotATable(_))));
	div.remove();
}

#[wasm_bindgen_test]
fn attach_opens_and_detach_closes() {
	create_table("attached", HEADER);
	let attachment = attach("attached", "/events", Config::default()).unwrap();
	assert_eq!(attachment.sync().borrow().columns(), 3);
	assert_eq!(attachment.sync().borrow().state(), StreamState::Connecting);

	let sync = attachment.sync().clone();
	attachment.detach();
	assert_eq!(sync.borrow().state(), StreamState::Closed);
}
