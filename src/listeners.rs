use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Event, EventTarget};

/// Event listeners that stay registered on their target exactly as long as this value lives.
#[derive(Debug)]
pub(crate) struct Listeners {
	target: EventTarget,
	bound: Vec<(String, Closure<dyn FnMut(Event)>)>,
}

impl Listeners {
	pub(crate) fn new(target: EventTarget) -> Self {
		Self { target, bound: Vec::new() }
	}

	pub(crate) fn listen(&mut self, name: &str, handler: impl FnMut(Event) + 'static) -> Result<(), JsValue> {
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
		self.target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
		trace!("Listening for {:?} events.", name);
		self.bound.push((name.to_owned(), closure));
		Ok(())
	}
}

impl Drop for Listeners {
	fn drop(&mut self) {
		for (name, closure) in self.bound.drain(..) {
			if let Err(error) = self.target.remove_event_listener_with_callback(&name, closure.as_ref().unchecked_ref()) {
				error!("Couldn't stop listening for {:?} events: {:?}", name, error);
			}
		}
		trace!("Destroyed listener closures.");
	}
}
