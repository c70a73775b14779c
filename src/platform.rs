//! The small capability interface a platform adapter implements for the engine.
//!
//! Core logic never asks which platform it runs on. Anything that differs between a browser document and a miniprogram host
//! lives behind these traits, selected once when the [`Engine`](`crate::engine::Engine`) is constructed.

use core::fmt::Debug;

/// The native element tree the reconciler mirrors descriptors onto.
pub trait NativeTree {
	/// A cheap handle to one native element. Clones refer to the same element.
	type Element: Clone + Debug;

	fn create_element(&mut self, tag: &str) -> Self::Element;

	/// Appends `child` as the last child of `parent`, moving it if it's attached elsewhere.
	fn append_child(&mut self, parent: &Self::Element, child: &Self::Element);

	/// Detaches `element` from its parent, if any. The element stays usable.
	fn remove_element(&mut self, element: &Self::Element);

	/// Merges `style` into the element's inline style.
	fn set_style(&mut self, element: &Self::Element, style: &Style);

	fn set_text(&mut self, element: &Self::Element, text: &str);

	/// Called when the element's identity is purged from the cache.
	///
	/// Implementations must not change attachment state here.
	fn release_element(&mut self, element: Self::Element) {
		drop(element);
	}
}

/// Outbound channel to the host plus the platform queries the engine needs.
pub trait HostChannel {
	/// Whether [`post_message`](`HostChannel::post_message`) can deliver right now.
	/// A channel may only become ready after the host program has booted.
	fn is_ready(&self) -> bool;

	fn post_message(&mut self, message: &str);

	/// Asks the platform to measure the viewport. The adapter completes the request by calling
	/// [`Engine::viewport_changed`](`crate::engine::Engine::viewport_changed`), possibly much later.
	/// Adapters that listen for resizes complete it again on every resize.
	fn request_viewport(&mut self) {}

	/// Called once when the engine starts with a code entry point.
	/// Adapters begin forwarding inbound messages to [`Engine::did_receive_message`](`crate::engine::Engine::did_receive_message`) from here on.
	fn install_inbound_handler(&mut self) {}
}

/// Alternative transport used while a debugger session drives the engine.
pub trait DebuggerTransport {
	fn start(&mut self);
	fn send_message(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	#[must_use]
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}
}

/// An ordered set of inline style declarations. Setting a property twice keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style(Vec<(&'static str, String)>);

impl Style {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, property: &'static str, value: impl Into<String>) -> &mut Self {
		let value = value.into();
		match self.0.iter_mut().find(|(p, _)| *p == property) {
			Some((_, v)) => *v = value,
			None => self.0.push((property, value)),
		}
		self
	}

	#[must_use]
	pub fn get(&self, property: &str) -> Option<&str> {
		self.0.iter().find(|(p, _)| *p == property).map(|(_, v)| v.as_str())
	}

	/// Applies every declaration of `other` on top of this one.
	pub fn extend(&mut self, other: &Self) {
		for (property, value) in other.iter() {
			self.set(property, value);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
		self.0.iter().map(|(p, v)| (*p, v.as_str()))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
