//! Kind-specific behaviour and the registry that maps kind names to it.

use crate::{
	platform::NativeTree,
	view::{AdditionalConstraints, AncestorStyle},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use serde_json::Value;

pub mod basic;

/// What distinguishes one component kind from another.
///
/// Every method has a do-nothing default, so a kind only spells out what it actually interprets.
pub trait Component<T: NativeTree> {
	/// Native tag created for views of this kind.
	fn element_tag(&self) -> &'static str {
		"div"
	}

	/// Interprets recognised attribute keys. Called on every update, before constraints and children.
	fn apply_attributes(&mut self, tree: &mut T, element: &T::Element, attributes: &Value) {
		let _ = (tree, element, attributes);
	}

	/// Layout overrides implied by `attributes`. Replaces the previous overrides on every update.
	fn additional_constraints(&self, attributes: &Value) -> AdditionalConstraints {
		let _ = attributes;
		AdditionalConstraints::default()
	}

	/// Adds what this node passes down to views that list it as a virtual ancestor.
	fn ancestor_style(&self, attributes: &Value, style: &mut AncestorStyle) {
		let _ = (attributes, style);
	}

	/// Handles a host message addressed to this view by identity.
	fn did_receive_message(&mut self, tree: &mut T, element: &T::Element, message: &Value) {
		let _ = (tree, element, message);
	}
}

pub type Constructor<T> = Box<dyn Fn() -> Box<dyn Component<T>>>;

/// Kind name → constructor. Populated before the first frame arrives.
pub struct Registry<T: NativeTree> {
	constructors: HashMap<String, Constructor<T>>,
}

impl<T: NativeTree> Default for Registry<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: NativeTree> Registry<T> {
	/// An empty registry. Every kind is unknown.
	#[must_use]
	pub fn new() -> Self {
		Self { constructors: HashMap::new() }
	}

	#[must_use]
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		for kind in BuiltinKind::ALL {
			registry.register(kind.name(), move || kind.construct());
		}
		registry
	}

	/// Registers (or replaces) the constructor for `kind`.
	pub fn register(&mut self, kind: impl Into<String>, constructor: impl Fn() -> Box<dyn Component<T>> + 'static) {
		self.constructors.insert(kind.into(), Box::new(constructor));
	}

	#[must_use]
	pub fn get(&self, kind: &str) -> Option<&Constructor<T>> {
		self.constructors.get(kind)
	}

	#[must_use]
	pub fn contains(&self, kind: &str) -> bool {
		self.constructors.contains_key(kind)
	}

	pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
		self.constructors.keys().map(String::as_str)
	}
}

impl<T: NativeTree> Debug for Registry<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.kinds()).finish()
	}
}

/// The kinds this crate implements itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
	View,
	TextSpan,
	Opacity,
	ClipRect,
	ClipRRect,
}

impl BuiltinKind {
	pub const ALL: [Self; 5] = [Self::View, Self::TextSpan, Self::Opacity, Self::ClipRect, Self::ClipRRect];

	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			Self::View => "view",
			Self::TextSpan => "text_span",
			Self::Opacity => "opacity",
			Self::ClipRect => "clip_rect",
			Self::ClipRRect => "clip_r_rect",
		}
	}

	#[must_use]
	pub fn construct<T: NativeTree>(self) -> Box<dyn Component<T>> {
		match self {
			Self::View => Box::new(basic::View),
			Self::TextSpan => Box::new(basic::TextSpan::default()),
			Self::Opacity => Box::new(basic::Opacity),
			Self::ClipRect => Box::new(basic::ClipRect),
			Self::ClipRRect => Box::new(basic::ClipRRect),
		}
	}
}
