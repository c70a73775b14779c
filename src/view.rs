//! Per-node state: what the cache stores for one identity.
//!
//! Views refer to each other only by [`Identity`]. The [`ComponentFactory`](`crate::factory::ComponentFactory`) owns every view,
//! and the operations that have to look at more than one view live on [`ViewMut`](`crate::factory::ViewMut`).

use crate::{
	component::Component,
	platform::{NativeTree, Style},
	wire::{Constraints, Identity},
};
use core::fmt::{self, Debug, Formatter};
use serde_json::Value;
use std::collections::BTreeMap;

pub struct ComponentView<T: NativeTree> {
	pub(crate) identity: Identity,
	pub(crate) kind: String,
	pub(crate) element: T::Element,
	pub(crate) component: Box<dyn Component<T>>,
	pub(crate) attributes: Value,
	pub(crate) constraints: Option<Constraints>,
	pub(crate) additional_constraints: AdditionalConstraints,
	pub(crate) layout_override: AdditionalConstraints,
	pub(crate) ancestors: Vec<AncestorView>,
	pub(crate) ancestor_style: AncestorStyle,
	pub(crate) subviews: Vec<Identity>,
	pub(crate) superview: Option<Identity>,
}

impl<T: NativeTree> ComponentView<T> {
	pub(crate) fn new(identity: Identity, kind: String, element: T::Element, component: Box<dyn Component<T>>) -> Self {
		Self {
			identity,
			kind,
			element,
			component,
			attributes: Value::Null,
			constraints: None,
			additional_constraints: AdditionalConstraints::default(),
			layout_override: AdditionalConstraints::default(),
			ancestors: Vec::new(),
			ancestor_style: AncestorStyle::default(),
			subviews: Vec::new(),
			superview: None,
		}
	}

	#[must_use]
	pub fn identity(&self) -> Identity {
		self.identity
	}

	/// The kind this view was constructed as.
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	#[must_use]
	pub fn element(&self) -> &T::Element {
		&self.element
	}

	/// The attributes of the latest update, verbatim.
	#[must_use]
	pub fn attributes(&self) -> &Value {
		&self.attributes
	}

	#[must_use]
	pub fn constraints(&self) -> Option<Constraints> {
		self.constraints
	}

	/// The layout overrides the component derived from the latest attributes.
	#[must_use]
	pub fn additional_constraints(&self) -> &AdditionalConstraints {
		&self.additional_constraints
	}

	/// Overrides set by the embedder. These win over [`additional_constraints`](`ComponentView::additional_constraints`) field by field.
	#[must_use]
	pub fn layout_override(&self) -> &AdditionalConstraints {
		&self.layout_override
	}

	#[must_use]
	pub fn ancestors(&self) -> &[AncestorView] {
		&self.ancestors
	}

	/// The inheritable properties the current ancestor chain applies to this view.
	#[must_use]
	pub fn ancestor_style(&self) -> &AncestorStyle {
		&self.ancestor_style
	}

	#[must_use]
	pub fn subviews(&self) -> &[Identity] {
		&self.subviews
	}

	#[must_use]
	pub fn superview(&self) -> Option<Identity> {
		self.superview
	}

	/// Computes the absolute box: the own origin plus the origins of all ancestors that carry constraints.
	///
	/// [`None`] while this view hasn't received constraints yet.
	#[must_use]
	pub fn layout_style(&self) -> Option<Style> {
		let constraints = self.constraints?;
		let (x, y) = self
			.ancestors
			.iter()
			.filter_map(|ancestor| ancestor.constraints)
			.fold((constraints.x, constraints.y), |(x, y), offset| (x + offset.x, y + offset.y));

		let extra = self.layout_override.or(&self.additional_constraints);
		let mut style = Style::new();
		style
			.set("position", extra.position.clone().unwrap_or_else(|| "absolute".to_owned()))
			.set("left", extra.left.clone().unwrap_or_else(|| px(x)))
			.set("top", extra.top.clone().unwrap_or_else(|| px(y)))
			.set("width", extra.width.clone().unwrap_or_else(|| px(constraints.w)))
			.set("height", extra.height.clone().unwrap_or_else(|| px(constraints.h)));
		if let Some(display) = &extra.display {
			style.set("display", display.clone());
		}
		Some(style)
	}
}

impl<T: NativeTree> Debug for ComponentView<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentView")
			.field("identity", &self.identity)
			.field("kind", &self.kind)
			.field("element", &self.element)
			.field("constraints", &self.constraints)
			.field("ancestors", &self.ancestors)
			.field("subviews", &self.subviews)
			.field("superview", &self.superview)
			.finish_non_exhaustive()
	}
}

fn px(value: f64) -> String {
	format!("{}px", value)
}

/// Overrides for the computed layout, used to take a wrapper out of absolute placement and into normal flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalConstraints {
	pub position: Option<String>,
	pub left: Option<String>,
	pub top: Option<String>,
	pub width: Option<String>,
	pub height: Option<String>,
	pub display: Option<String>,
}

impl AdditionalConstraints {
	/// `position: static` with automatic size, i.e. the view's own box is ignored.
	#[must_use]
	pub fn flow() -> Self {
		Self {
			position: Some("static".to_owned()),
			left: Some("unset".to_owned()),
			top: Some("unset".to_owned()),
			width: Some("auto".to_owned()),
			height: Some("auto".to_owned()),
			display: None,
		}
	}

	/// Every field set here, else the one from `fallback`.
	#[must_use]
	pub fn or(&self, fallback: &Self) -> Self {
		Self {
			position: self.position.clone().or_else(|| fallback.position.clone()),
			left: self.left.clone().or_else(|| fallback.left.clone()),
			top: self.top.clone().or_else(|| fallback.top.clone()),
			width: self.width.clone().or_else(|| fallback.width.clone()),
			height: self.height.clone().or_else(|| fallback.height.clone()),
			display: self.display.clone().or_else(|| fallback.display.clone()),
		}
	}
}

/// One logical ancestor's contribution to an owning view.
///
/// It never moves the ancestor node itself: its box only offsets [`target`](`AncestorView::target`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AncestorView {
	pub(crate) target: Option<Identity>,
	pub(crate) ancestor: Identity,
	pub(crate) constraints: Option<Constraints>,
}

impl AncestorView {
	#[must_use]
	pub fn new(target: Option<Identity>, ancestor: Identity) -> Self {
		Self {
			target,
			ancestor,
			constraints: None,
		}
	}

	/// The view whose layout this ancestor offsets.
	#[must_use]
	pub fn target(&self) -> Option<Identity> {
		self.target
	}

	/// The node standing in as ancestor.
	#[must_use]
	pub fn ancestor(&self) -> Identity {
		self.ancestor
	}

	#[must_use]
	pub fn constraints(&self) -> Option<Constraints> {
		self.constraints
	}

	/// Returns whether anything was stored. [`None`] keeps the previous box.
	pub fn set_constraints(&mut self, constraints: Option<Constraints>) -> bool {
		match constraints {
			Some(constraints) => {
				self.constraints = Some(constraints);
				true
			}
			None => false,
		}
	}
}

/// Style properties a virtual ancestor passes down to its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InheritableProperty {
	Opacity,
	Overflow,
	BorderRadius,
	BorderTopLeftRadius,
	BorderTopRightRadius,
	BorderBottomLeftRadius,
	BorderBottomRightRadius,
}

impl InheritableProperty {
	#[must_use]
	pub fn css_name(self) -> &'static str {
		match self {
			Self::Opacity => "opacity",
			Self::Overflow => "overflow",
			Self::BorderRadius => "border-radius",
			Self::BorderTopLeftRadius => "border-top-left-radius",
			Self::BorderTopRightRadius => "border-top-right-radius",
			Self::BorderBottomLeftRadius => "border-bottom-left-radius",
			Self::BorderBottomRightRadius => "border-bottom-right-radius",
		}
	}

	/// The value that undoes an ancestor's override.
	#[must_use]
	pub fn default_value(self) -> &'static str {
		match self {
			Self::Opacity => "1",
			_ => "unset",
		}
	}
}

/// The inheritable properties currently applied to a view by its ancestor chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AncestorStyle(BTreeMap<InheritableProperty, String>);

impl AncestorStyle {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, property: InheritableProperty, value: impl Into<String>) {
		self.0.insert(property, value.into());
	}

	#[must_use]
	pub fn get(&self, property: InheritableProperty) -> Option<&str> {
		self.0.get(&property).map(String::as_str)
	}

	/// Folds a further ancestor's opacity into this one.
	pub fn multiply_opacity(&mut self, opacity: f64) {
		let current = self.get(InheritableProperty::Opacity).and_then(|o| o.parse::<f64>().ok()).unwrap_or(1.0);
		self.set(InheritableProperty::Opacity, (current * opacity).to_string());
	}

	pub fn properties(&self) -> impl Iterator<Item = InheritableProperty> + '_ {
		self.0.keys().copied()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Declarations restoring exactly the recorded properties to their defaults.
	#[must_use]
	pub fn reset_style(&self) -> Style {
		let mut style = Style::new();
		for property in self.properties() {
			style.set(property.css_name(), property.default_value());
		}
		style
	}

	#[must_use]
	pub fn to_style(&self) -> Style {
		let mut style = Style::new();
		for (property, value) in &self.0 {
			style.set(property.css_name(), value.clone());
		}
		style
	}
}
