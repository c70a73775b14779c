use super::Component;
use crate::{
	platform::{NativeTree, Style},
	view::{AncestorStyle, InheritableProperty},
};
use serde_json::Value;

/// Plain container.
#[derive(Debug, Clone, Copy, Default)]
pub struct View;

impl<T: NativeTree> Component<T> for View {}

/// Inline text leaf. Only touches the native text when it changed.
#[derive(Debug, Clone, Default)]
pub struct TextSpan {
	text: Option<String>,
}

impl<T: NativeTree> Component<T> for TextSpan {
	fn element_tag(&self) -> &'static str {
		"span"
	}

	fn apply_attributes(&mut self, tree: &mut T, element: &T::Element, attributes: &Value) {
		let text = attributes.get("text").and_then(Value::as_str).unwrap_or_default();
		if self.text.as_deref() != Some(text) {
			tree.set_text(element, text);
			self.text = Some(text.to_owned());
		}
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Opacity;

fn opacity(attributes: &Value) -> f64 {
	attributes.get("opacity").and_then(Value::as_f64).unwrap_or(1.0)
}

impl<T: NativeTree> Component<T> for Opacity {
	fn apply_attributes(&mut self, tree: &mut T, element: &T::Element, attributes: &Value) {
		let mut style = Style::new();
		style.set("opacity", opacity(attributes).to_string());
		tree.set_style(element, &style);
	}

	fn ancestor_style(&self, attributes: &Value, style: &mut AncestorStyle) {
		style.multiply_opacity(opacity(attributes));
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClipRect;

impl<T: NativeTree> Component<T> for ClipRect {
	fn apply_attributes(&mut self, tree: &mut T, element: &T::Element, _: &Value) {
		let mut style = Style::new();
		style.set("overflow", "hidden");
		tree.set_style(element, &style);
	}

	fn ancestor_style(&self, _: &Value, style: &mut AncestorStyle) {
		style.set(InheritableProperty::Overflow, "hidden");
	}
}

/// Clip with rounded corners.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipRRect;

/// `borderRadius` is either one number for all corners or an object with per-corner numbers.
fn radii(attributes: &Value) -> Vec<(InheritableProperty, String)> {
	match attributes.get("borderRadius") {
		Some(Value::Number(radius)) => vec![(InheritableProperty::BorderRadius, format!("{}px", radius))],
		Some(Value::Object(corners)) => [
			("topLeft", InheritableProperty::BorderTopLeftRadius),
			("topRight", InheritableProperty::BorderTopRightRadius),
			("bottomLeft", InheritableProperty::BorderBottomLeftRadius),
			("bottomRight", InheritableProperty::BorderBottomRightRadius),
		]
		.iter()
		.filter_map(|(key, property)| corners.get(*key).and_then(Value::as_f64).map(|radius| (*property, format!("{}px", radius))))
		.collect(),
		_ => Vec::new(),
	}
}

impl<T: NativeTree> Component<T> for ClipRRect {
	fn apply_attributes(&mut self, tree: &mut T, element: &T::Element, attributes: &Value) {
		let mut style = Style::new();
		style.set("overflow", "hidden");
		for (property, value) in radii(attributes) {
			style.set(property.css_name(), value);
		}
		tree.set_style(element, &style);
	}

	fn ancestor_style(&self, attributes: &Value, style: &mut AncestorStyle) {
		style.set(InheritableProperty::Overflow, "hidden");
		for (property, value) in radii(attributes) {
			style.set(property, value);
		}
	}
}
