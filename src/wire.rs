//! Records exchanged with the host, as they appear on the channel.
//!
//! Decoding is lenient at the level of individual nodes: a child or ancestor entry that fails to decode becomes [`None`] in its list,
//! so that one bad entry only costs that entry (and its subtree) instead of the whole update.

use crate::error::DecodeError;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Host-assigned identity of one logical node, stable across frames.
pub type Identity = i64;

/// Host-assigned identity correlating a page to its frame data.
pub type RouteId = i64;

/// A pre-computed box, relative to the immediate constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
	#[serde(default)]
	pub x: f64,
	#[serde(default)]
	pub y: f64,
	#[serde(default)]
	pub w: f64,
	#[serde(default)]
	pub h: f64,
}

impl Constraints {
	#[must_use]
	pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
		Self { x, y, w, h }
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeDescriptor {
	#[serde(alias = "hashCode")]
	pub identity: Identity,
	#[serde(alias = "name")]
	pub kind: String,
	/// Kept verbatim by the view, so it can be re-applied later.
	#[serde(default)]
	pub attributes: Value,
	#[serde(default, deserialize_with = "lenient")]
	pub constraints: Option<Constraints>,
	/// [`None`] means "unchanged", which is different from an empty list.
	#[serde(default, deserialize_with = "lenient_list")]
	pub children: Option<Vec<Option<NodeDescriptor>>>,
	#[serde(default, deserialize_with = "lenient_list")]
	pub ancestors: Option<Vec<Option<AncestorDescriptor>>>,
}

impl NodeDescriptor {
	#[must_use]
	pub fn new(identity: Identity, kind: impl Into<String>) -> Self {
		Self {
			identity,
			kind: kind.into(),
			attributes: Value::Null,
			constraints: None,
			children: None,
			ancestors: None,
		}
	}

	#[must_use]
	pub fn with_attributes(mut self, attributes: Value) -> Self {
		self.attributes = attributes;
		self
	}

	#[must_use]
	pub fn with_constraints(mut self, constraints: Constraints) -> Self {
		self.constraints = Some(constraints);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: impl IntoIterator<Item = NodeDescriptor>) -> Self {
		self.children = Some(children.into_iter().map(Some).collect());
		self
	}

	#[must_use]
	pub fn with_ancestors(mut self, ancestors: impl IntoIterator<Item = AncestorDescriptor>) -> Self {
		self.ancestors = Some(ancestors.into_iter().map(Some).collect());
		self
	}

	/// This node seen as somebody's virtual ancestor.
	#[must_use]
	pub fn as_ancestor(&self) -> AncestorDescriptor {
		AncestorDescriptor {
			identity: self.identity,
			constraints: self.constraints,
		}
	}
}

/// Reference to an existing node whose offset and inheritable style fold into another node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AncestorDescriptor {
	#[serde(alias = "hashCode")]
	pub identity: Identity,
	#[serde(default, deserialize_with = "lenient")]
	pub constraints: Option<Constraints>,
}

impl AncestorDescriptor {
	#[must_use]
	pub fn new(identity: Identity, constraints: Option<Constraints>) -> Self {
		Self { identity, constraints }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub message: Value,
}

impl Envelope {
	#[must_use]
	pub fn new(kind: impl Into<String>, message: Value) -> Self {
		Self { kind: kind.into(), message }
	}

	/// Decodes the primary (JSON text) encoding.
	///
	/// # Errors
	///
	/// Iff `raw` isn't JSON, is falsy or doesn't have the envelope shape.
	pub fn decode(raw: &str) -> Result<Self, DecodeError> {
		Self::from_value(serde_json::from_str(raw)?)
	}

	/// Decodes the alternate encoding, in which the host hands over an already structured value.
	///
	/// # Errors
	///
	/// Iff `value` is falsy or doesn't have the envelope shape.
	pub fn from_value(value: Value) -> Result<Self, DecodeError> {
		if is_falsy(&value) {
			return Err(DecodeError::Empty);
		}
		Ok(Self::deserialize(value)?)
	}

	#[must_use]
	pub fn encode(&self) -> String {
		// Serializing a `String` and a `Value` can't fail.
		serde_json::to_string(self).unwrap_or_default()
	}

	#[must_use]
	pub fn message_type(&self) -> Option<MessageType> {
		MessageType::parse(&self.kind)
	}
}

/// The closed set of envelope types the dispatcher routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
	FrameData,
	DiffData,
	ElementGc,
	Route,
	Mpjs,
	Scaffold,
	RichText,
	PlatformView,
	WebDialogs,
	DecodeDrawable,
}

impl MessageType {
	#[must_use]
	pub fn parse(kind: &str) -> Option<Self> {
		Some(match kind {
			"frame_data" => Self::FrameData,
			"diff_data" => Self::DiffData,
			"element_gc" => Self::ElementGc,
			"route" => Self::Route,
			"mpjs" => Self::Mpjs,
			"scaffold" => Self::Scaffold,
			"rich_text" => Self::RichText,
			"platform_view" => Self::PlatformView,
			"action:web_dialogs" => Self::WebDialogs,
			"decode_drawable" => Self::DecodeDrawable,
			_ => return None,
		})
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::FrameData => "frame_data",
			Self::DiffData => "diff_data",
			Self::ElementGc => "element_gc",
			Self::Route => "route",
			Self::Mpjs => "mpjs",
			Self::Scaffold => "scaffold",
			Self::RichText => "rich_text",
			Self::PlatformView => "platform_view",
			Self::WebDialogs => "action:web_dialogs",
			Self::DecodeDrawable => "decode_drawable",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameData {
	pub route_id: RouteId,
	#[serde(default, deserialize_with = "lenient")]
	pub scaffold: Option<NodeDescriptor>,
	#[serde(default, deserialize_with = "lenient_list")]
	pub overlays: Option<Vec<Option<NodeDescriptor>>>,
	#[serde(default)]
	pub ignore_scaffold: bool,
}

impl FrameData {
	#[must_use]
	pub fn new(route_id: RouteId, scaffold: Option<NodeDescriptor>) -> Self {
		Self {
			route_id,
			scaffold,
			overlays: None,
			ignore_scaffold: false,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiffData {
	#[serde(default, deserialize_with = "lenient_list")]
	pub diffs: Option<Vec<Option<NodeDescriptor>>>,
}

/// Inbound script-bridge message. Which fields are present depends on the direction of the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpjsMessage {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub func_id: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arguments: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Everything the bridge itself interprets (`event`, `objectHandler`, …).
	#[serde(flatten)]
	pub rest: serde_json::Map<String, Value>,
}

/// What a [`ScriptBridge`](`crate::bridge::ScriptBridge`) wants sent back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum MpjsReply {
	/// Answer to the request currently being handled.
	Result(Value),
	/// Invocation of a host-side callback.
	Callback { func_id: Value, arguments: Vec<Value> },
}

impl MpjsReply {
	#[must_use]
	pub fn into_envelope(self, request_id: Option<&Value>) -> Envelope {
		let message = match self {
			Self::Result(result) => json!({
				"requestId": request_id.cloned().unwrap_or(Value::Null),
				"result": result,
			}),
			Self::Callback { func_id, arguments } => json!({
				"funcId": func_id,
				"arguments": arguments,
			}),
		};
		Envelope::new(MessageType::Mpjs.as_str(), message)
	}
}

/// Decodes an `element_gc` payload. Non-integer entries are skipped.
///
/// # Errors
///
/// Iff `message` isn't a list.
pub fn decode_identities(message: &Value) -> Result<Vec<Identity>, DecodeError> {
	match message {
		Value::Array(items) => Ok(items.iter().filter_map(Value::as_i64).collect()),
		_ => Err(DecodeError::NotAList),
	}
}

/// Decodes a typed payload out of an envelope's `message`, treating falsy payloads as absent.
///
/// # Errors
///
/// Iff `message` is falsy or doesn't match `T`.
pub fn decode_payload<T: DeserializeOwned>(message: Value) -> Result<T, DecodeError> {
	if is_falsy(&message) {
		return Err(DecodeError::Empty);
	}
	Ok(T::deserialize(message)?)
}

#[must_use]
pub fn is_falsy(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => n.as_f64().map_or(false, |n| n == 0.0 || n.is_nan()),
		Value::String(s) => s.is_empty(),
		Value::Array(_) | Value::Object(_) => false,
	}
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = Value::deserialize(deserializer)?;
	Ok(T::deserialize(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<Option<T>>>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::Array(items) => Some(items.into_iter().map(|item| T::deserialize(item).ok()).collect()),
		_ => None,
	})
}
