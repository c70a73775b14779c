use remote_tree_dom::{
	error::DecodeError,
	wire::{self, AncestorDescriptor, Constraints, DiffData, Envelope, FrameData, MessageType, MpjsMessage, MpjsReply, NodeDescriptor},
};
use serde_json::{json, Value};

#[test]
fn node_descriptor_tolerates_bad_entries() {
	let node: NodeDescriptor = serde_json::from_value(json!({
		"identity": 1,
		"kind": "view",
		"constraints": "not a box",
		"children": [{ "identity": 2, "kind": "view" }, 42, { "kind": "no identity" }],
		"ancestors": [{ "identity": 3, "constraints": { "x": 5 } }, null]
	}))
	.unwrap();

	assert_eq!(node.attributes, Value::Null);
	assert_eq!(node.constraints, None);
	assert_eq!(node.children, Some(vec![Some(NodeDescriptor::new(2, "view")), None, None]));
	assert_eq!(
		node.ancestors,
		Some(vec![Some(AncestorDescriptor::new(3, Some(Constraints::new(5.0, 0.0, 0.0, 0.0)))), None])
	);
}

#[test]
fn non_list_children_mean_unchanged() {
	let node: NodeDescriptor = serde_json::from_value(json!({ "identity": 1, "kind": "view", "children": {} })).unwrap();
	assert_eq!(node.children, None);

	let node: NodeDescriptor = serde_json::from_value(json!({ "identity": 1, "kind": "view", "children": [] })).unwrap();
	assert_eq!(node.children, Some(Vec::new()));
}

#[test]
fn as_ancestor_carries_identity_and_box() {
	let node = NodeDescriptor::new(8, "opacity").with_constraints(Constraints::new(1.0, 2.0, 3.0, 4.0));
	assert_eq!(node.as_ancestor(), AncestorDescriptor::new(8, Some(Constraints::new(1.0, 2.0, 3.0, 4.0))));
}

#[test]
fn falsy_envelopes_are_empty() {
	for raw in ["null", "false", "0", "\"\""] {
		assert!(matches!(Envelope::decode(raw), Err(DecodeError::Empty)), "{}", raw);
	}
	assert!(matches!(Envelope::decode("{"), Err(DecodeError::Json(_))));
	assert!(matches!(Envelope::decode(r#"{"message":1}"#), Err(DecodeError::Json(_))));
	assert!(matches!(Envelope::from_value(json!(0.0)), Err(DecodeError::Empty)));
}

#[test]
fn envelope_round_trips_through_text() {
	let envelope = Envelope::decode(r#"{"type":"route","message":{"routeId":3}}"#).unwrap();
	assert_eq!(envelope.message_type(), Some(MessageType::Route));
	assert_eq!(Envelope::decode(&envelope.encode()).unwrap(), envelope);

	let bare = Envelope::decode(r#"{"type":"element_gc"}"#).unwrap();
	assert_eq!(bare.message, Value::Null);
}

#[test]
fn message_type_names() {
	let all = [
		(MessageType::FrameData, "frame_data"),
		(MessageType::DiffData, "diff_data"),
		(MessageType::ElementGc, "element_gc"),
		(MessageType::Route, "route"),
		(MessageType::Mpjs, "mpjs"),
		(MessageType::Scaffold, "scaffold"),
		(MessageType::RichText, "rich_text"),
		(MessageType::PlatformView, "platform_view"),
		(MessageType::WebDialogs, "action:web_dialogs"),
		(MessageType::DecodeDrawable, "decode_drawable"),
	];
	for (message_type, name) in all {
		assert_eq!(message_type.as_str(), name);
		assert_eq!(MessageType::parse(name), Some(message_type));
	}
	assert_eq!(MessageType::parse("web_dialogs"), None);
	assert_eq!(MessageType::parse("FRAME_DATA"), None);
}

#[test]
fn frame_data_defaults() {
	let frame: FrameData = wire::decode_payload(json!({ "routeId": 4, "overlays": "nope" })).unwrap();
	assert_eq!(frame, FrameData::new(4, None));

	let frame: FrameData = wire::decode_payload(json!({ "routeId": 4, "ignoreScaffold": true, "overlays": [] })).unwrap();
	assert!(frame.ignore_scaffold);
	assert_eq!(frame.overlays, Some(Vec::new()));

	assert!(matches!(wire::decode_payload::<FrameData>(json!("")), Err(DecodeError::Empty)));
}

#[test]
fn diff_data_without_diffs_is_empty() {
	let diff: DiffData = wire::decode_payload(json!({})).unwrap();
	assert_eq!(diff, DiffData::default());
}

#[test]
fn gc_lists_skip_non_integers() {
	assert_eq!(wire::decode_identities(&json!([1, 2.5, "3", 4, null])).unwrap(), vec![1, 4]);
	assert!(wire::decode_identities(&json!([])).unwrap().is_empty());
	assert!(matches!(wire::decode_identities(&json!({ "0": 1 })), Err(DecodeError::NotAList)));
	assert!(matches!(wire::decode_identities(&Value::Null), Err(DecodeError::NotAList)));
}

#[test]
fn mpjs_reply_shapes() {
	let result = MpjsReply::Result(json!({ "ok": true })).into_envelope(Some(&json!("r1")));
	assert_eq!(result.kind, "mpjs");
	assert_eq!(result.message, json!({ "requestId": "r1", "result": { "ok": true } }));

	let unanswerable = MpjsReply::Result(json!(1)).into_envelope(None);
	assert_eq!(unanswerable.message, json!({ "requestId": null, "result": 1 }));

	let callback = MpjsReply::Callback {
		func_id: json!(7),
		arguments: vec![json!("a")],
	}
	.into_envelope(Some(&json!("ignored")));
	assert_eq!(callback.message, json!({ "funcId": 7, "arguments": ["a"] }));
}

#[test]
fn mpjs_message_keeps_unknown_fields() {
	let message: MpjsMessage = wire::decode_payload(json!({ "funcId": 2, "arguments": [1], "event": "callback" })).unwrap();
	assert_eq!(message.func_id, Some(json!(2)));
	assert_eq!(message.arguments, Some(json!([1])));
	assert_eq!(message.request_id, None);
	assert_eq!(message.rest.get("event"), Some(&json!("callback")));
	assert!(!message.rest.contains_key("funcId"));
}

#[test]
fn falsiness() {
	for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
		assert!(wire::is_falsy(&value), "{}", value);
	}
	for value in [json!(true), json!(1), json!("0"), json!([]), json!({})] {
		assert!(!wire::is_falsy(&value), "{}", value);
	}
}
