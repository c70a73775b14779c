use remote_tree_dom::{
	bridge::{Collaborator, Outbox, Router, ScriptBridge},
	component::Component,
	platform::{NativeTree, Viewport},
	wire::{MessageType, MpjsMessage, MpjsReply, RouteId},
	ComponentFactory, Engine, EngineConfig, Page,
};
use serde_json::{json, Value};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

use mock_platform_::{init_logging, DebuggerLog, ElementId, MockChannel, MockDebugger, MockTree};

type TestEngine = Engine<MockTree, MockChannel>;

fn engine() -> TestEngine {
	init_logging();
	Engine::new(MockTree::new(), MockChannel::ready())
}

fn new_root(engine: &mut TestEngine) -> ElementId {
	engine.factory_mut().tree_mut().create_element("body")
}

fn element(engine: &TestEngine, identity: i64) -> ElementId {
	*engine.factory().view(identity).unwrap().element()
}

fn send(engine: &mut TestEngine, kind: &str, message: Value) {
	engine.did_receive_message(&json!({ "type": kind, "message": message }).to_string());
}

fn frame(engine: &mut TestEngine, route_id: RouteId, scaffold: i64) {
	send(engine, "frame_data", json!({ "routeId": route_id, "scaffold": { "identity": scaffold, "kind": "view" } }));
}

#[test]
fn repeated_diff_data_reuses_the_view() {
	let mut engine = engine();
	let diff = json!({ "diffs": [{ "identity": 1, "kind": "text_span", "attributes": { "text": "hi" } }] });

	send(&mut engine, "diff_data", diff.clone());
	let first = element(&engine, 1);
	send(&mut engine, "diff_data", diff);

	assert_eq!(element(&engine, 1), first);
	assert_eq!(engine.factory().tree().created(), 1);
	assert_eq!(engine.factory().tree().text_writes, 1);
	assert_eq!(engine.factory().tree().parent(first), None);
}

#[test]
fn diff_data_entries_are_independent() {
	let mut engine = engine();

	send(
		&mut engine,
		"diff_data",
		json!({ "diffs": [
			{ "identity": 1, "kind": "view", "children": [{ "identity": 2, "kind": "view" }] },
			{ "identity": 3, "kind": "no_such_kind" },
			"garbage",
			{ "identity": 4, "kind": "view" }
		] }),
	);

	let factory = engine.factory();
	assert!(factory.contains(1));
	assert!(factory.contains(2));
	assert!(!factory.contains(3));
	assert!(factory.contains(4));
	assert_eq!(factory.view(2).unwrap().superview(), Some(1));
	assert_eq!(factory.view(1).unwrap().superview(), None);
}

#[test]
fn frames_before_registration_are_replayed_once_in_order() {
	let mut engine = engine();

	frame(&mut engine, 7, 1);
	frame(&mut engine, 7, 2);
	frame(&mut engine, 8, 3);
	assert_eq!(engine.pending_frames(7), 2);
	assert!(!engine.is_page_mode());

	let root = new_root(&mut engine);
	assert!(engine.register_page(7, Page::new(root)).is_none());

	assert!(engine.is_page_mode());
	assert_eq!(engine.pending_frames(7), 0);
	assert_eq!(engine.pending_frames(8), 1);
	let appended_to_root: Vec<ElementId> = engine.factory().tree().appends.iter().filter(|(parent, _)| *parent == root).map(|(_, child)| *child).collect();
	assert_eq!(appended_to_root, vec![element(&engine, 1), element(&engine, 2)]);
	assert_eq!(engine.factory().tree().children(root), &[element(&engine, 2)]);
	assert_eq!(engine.page(7).unwrap().scaffold(), Some(2));
	assert_eq!(engine.page(7).unwrap().view_id(), Some(7));

	let previous = engine.dispose_page(7).unwrap();
	assert_eq!(previous.scaffold(), Some(2));
	let second_root = new_root(&mut engine);
	engine.register_page(7, Page::new(second_root));
	assert!(engine.factory().tree().children(second_root).is_empty());
	assert_eq!(engine.page(7).unwrap().scaffold(), None);
}

#[test]
fn frames_for_a_registered_page_apply_immediately() {
	let mut engine = engine();
	let root = new_root(&mut engine);
	engine.register_page(7, Page::new(root));

	frame(&mut engine, 7, 1);

	assert_eq!(engine.pending_frames(7), 0);
	let scaffold = element(&engine, 1);
	assert_eq!(engine.factory().tree().parent(scaffold), Some(root));
	assert_eq!(engine.factory().tree().style(scaffold, "display"), Some("contents"));

	let mutations = engine.factory().tree().mutations();
	frame(&mut engine, 7, 1);
	assert_eq!(engine.factory().tree().mutations(), mutations);
}

#[test]
fn malformed_and_unknown_messages_are_dropped() {
	let mut engine = engine();

	engine.did_receive_message("not json");
	engine.did_receive_message("null");
	engine.did_receive_message("\"\"");
	engine.did_receive_message(r#"{"message":{}}"#);
	send(&mut engine, "no_such_type", json!({ "identity": 1, "kind": "view" }));
	send(&mut engine, "frame_data", json!(0));
	send(&mut engine, "frame_data", json!({ "scaffold": { "identity": 1, "kind": "view" } }));
	send(&mut engine, "diff_data", Value::Null);
	send(&mut engine, "element_gc", json!({ "identities": [1] }));
	engine.did_receive_structured_message(Value::Null);
	engine.did_receive_structured_message(json!(false));

	assert!(engine.factory().is_empty());
	assert_eq!(engine.factory().tree().created(), 0);
	assert!(engine.channel().sent.is_empty());
}

#[test]
fn structured_messages_dispatch_like_text_ones() {
	let mut engine = engine();

	engine.did_receive_structured_message(json!({
		"type": "diff_data",
		"message": { "diffs": [{ "hashCode": 5, "name": "opacity", "attributes": { "opacity": 0.5 } }] }
	}));

	assert_eq!(engine.factory().view(5).unwrap().kind(), "opacity");
	assert_eq!(engine.factory().tree().style(element(&engine, 5), "opacity"), Some("0.5"));
}

#[test]
fn element_gc_purges_listed_identities() {
	let mut engine = engine();
	send(&mut engine, "diff_data", json!({ "diffs": [{ "identity": 1, "kind": "view" }, { "identity": 2, "kind": "view" }] }));

	send(&mut engine, "element_gc", json!([1, "two", 99]));

	assert!(!engine.factory().contains(1));
	assert!(engine.factory().contains(2));
	assert_eq!(engine.factory().tree().released.len(), 1);
}

#[test]
fn messages_queue_until_the_channel_is_ready() {
	init_logging();
	let mut engine = Engine::new(MockTree::new(), MockChannel::not_ready());

	engine.send_message("a");
	engine.send_message("b");
	assert_eq!(engine.queued_messages(), &["a".to_owned(), "b".to_owned()]);

	engine.flush_queue_message();
	assert!(engine.channel().sent.is_empty());

	engine.channel_mut().ready = true;
	engine.flush_queue_message();
	assert_eq!(engine.channel().sent, vec!["a", "b"]);

	engine.send_message("c");
	assert_eq!(engine.channel().sent, vec!["a", "b", "c"]);
}

#[test]
fn flushing_twice_sends_the_queue_twice() {
	init_logging();
	let mut engine = Engine::new(MockTree::new(), MockChannel::not_ready());
	engine.send_message("a");
	engine.channel_mut().ready = true;

	engine.flush_queue_message();
	engine.flush_queue_message();

	assert_eq!(engine.channel().sent, vec!["a", "a"]);
	assert_eq!(engine.queued_messages().len(), 1);
}

#[test]
fn start_needs_a_code_block_or_a_debugger() {
	let mut engine = engine();

	engine.start();

	assert!(!engine.is_started());
	assert_eq!(engine.window_info(), None);
	assert_eq!(engine.channel().viewport_requests, 0);
	assert!(!engine.channel().inbound_installed);
}

#[test]
fn start_runs_the_code_block_once_and_flushes() {
	init_logging();
	let mut engine = Engine::new(MockTree::new(), MockChannel::not_ready());
	let runs = Rc::new(Cell::new(0));
	engine.init_with_code_block({
		let runs = Rc::clone(&runs);
		move || runs.set(runs.get() + 1)
	});
	engine.send_message("early");
	engine.channel_mut().ready = true;

	engine.start();
	engine.start();

	assert!(engine.is_started());
	assert_eq!(runs.get(), 1);
	assert!(engine.channel().inbound_installed);
	assert_eq!(engine.channel().viewport_requests, 1);
	assert_eq!(engine.window_info(), None);
	assert_eq!(engine.channel().sent, vec!["early"]);

	engine.viewport_changed(Viewport::new(375.0, 667.0));
	assert_eq!(engine.window_info(), Some(Viewport::new(375.0, 667.0)));
}

#[test]
fn debugger_takes_over_outbound_traffic() {
	let mut engine = engine();
	let log = Rc::new(RefCell::new(DebuggerLog::default()));
	engine.init_with_debugger(MockDebugger(Rc::clone(&log)));

	engine.start();
	engine.send_message("hello");
	engine.flush_queue_message();

	assert!(engine.is_started());
	assert_eq!(log.borrow().started, 1);
	assert_eq!(log.borrow().sent, vec!["hello"]);
	assert!(engine.channel().sent.is_empty());
	assert!(!engine.channel().inbound_installed);
}

#[derive(Default)]
struct EchoBridge {
	received: Rc<RefCell<Vec<MpjsMessage>>>,
}

impl ScriptBridge for EchoBridge {
	fn handle_message(&mut self, message: &MpjsMessage, replies: &mut Vec<MpjsReply>) {
		self.received.borrow_mut().push(message.clone());
		replies.push(MpjsReply::Result(json!("ok")));
		replies.push(MpjsReply::Callback {
			func_id: json!(3),
			arguments: vec![json!(1), json!("x")],
		});
	}
}

#[test]
fn script_bridge_replies_in_mpjs_shapes() {
	let mut engine = engine();
	let bridge = EchoBridge::default();
	let received = Rc::clone(&bridge.received);
	engine.set_script_bridge(bridge);

	send(&mut engine, "mpjs", json!({ "requestId": 5, "event": "callMethod", "objectHandler": "wx" }));

	let received = received.borrow();
	assert_eq!(received.len(), 1);
	assert_eq!(received[0].request_id, Some(json!(5)));
	assert_eq!(received[0].rest.get("event"), Some(&json!("callMethod")));
	assert_eq!(
		engine.channel().sent_json(),
		vec![
			json!({ "type": "mpjs", "message": { "requestId": 5, "result": "ok" } }),
			json!({ "type": "mpjs", "message": { "funcId": 3, "arguments": [1, "x"] } }),
		]
	);
}

#[test]
fn mpjs_without_a_bridge_is_dropped() {
	let mut engine = engine();

	send(&mut engine, "mpjs", json!({ "requestId": 5 }));

	assert!(engine.channel().sent.is_empty());
}

#[derive(Default)]
struct RecordingRouter {
	routes: Rc<RefCell<Vec<Value>>>,
	updates: Rc<RefCell<Vec<(RouteId, Viewport)>>>,
}

impl Router for RecordingRouter {
	fn did_receive_route_data(&mut self, message: &Value, outbox: &mut Outbox) {
		self.routes.borrow_mut().push(message.clone());
		outbox.send("route", json!({ "ack": message["routeId"] }));
	}

	fn update_route(&mut self, view_id: RouteId, viewport: Viewport, _: &mut Outbox) {
		self.updates.borrow_mut().push((view_id, viewport));
	}
}

#[test]
fn route_data_goes_to_the_router() {
	let mut engine = engine();
	let router = RecordingRouter::default();
	let routes = Rc::clone(&router.routes);
	engine.set_router(router);

	send(&mut engine, "route", json!({ "event": "push", "routeId": 9 }));

	assert_eq!(*routes.borrow(), vec![json!({ "event": "push", "routeId": 9 })]);
	assert_eq!(engine.channel().sent_json(), vec![json!({ "type": "route", "message": { "ack": 9 } })]);
}

#[test]
fn viewport_changes_are_reported_per_page() {
	let mut engine = engine();
	let router = RecordingRouter::default();
	let updates = Rc::clone(&router.updates);
	engine.set_router(router);
	for route_id in [9, 3] {
		let root = new_root(&mut engine);
		engine.register_page(route_id, Page::new(root));
	}

	engine.viewport_changed(Viewport::new(800.0, 600.0));

	assert_eq!(engine.window_info(), Some(Viewport::new(800.0, 600.0)));
	assert_eq!(*updates.borrow(), vec![(3, Viewport::new(800.0, 600.0)), (9, Viewport::new(800.0, 600.0))]);
}

struct Measurer {
	seen: Rc<RefCell<Vec<Value>>>,
}

impl Collaborator<MockTree> for Measurer {
	fn did_receive_message(&mut self, factory: &mut ComponentFactory<MockTree>, message: &Value, outbox: &mut Outbox) {
		self.seen.borrow_mut().push(message.clone());
		let target = message["target"].as_i64().unwrap_or_default();
		outbox.send("rich_text", json!({ "target": target, "known": factory.contains(target) }));
	}
}

#[test]
fn rich_text_is_forwarded_only_for_measuring() {
	let mut engine = engine();
	let seen = Rc::new(RefCell::new(Vec::new()));
	engine.register_collaborator(MessageType::RichText, Measurer { seen: Rc::clone(&seen) });
	send(&mut engine, "diff_data", json!({ "diffs": [{ "identity": 1, "kind": "text_span" }] }));

	send(&mut engine, "rich_text", json!({ "event": "doMeasure", "target": 1 }));
	send(&mut engine, "rich_text", json!({ "event": "somethingElse", "target": 1 }));

	assert_eq!(seen.borrow().len(), 1);
	assert_eq!(engine.channel().sent_json(), vec![json!({ "type": "rich_text", "message": { "target": 1, "known": true } })]);
}

#[test]
fn collaborator_messages_without_a_handler_are_dropped() {
	let mut engine = engine();

	send(&mut engine, "action:web_dialogs", json!({ "dialogType": "alert" }));
	send(&mut engine, "decode_drawable", json!({ "url": "x.png" }));

	assert!(engine.channel().sent.is_empty());
}

struct MessageLog(Rc<RefCell<Vec<Value>>>);

impl Component<MockTree> for MessageLog {
	fn did_receive_message(&mut self, _: &mut MockTree, _: &ElementId, message: &Value) {
		self.0.borrow_mut().push(message.clone());
	}
}

#[test]
fn targeted_messages_reach_their_view() {
	let mut engine = engine();
	let log = Rc::new(RefCell::new(Vec::new()));
	engine.factory_mut().registry_mut().register("native_view", {
		let log = Rc::clone(&log);
		move || Box::new(MessageLog(Rc::clone(&log)))
	});
	send(&mut engine, "diff_data", json!({ "diffs": [{ "identity": 4, "kind": "native_view" }] }));

	send(&mut engine, "platform_view", json!({ "hashCode": 4, "method": "play" }));
	send(&mut engine, "scaffold", json!({ "target": 4, "event": "showSnackBar" }));
	send(&mut engine, "platform_view", json!({ "hashCode": 99, "method": "play" }));
	send(&mut engine, "scaffold", json!({ "event": "noTarget" }));

	assert_eq!(
		*log.borrow(),
		vec![json!({ "hashCode": 4, "method": "play" }), json!({ "target": 4, "event": "showSnackBar" })]
	);
}

fn overlay_frame(engine: &mut TestEngine, scaffold: Value, overlays: &[i64]) {
	let overlays: Vec<Value> = overlays.iter().map(|&identity| json!({ "identity": identity, "kind": "view" })).collect();
	send(engine, "frame_data", json!({ "routeId": 1, "scaffold": scaffold, "overlays": overlays }));
}

#[test]
fn overlays_go_to_the_overlay_root() {
	let mut engine = engine();
	let root = new_root(&mut engine);
	let overlay_root = new_root(&mut engine);
	engine.register_page(1, Page::new(root).with_overlay_root(overlay_root));

	overlay_frame(&mut engine, json!({ "identity": 1, "kind": "view" }), &[10, 11]);
	assert_eq!(engine.factory().tree().children(overlay_root), &[element(&engine, 10), element(&engine, 11)]);
	assert_eq!(engine.page(1).unwrap().overlays(), &[10, 11]);

	let mutations = engine.factory().tree().mutations();
	overlay_frame(&mut engine, json!({ "identity": 1, "kind": "view" }), &[10, 11]);
	assert_eq!(engine.factory().tree().mutations(), mutations);

	overlay_frame(&mut engine, json!({ "identity": 1, "kind": "view" }), &[11]);
	assert_eq!(engine.factory().tree().children(overlay_root), &[element(&engine, 11)]);
	assert_eq!(engine.factory().tree().parent(element(&engine, 10)), None);
}

#[test]
fn ignore_scaffold_only_touches_overlays() {
	let mut engine = engine();
	let root = new_root(&mut engine);
	engine.register_page(1, Page::new(root));
	overlay_frame(&mut engine, json!({ "identity": 1, "kind": "view" }), &[10]);

	send(&mut engine, "frame_data", json!({ "routeId": 1, "ignoreScaffold": true, "scaffold": { "identity": 2, "kind": "view" }, "overlays": [] }));

	assert!(!engine.factory().contains(2));
	assert_eq!(engine.page(1).unwrap().scaffold(), Some(1));
	assert!(engine.page(1).unwrap().overlays().is_empty());
	assert_eq!(engine.factory().tree().children(root), &[element(&engine, 1)]);
}

#[test]
fn unresolvable_scaffold_drops_the_whole_frame() {
	let mut engine = engine();
	let root = new_root(&mut engine);
	engine.register_page(1, Page::new(root));
	overlay_frame(&mut engine, json!({ "identity": 1, "kind": "view" }), &[10]);

	overlay_frame(&mut engine, json!({ "identity": 2, "kind": "no_such_kind" }), &[]);

	assert_eq!(engine.page(1).unwrap().scaffold(), Some(1));
	assert_eq!(engine.page(1).unwrap().overlays(), &[10]);
}

#[test]
fn inactive_pages_detach_but_keep_their_views() {
	let mut engine = engine();
	let root = new_root(&mut engine);
	engine.register_page(1, Page::new(root));
	send(&mut engine, "frame_data", json!({ "routeId": 1, "scaffold": { "identity": 1, "kind": "view", "children": [{ "identity": 2, "kind": "view" }] } }));
	let scaffold = element(&engine, 1);

	assert!(engine.set_page_active(1, false));
	assert!(!engine.page(1).unwrap().is_active());
	assert_eq!(engine.factory().tree().parent(scaffold), None);
	assert!(engine.factory().contains(2));

	// Frames for an inactive page still update the cache without attaching.
	frame(&mut engine, 1, 1);
	assert_eq!(engine.factory().tree().parent(scaffold), None);

	assert!(engine.set_page_active(1, true));
	assert_eq!(engine.factory().tree().parent(scaffold), Some(root));
	assert_eq!(engine.factory().tree().parent(element(&engine, 2)), Some(scaffold));
	assert_eq!(engine.factory().tree().created(), 3);

	assert!(!engine.set_page_active(42, false));
}

#[test]
fn config_deserializes_with_defaults() {
	let config: EngineConfig = serde_json::from_value(json!({ "logMessages": true })).unwrap();
	assert_eq!(
		config,
		EngineConfig {
			log_messages: true,
			pending_frame_warning: 64,
		}
	);
	assert_eq!(EngineConfig::default().pending_frame_warning, 64);

	init_logging();
	let mut engine = Engine::new(MockTree::new(), MockChannel::ready()).with_config(config);
	frame(&mut engine, 3, 1);
	engine.send_message("logged");
	assert!(engine.config().log_messages);
	assert_eq!(engine.pending_frames(3), 1);
	assert_eq!(engine.channel().sent, vec!["logged"]);
}
