//! The dispatcher between the host channel and the reconciler.
//!
//! Everything here runs synchronously inside the handling of one inbound message or one direct call,
//! so no mutation of the cache or the native tree is ever observed half-done.
//! All state is per [`Engine`] instance; several engines can coexist in one process.

use crate::{
	bridge::{Collaborator, Outbox, Router, ScriptBridge},
	component::Registry,
	factory::ComponentFactory,
	page::Page,
	platform::{DebuggerTransport, HostChannel, NativeTree, Viewport},
	route_buffer::RouteInbox,
	wire::{self, DiffData, Envelope, FrameData, Identity, MessageType, MpjsMessage, NodeDescriptor, RouteId},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace_span, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
	/// Log every inbound and outbound envelope at `debug` level.
	/// Payloads are only included with the `dangerous-logging` feature.
	pub log_messages: bool,
	/// Warn when this many frames are buffered for one unclaimed route. `0` disables the warning.
	pub pending_frame_warning: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			log_messages: false,
			pending_frame_warning: 64,
		}
	}
}

/// Boots the host program. Runs once, on [`Engine::start`].
pub type CodeBlock = Box<dyn FnOnce()>;

pub struct Engine<T: NativeTree, C: HostChannel> {
	config: EngineConfig,
	started: bool,
	code_block: Option<CodeBlock>,
	debugger: Option<Box<dyn DebuggerTransport>>,
	channel: C,
	message_queue: Vec<String>,
	factory: ComponentFactory<T>,
	managed_views: HashMap<RouteId, Page<T::Element>>,
	unmanaged_view_frame_data: RouteInbox,
	window_info: Option<Viewport>,
	router: Option<Box<dyn Router>>,
	script_bridge: Option<Box<dyn ScriptBridge>>,
	collaborators: HashMap<MessageType, Box<dyn Collaborator<T>>>,
	page_mode: bool,
}

impl<T: NativeTree, C: HostChannel> Engine<T, C> {
	/// An engine whose registry knows the built-in kinds.
	#[must_use]
	pub fn new(tree: T, channel: C) -> Self {
		Self::with_factory(ComponentFactory::new(tree, Registry::with_builtins()), channel)
	}

	#[must_use]
	pub fn with_factory(factory: ComponentFactory<T>, channel: C) -> Self {
		Self {
			config: EngineConfig::default(),
			started: false,
			code_block: None,
			debugger: None,
			channel,
			message_queue: Vec::new(),
			factory,
			managed_views: HashMap::new(),
			unmanaged_view_frame_data: RouteInbox::new(),
			window_info: None,
			router: None,
			script_bridge: None,
			collaborators: HashMap::new(),
			page_mode: false,
		}
	}

	#[must_use]
	pub fn with_config(mut self, config: EngineConfig) -> Self {
		self.config = config;
		self
	}

	pub fn init_with_code_block(&mut self, code_block: impl FnOnce() + 'static) {
		self.code_block = Some(Box::new(code_block));
	}

	pub fn init_with_debugger(&mut self, debugger: impl DebuggerTransport + 'static) {
		self.debugger = Some(Box::new(debugger));
	}

	pub fn set_router(&mut self, router: impl Router + 'static) {
		self.router = Some(Box::new(router));
	}

	pub fn set_script_bridge(&mut self, script_bridge: impl ScriptBridge + 'static) {
		self.script_bridge = Some(Box::new(script_bridge));
	}

	/// Installs the handler for `rich_text`, `action:web_dialogs` or `decode_drawable` envelopes.
	pub fn register_collaborator(&mut self, message_type: MessageType, collaborator: impl Collaborator<T> + 'static) {
		self.collaborators.insert(message_type, Box::new(collaborator));
	}

	#[must_use]
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	#[must_use]
	pub fn factory(&self) -> &ComponentFactory<T> {
		&self.factory
	}

	pub fn factory_mut(&mut self) -> &mut ComponentFactory<T> {
		&mut self.factory
	}

	#[must_use]
	pub fn channel(&self) -> &C {
		&self.channel
	}

	pub fn channel_mut(&mut self) -> &mut C {
		&mut self.channel
	}

	#[must_use]
	pub fn is_started(&self) -> bool {
		self.started
	}

	/// Whether any page has registered so far.
	#[must_use]
	pub fn is_page_mode(&self) -> bool {
		self.page_mode
	}

	/// The viewport of the latest [`viewport_changed`](`Engine::viewport_changed`). [`None`] until the first measurement completes.
	#[must_use]
	pub fn window_info(&self) -> Option<Viewport> {
		self.window_info
	}

	/// Messages that were sent before the channel was ready.
	#[must_use]
	pub fn queued_messages(&self) -> &[String] {
		&self.message_queue
	}

	/// One-time setup. Does nothing if already started, or if neither a code block nor a debugger is configured.
	#[instrument(skip(self))]
	pub fn start(&mut self) {
		if self.started {
			return;
		}
		if self.code_block.is_none() && self.debugger.is_none() {
			return debug!("Neither a code block nor a debugger is configured. Not starting.");
		}

		self.channel.request_viewport();
		if let Some(debugger) = &mut self.debugger {
			debugger.start();
		}
		if let Some(code_block) = self.code_block.take() {
			self.channel.install_inbound_handler();
			code_block();
			self.flush_queue_message();
		}
		self.started = true;
		info!("Engine started.");
	}

	/// Sends through the debugger if one is active, else through the channel if it's ready, else queues.
	pub fn send_message(&mut self, message: impl Into<String>) {
		let message = message.into();
		self.log_message("out", &message);
		if let Some(debugger) = &mut self.debugger {
			debugger.send_message(&message);
		} else if self.channel.is_ready() {
			self.channel.post_message(&message);
		} else {
			self.message_queue.push(message);
		}
	}

	/// Replays queued messages in order once the channel is ready.
	///
	/// The queue isn't drained: call this once per transition to ready, or messages are sent twice.
	/// Debugger sessions never replay.
	pub fn flush_queue_message(&mut self) {
		if self.debugger.is_some() || !self.channel.is_ready() {
			return;
		}
		for message in &self.message_queue {
			self.channel.post_message(message);
		}
	}

	/// Entry point for the primary (JSON text) encoding. Undecodable input is dropped.
	pub fn did_receive_message(&mut self, raw: &str) {
		self.log_message("in", raw);
		match Envelope::decode(raw) {
			Ok(envelope) => self.dispatch(envelope),
			Err(error) => debug!(%error, "Dropping undecodable message."),
		}
	}

	/// Entry point for the alternate encoding, where the host hands over an already structured value.
	pub fn did_receive_structured_message(&mut self, message: Value) {
		if self.config.log_messages {
			self.log_message("in", &message.to_string());
		}
		match Envelope::from_value(message) {
			Ok(envelope) => self.dispatch(envelope),
			Err(error) => debug!(%error, "Dropping undecodable message."),
		}
	}

	fn dispatch(&mut self, envelope: Envelope) {
		let message_type = match envelope.message_type() {
			Some(message_type) => message_type,
			None => return debug!(kind = %envelope.kind, "Dropping message of unknown type."),
		};
		let span = trace_span!("dispatch", kind = message_type.as_str());
		let _enter = span.enter();

		match message_type {
			MessageType::FrameData => match wire::decode_payload::<FrameData>(envelope.message) {
				Ok(frame) => self.did_receive_frame_data(frame),
				Err(error) => debug!(%error, "Dropping frame data."),
			},
			MessageType::DiffData => match wire::decode_payload::<DiffData>(envelope.message) {
				Ok(diff) => self.did_receive_diff_data(&diff),
				Err(error) => debug!(%error, "Dropping diff data."),
			},
			MessageType::ElementGc => match wire::decode_identities(&envelope.message) {
				Ok(identities) => self.did_receive_element_gc(&identities),
				Err(error) => debug!(%error, "Dropping element GC."),
			},
			MessageType::Route => {
				let mut outbox = Outbox::new();
				match &mut self.router {
					Some(router) => router.did_receive_route_data(&envelope.message, &mut outbox),
					None => debug!("No router. Dropping route data."),
				}
				self.send_outbox(&mut outbox);
			}
			MessageType::Mpjs => match wire::decode_payload::<MpjsMessage>(envelope.message) {
				Ok(message) => self.did_receive_mpjs(&message),
				Err(error) => debug!(%error, "Dropping script bridge message."),
			},
			MessageType::Scaffold => self.did_receive_targeted_message(&envelope.message, "target"),
			MessageType::PlatformView => self.did_receive_targeted_message(&envelope.message, "hashCode"),
			MessageType::RichText => {
				if envelope.message.get("event").and_then(Value::as_str) == Some("doMeasure") {
					self.forward_to_collaborator(message_type, &envelope.message);
				}
			}
			MessageType::WebDialogs | MessageType::DecodeDrawable => self.forward_to_collaborator(message_type, &envelope.message),
		}
	}

	/// Delivers `frame` to the page registered for its route, or buffers it until one registers.
	#[instrument(skip(self, frame), fields(route_id = frame.route_id))]
	pub fn did_receive_frame_data(&mut self, frame: FrameData) {
		match self.managed_views.get_mut(&frame.route_id) {
			Some(page) => page.did_receive_frame_data(&mut self.factory, &frame),
			None => {
				let route_id = frame.route_id;
				let pending = self.unmanaged_view_frame_data.push(frame);
				if pending == self.config.pending_frame_warning {
					warn!(route_id, pending, "Frames keep arriving for a route no page has claimed.");
				}
			}
		}
	}

	/// Applies each descriptor for its cache side effects only. Nothing gets attached here.
	#[instrument(skip(self, diff), fields(count = diff.diffs.as_ref().map_or(0, Vec::len)))]
	pub fn did_receive_diff_data(&mut self, diff: &DiffData) {
		for descriptor in diff.diffs.iter().flatten() {
			let descriptor = descriptor.as_ref();
			self.factory.create(descriptor);
			self.factory.create_ancestors(descriptor.map(NodeDescriptor::as_ancestor).as_ref(), None);
		}
	}

	pub fn did_receive_element_gc(&mut self, identities: &[Identity]) {
		self.factory.purge(identities);
	}

	/// Hands `message` to the script bridge and sends its replies in the `mpjs` shapes.
	pub fn did_receive_mpjs(&mut self, message: &MpjsMessage) {
		let script_bridge = match &mut self.script_bridge {
			Some(script_bridge) => script_bridge,
			None => return debug!("No script bridge. Dropping mpjs message."),
		};
		let mut replies = Vec::new();
		script_bridge.handle_message(message, &mut replies);
		for reply in replies {
			let envelope = reply.into_envelope(message.request_id.as_ref());
			self.send_message(envelope.encode());
		}
	}

	/// Registers `page` for `route_id` and replays, in arrival order, whatever was buffered for that route.
	///
	/// This is where an asynchronous route request completes. A page torn down in the meantime is still registered.
	/// Returns the page previously registered for `route_id`, if any.
	#[instrument(skip(self, page))]
	pub fn register_page(&mut self, route_id: RouteId, mut page: Page<T::Element>) -> Option<Page<T::Element>> {
		page.set_view_id(route_id);
		self.page_mode = true;
		for frame in self.unmanaged_view_frame_data.take(route_id) {
			page.did_receive_frame_data(&mut self.factory, &frame);
		}
		self.managed_views.insert(route_id, page)
	}

	/// Unregisters the page for `route_id`. Its views stay cached until the host purges them.
	pub fn dispose_page(&mut self, route_id: RouteId) -> Option<Page<T::Element>> {
		self.managed_views.remove(&route_id)
	}

	#[must_use]
	pub fn page(&self, route_id: RouteId) -> Option<&Page<T::Element>> {
		self.managed_views.get(&route_id)
	}

	/// Returns whether a page is registered for `route_id`.
	pub fn set_page_active(&mut self, route_id: RouteId, active: bool) -> bool {
		match self.managed_views.get_mut(&route_id) {
			Some(page) => {
				page.set_active(&mut self.factory, active);
				true
			}
			None => false,
		}
	}

	/// Frames buffered for a route no page has claimed yet.
	#[must_use]
	pub fn pending_frames(&self, route_id: RouteId) -> usize {
		self.unmanaged_view_frame_data.len(route_id)
	}

	/// Completes a viewport measurement: stores it and reports it to the router for every managed page.
	///
	/// Pages registered by now get the update, whether or not they existed when the measurement was requested.
	pub fn viewport_changed(&mut self, viewport: Viewport) {
		self.window_info = Some(viewport);

		let mut routes: Vec<RouteId> = self.managed_views.keys().copied().collect();
		routes.sort_unstable();
		let mut outbox = Outbox::new();
		if let Some(router) = &mut self.router {
			for route_id in routes {
				router.update_route(route_id, viewport, &mut outbox);
			}
		}
		self.send_outbox(&mut outbox);
	}

	fn did_receive_targeted_message(&mut self, message: &Value, key: &str) {
		match message.get(key).and_then(Value::as_i64) {
			Some(identity) => {
				self.factory.dispatch_message(identity, message);
			}
			None => debug!(key, "Targeted message without a target. Dropping it."),
		}
	}

	fn forward_to_collaborator(&mut self, message_type: MessageType, message: &Value) {
		let mut outbox = Outbox::new();
		match self.collaborators.get_mut(&message_type) {
			Some(collaborator) => collaborator.did_receive_message(&mut self.factory, message, &mut outbox),
			None => debug!(kind = message_type.as_str(), "No collaborator registered. Dropping message."),
		}
		self.send_outbox(&mut outbox);
	}

	fn send_outbox(&mut self, outbox: &mut Outbox) {
		for envelope in outbox.drain() {
			self.send_message(envelope.encode());
		}
	}

	fn log_message(&self, direction: &'static str, message: &str) {
		if !self.config.log_messages {
			return;
		}
		#[cfg(feature = "dangerous-logging")]
		debug!(direction, message, "Message.");
		#[cfg(not(feature = "dangerous-logging"))]
		debug!(direction, len = message.len(), "Message.");
	}
}

impl<T: NativeTree, C: HostChannel + Debug> Debug for Engine<T, C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("config", &self.config)
			.field("started", &self.started)
			.field("channel", &self.channel)
			.field("message_queue", &self.message_queue.len())
			.field("factory", &self.factory)
			.field("managed_views", &self.managed_views.len())
			.field("unmanaged_view_frame_data", &self.unmanaged_view_frame_data)
			.field("page_mode", &self.page_mode)
			.finish_non_exhaustive()
	}
}
