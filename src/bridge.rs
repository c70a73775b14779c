//! Seams for the collaborators the engine forwards messages to without interpreting them.
//!
//! Router, script bridge and the component-specific services (text measuring, dialogs, drawables) are implemented elsewhere.
//! They answer the host through an [`Outbox`], which the engine then sends in order.

use crate::{
	factory::ComponentFactory,
	platform::{NativeTree, Viewport},
	wire::{Envelope, MpjsMessage, MpjsReply, RouteId},
};
use serde_json::Value;

/// Outbound envelopes produced while handling one inbound message.
#[derive(Debug, Default)]
pub struct Outbox {
	envelopes: Vec<Envelope>,
}

impl Outbox {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, envelope: Envelope) {
		self.envelopes.push(envelope);
	}

	pub fn send(&mut self, kind: impl Into<String>, message: Value) {
		self.push(Envelope::new(kind, message));
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.envelopes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.envelopes.is_empty()
	}

	pub(crate) fn drain(&mut self) -> impl Iterator<Item = Envelope> + '_ {
		self.envelopes.drain(..)
	}
}

pub trait Router {
	/// Handles a `route` envelope's payload.
	fn did_receive_route_data(&mut self, message: &Value, outbox: &mut Outbox);

	/// A managed page's viewport changed.
	fn update_route(&mut self, view_id: RouteId, viewport: Viewport, outbox: &mut Outbox) {
		let _ = (view_id, viewport, outbox);
	}
}

/// The two-way script-execution bridge behind `mpjs` envelopes.
pub trait ScriptBridge {
	/// Pushes a [`MpjsReply::Result`] to answer the request and any number of [`MpjsReply::Callback`]s.
	fn handle_message(&mut self, message: &MpjsMessage, replies: &mut Vec<MpjsReply>);
}

/// Handler for one of the component-specific envelope types (`rich_text`, `action:web_dialogs`, `decode_drawable`).
pub trait Collaborator<T: NativeTree> {
	fn did_receive_message(&mut self, factory: &mut ComponentFactory<T>, message: &Value, outbox: &mut Outbox);
}
