//! Frames that arrive for a route before any page has claimed it.

use crate::wire::{FrameData, RouteId};
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Unbounded per-route FIFO. Each route's frames are handed out once, in arrival order.
#[derive(Debug, Default)]
pub struct RouteInbox {
	pending: HashMap<RouteId, VecDeque<FrameData>>,
}

impl RouteInbox {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Buffers `frame` behind earlier frames for the same route. Returns how many frames that route now holds.
	pub fn push(&mut self, frame: FrameData) -> usize {
		let queue = self.pending.entry(frame.route_id).or_default();
		queue.push_back(frame);
		queue.len()
	}

	/// Removes and returns everything buffered for `route_id`, oldest first.
	pub fn take(&mut self, route_id: RouteId) -> impl Iterator<Item = FrameData> {
		self.pending.remove(&route_id).unwrap_or_default().into_iter()
	}

	#[must_use]
	pub fn len(&self, route_id: RouteId) -> usize {
		self.pending.get(&route_id).map_or(0, VecDeque::len)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	pub fn routes(&self) -> impl Iterator<Item = RouteId> + '_ {
		self.pending.keys().copied()
	}
}
