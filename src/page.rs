//! A page: the consumer of one route's frames.
//!
//! A page hangs a scaffold view off its root element and overlay views off its overlay root.
//! Deactivating a page detaches the scaffold's element but keeps every view cached, so the page can come back without recreating anything.

use crate::{
	factory::ComponentFactory,
	platform::{NativeTree, Style},
	wire::{FrameData, Identity, NodeDescriptor, RouteId},
};
use tracing::{debug, instrument, trace};

#[derive(Debug)]
pub struct Page<E> {
	root: E,
	overlay_root: Option<E>,
	view_id: Option<RouteId>,
	active: bool,
	scaffold: Option<Identity>,
	scaffold_attached: bool,
	overlays: Vec<Identity>,
}

impl<E: Clone> Page<E> {
	#[must_use]
	pub fn new(root: E) -> Self {
		Self {
			root,
			overlay_root: None,
			view_id: None,
			active: true,
			scaffold: None,
			scaffold_attached: false,
			overlays: Vec::new(),
		}
	}

	/// Overlays go here instead of the page root.
	#[must_use]
	pub fn with_overlay_root(mut self, overlay_root: E) -> Self {
		self.overlay_root = Some(overlay_root);
		self
	}

	/// The route this page is registered for, once registered.
	#[must_use]
	pub fn view_id(&self) -> Option<RouteId> {
		self.view_id
	}

	pub(crate) fn set_view_id(&mut self, view_id: RouteId) {
		self.view_id = Some(view_id);
	}

	#[must_use]
	pub fn root(&self) -> &E {
		&self.root
	}

	#[must_use]
	pub fn is_active(&self) -> bool {
		self.active
	}

	#[must_use]
	pub fn scaffold(&self) -> Option<Identity> {
		self.scaffold
	}

	#[must_use]
	pub fn overlays(&self) -> &[Identity] {
		&self.overlays
	}

	#[instrument(skip(self, factory, frame), fields(route_id = frame.route_id, view_id = ?self.view_id))]
	pub fn did_receive_frame_data<T>(&mut self, factory: &mut ComponentFactory<T>, frame: &FrameData)
	where
		T: NativeTree<Element = E>,
	{
		if !frame.ignore_scaffold {
			let scaffold = match factory.create(frame.scaffold.as_ref()) {
				Some(scaffold) => scaffold,
				None => return debug!("Scaffold didn't resolve. Dropping the frame."),
			};

			if self.scaffold != Some(scaffold) {
				if let Some(previous) = self.scaffold {
					if let Some(mut previous) = factory.view_mut(previous) {
						previous.remove_from_superview();
					}
				}
				self.scaffold = Some(scaffold);
				self.scaffold_attached = false;
			}

			if self.active && !self.scaffold_attached {
				self.attach_scaffold(factory);
			}
		}

		if let Some(overlays) = &frame.overlays {
			self.set_overlays(factory, overlays);
		}
	}

	/// Mirrors `overlays` onto the overlay root, unless they resolve to exactly the current overlays.
	pub fn set_overlays<T>(&mut self, factory: &mut ComponentFactory<T>, overlays: &[Option<NodeDescriptor>])
	where
		T: NativeTree<Element = E>,
	{
		let resolved: Vec<Identity> = overlays.iter().filter_map(|overlay| factory.create(overlay.as_ref())).collect();
		if resolved == self.overlays {
			return trace!("Overlays unchanged.");
		}

		for previous in self.overlays.drain(..) {
			if let Some(mut view) = factory.view_mut(previous) {
				view.remove_from_superview();
			}
		}
		let overlay_root = self.overlay_root.as_ref().unwrap_or(&self.root).clone();
		for &overlay in &resolved {
			if let Some(element) = factory.view(overlay).map(|view| view.element().clone()) {
				factory.tree_mut().append_child(&overlay_root, &element);
			}
		}
		self.overlays = resolved;
	}

	/// Inactive pages keep their views cached but not attached.
	pub fn set_active<T>(&mut self, factory: &mut ComponentFactory<T>, active: bool)
	where
		T: NativeTree<Element = E>,
	{
		self.active = active;
		let scaffold = match self.scaffold {
			Some(scaffold) => scaffold,
			None => return,
		};
		if active {
			self.attach_scaffold(factory);
			if let Some(mut view) = factory.view_mut(scaffold) {
				view.reapply_attributes();
			}
		} else if let Some(element) = factory.view(scaffold).map(|view| view.element().clone()) {
			factory.tree_mut().remove_element(&element);
			self.scaffold_attached = false;
		}
	}

	fn attach_scaffold<T>(&mut self, factory: &mut ComponentFactory<T>)
	where
		T: NativeTree<Element = E>,
	{
		let element = match self.scaffold.and_then(|scaffold| factory.view(scaffold).map(|view| view.element().clone())) {
			Some(element) => element,
			None => return,
		};
		let tree = factory.tree_mut();
		tree.append_child(&self.root, &element);
		let mut style = Style::new();
		style.set("display", "contents");
		tree.set_style(&element, &style);
		self.scaffold_attached = true;
	}
}
