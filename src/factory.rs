//! The identity-keyed cache of views and their native elements.
//!
//! # Ownership
//!
//! The factory owns every [`ComponentView`] and the [`NativeTree`] their elements live in.
//! Parent, child and ancestor relations are stored as [`Identity`]s and resolved through the cache on use,
//! so no view ever holds on to another.
//!
//! # Garbage collection
//!
//! Cache entries are only ever removed by [`purge`](`ComponentFactory::purge`). There is no reference counting:
//! detaching a view leaves it cached (so it can be re-attached later without being recreated),
//! and purging an identity that is still attached somewhere is the host's mistake, not detected here.

use crate::{
	component::Registry,
	platform::NativeTree,
	view::{AdditionalConstraints, AncestorStyle, AncestorView, ComponentView},
	wire::{AncestorDescriptor, Constraints, Identity, NodeDescriptor},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use serde_json::Value;
use tracing::{debug, error, instrument, trace, trace_span, warn};

pub struct ComponentFactory<T: NativeTree> {
	tree: T,
	registry: Registry<T>,
	cached_view: HashMap<Identity, ComponentView<T>>,
	cached_element: HashMap<Identity, T::Element>,
}

impl<T: NativeTree> ComponentFactory<T> {
	#[must_use]
	pub fn new(tree: T, registry: Registry<T>) -> Self {
		Self {
			tree,
			registry,
			cached_view: HashMap::new(),
			cached_element: HashMap::new(),
		}
	}

	#[must_use]
	pub fn tree(&self) -> &T {
		&self.tree
	}

	pub fn tree_mut(&mut self) -> &mut T {
		&mut self.tree
	}

	#[must_use]
	pub fn registry(&self) -> &Registry<T> {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut Registry<T> {
		&mut self.registry
	}

	#[must_use]
	pub fn view(&self, identity: Identity) -> Option<&ComponentView<T>> {
		self.cached_view.get(&identity)
	}

	pub fn view_mut(&mut self, identity: Identity) -> Option<ViewMut<'_, T>> {
		if self.cached_view.contains_key(&identity) {
			Some(ViewMut { factory: self, identity })
		} else {
			None
		}
	}

	#[must_use]
	pub fn cached_element(&self, identity: Identity) -> Option<&T::Element> {
		self.cached_element.get(&identity)
	}

	#[must_use]
	pub fn contains(&self, identity: Identity) -> bool {
		self.cached_view.contains_key(&identity)
	}

	/// Number of cached views.
	#[must_use]
	pub fn len(&self) -> usize {
		self.cached_view.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cached_view.is_empty()
	}

	/// Resolves `descriptor` to its cached view, constructing it on first sight, and applies the update to it.
	///
	/// The update is applied in a fixed order: attributes, constraints, children, ancestors.
	///
	/// Returns [`None`] for an absent descriptor or an unregistered kind.
	#[instrument(skip(self, descriptor), fields(identity = descriptor.map(|d| d.identity), kind = descriptor.map(|d| d.kind.as_str())))]
	pub fn create(&mut self, descriptor: Option<&NodeDescriptor>) -> Option<Identity> {
		let descriptor = descriptor?;
		let identity = descriptor.identity;

		match self.cached_view.get(&identity) {
			Some(cached) => {
				if cached.kind != descriptor.kind {
					warn!("Identity {} was constructed as {:?} but is now described as {:?}. Reusing it anyway.", identity, cached.kind, descriptor.kind);
				}
			}
			None => {
				let constructor = match self.registry.get(&descriptor.kind) {
					Some(constructor) => constructor,
					None => {
						debug!("Unknown component kind {:?}. Dropping the node.", descriptor.kind);
						return None;
					}
				};
				let component = constructor();
				let element = self.tree.create_element(component.element_tag());
				if let Some(stale) = self.cached_element.insert(identity, element.clone()) {
					self.tree.release_element(stale);
				}
				self.cached_view.insert(identity, ComponentView::new(identity, descriptor.kind.clone(), element, component));
				trace!("Constructed view.");
			}
		}

		let mut view = ViewMut { factory: self, identity };
		view.set_attributes(descriptor.attributes.clone());
		view.set_constraints(descriptor.constraints);
		view.set_children(descriptor.children.as_deref());
		view.set_ancestors(descriptor.ancestors.as_deref());
		Some(identity)
	}

	/// Resolves one virtual ancestor of `owner`.
	///
	/// An ancestor entry `owner` already carries for the same node is reused, so that a missing box keeps the previous one.
	/// Storing a box recomputes `owner`'s layout (never the ancestor node's own).
	///
	/// Without an `owner`, the result is detached and has no effect on any layout.
	#[instrument(skip(self, descriptor), fields(identity = descriptor.map(|d| d.identity)))]
	pub fn create_ancestors(&mut self, descriptor: Option<&AncestorDescriptor>, owner: Option<Identity>) -> Option<AncestorView> {
		let descriptor = descriptor?;
		if !self.cached_view.contains_key(&descriptor.identity) {
			debug!("Ancestor {} isn't cached. Skipping it.", descriptor.identity);
			return None;
		}

		let existing = match owner {
			Some(owner) => self.cached_view.get_mut(&owner).and_then(|view| view.ancestors.iter_mut().find(|ancestor| ancestor.ancestor == descriptor.identity)),
			None => None,
		};
		match existing {
			Some(existing) => {
				let ancestor = *existing;
				let mut updated = ancestor;
				if updated.set_constraints(descriptor.constraints) && updated != ancestor {
					*existing = updated;
					if let Some(owner) = owner {
						ViewMut { factory: self, identity: owner }.update_layout();
					}
				}
				Some(updated)
			}
			None => {
				let mut ancestor = AncestorView::new(owner, descriptor.identity);
				ancestor.set_constraints(descriptor.constraints);
				Some(ancestor)
			}
		}
	}

	/// Drops the cache entries of `identities`. Unknown identities are ignored.
	///
	/// Attachment state is left alone: the host must only purge identities that are no longer attached.
	#[instrument(skip(self, identities), fields(count = identities.len()))]
	pub fn purge(&mut self, identities: &[Identity]) {
		for identity in identities {
			let view = self.cached_view.remove(identity);
			let element = self.cached_element.remove(identity);
			if view.is_some() || element.is_some() {
				trace!("Purged {}.", identity);
			}
			drop(view);
			if let Some(element) = element {
				self.tree.release_element(element);
			}
		}
	}

	/// Routes a host message to the view cached as `identity`. Returns whether that view exists.
	pub fn dispatch_message(&mut self, identity: Identity, message: &Value) -> bool {
		match self.cached_view.get_mut(&identity) {
			Some(view) => {
				view.component.did_receive_message(&mut self.tree, &view.element, message);
				true
			}
			None => {
				debug!("Message for unknown view {}. Dropping it.", identity);
				false
			}
		}
	}

	fn is_attached_to(&self, child: Identity, parent: Identity) -> bool {
		self.cached_view.get(&child).map_or(false, |view| view.superview == Some(parent))
	}
}

impl<T: NativeTree> Debug for ComponentFactory<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentFactory")
			.field("registry", &self.registry)
			.field("cached_view", &self.cached_view.len())
			.field("cached_element", &self.cached_element.len())
			.finish_non_exhaustive()
	}
}

/// Mutable access to one cached view, together with the rest of the cache.
///
/// Obtained from [`ComponentFactory::view_mut`], which guarantees the view existed at that point.
/// Views can't disappear while a `ViewMut` is held, since purging needs the factory.
pub struct ViewMut<'a, T: NativeTree> {
	factory: &'a mut ComponentFactory<T>,
	identity: Identity,
}

impl<'a, T: NativeTree> ViewMut<'a, T> {
	#[must_use]
	pub fn identity(&self) -> Identity {
		self.identity
	}

	#[must_use]
	pub fn view(&self) -> Option<&ComponentView<T>> {
		self.factory.cached_view.get(&self.identity)
	}

	/// Stores `attributes` verbatim and lets the component interpret them.
	pub fn set_attributes(&mut self, attributes: Value) {
		let factory = &mut *self.factory;
		let view = match factory.cached_view.get_mut(&self.identity) {
			Some(view) => view,
			None => return,
		};

		#[cfg(feature = "dangerous-logging")]
		trace!(identity = self.identity, %attributes, "Setting attributes.");

		view.component.apply_attributes(&mut factory.tree, &view.element, &attributes);
		let additional_constraints = view.component.additional_constraints(&attributes);
		view.attributes = attributes;
		if additional_constraints != view.additional_constraints {
			view.additional_constraints = additional_constraints;
			self.update_layout();
		}
	}

	/// Interprets the retained attributes again, e.g. after re-attaching a page.
	pub fn reapply_attributes(&mut self) {
		if let Some(attributes) = self.view().map(|view| view.attributes.clone()) {
			self.set_attributes(attributes);
		}
	}

	/// Replaces the embedder's layout overrides and recomputes the layout.
	///
	/// They persist across updates and win over what the component derives from its attributes.
	/// Pass [`AdditionalConstraints::default()`] to clear them.
	pub fn set_layout_override(&mut self, layout_override: AdditionalConstraints) {
		if let Some(view) = self.factory.cached_view.get_mut(&self.identity) {
			view.layout_override = layout_override;
			self.update_layout();
		}
	}

	/// [`None`] keeps the previous layout.
	pub fn set_constraints(&mut self, constraints: Option<Constraints>) {
		let constraints = match constraints {
			Some(constraints) => constraints,
			None => return,
		};
		if let Some(view) = self.factory.cached_view.get_mut(&self.identity) {
			view.constraints = Some(constraints);
			self.update_layout();
		}
	}

	/// Writes the absolute box to the native element.
	pub fn update_layout(&mut self) {
		let factory = &mut *self.factory;
		if let Some(view) = factory.cached_view.get(&self.identity) {
			if let Some(style) = view.layout_style() {
				factory.tree.set_style(&view.element, &style);
			}
		}
	}

	/// Makes the subviews mirror `children`.
	///
	/// [`None`] leaves the subviews as they are; an empty list removes all of them.
	/// Entries that don't resolve are dropped, as are repeats of an identity already listed.
	/// If the resolved sequence equals the current one, nothing is touched.
	/// Otherwise all current subviews are detached and the resolved ones attached in order.
	pub fn set_children(&mut self, children: Option<&[Option<NodeDescriptor>]>) {
		let children = match children {
			Some(children) => children,
			None => return,
		};
		let span = trace_span!("set_children", identity = self.identity, count = children.len());
		let _enter = span.enter();

		let identity = self.identity;
		let mut resolved: Vec<Identity> = Vec::with_capacity(children.len());
		for child in children.iter().filter_map(|child| self.factory.create(child.as_ref())) {
			if child == identity {
				warn!("View {} lists itself as a child. Skipping that entry.", identity);
			} else if resolved.contains(&child) {
				warn!("View {} lists child {} more than once. Keeping the first entry.", identity, child);
			} else {
				resolved.push(child);
			}
		}

		let unchanged = match self.view() {
			Some(view) => view.subviews.len() == resolved.len() && resolved.iter().zip(&view.subviews).all(|(r, s)| r == s && self.factory.is_attached_to(*r, identity)),
			None => return,
		};
		if unchanged {
			trace!("Children unchanged.");
			return;
		}

		self.remove_all_subviews();
		for child in resolved {
			self.add_subview(child);
		}
	}

	/// Replaces the ancestor chain and the inheritable style it applies.
	///
	/// Properties the previous chain set are first restored to their defaults (and only those),
	/// then the new chain's contributions are applied on top.
	pub fn set_ancestors(&mut self, ancestors: Option<&[Option<AncestorDescriptor>]>) {
		let identity = self.identity;
		let reset = match self.view() {
			Some(view) => view.ancestor_style.reset_style(),
			None => return,
		};

		let resolved: Vec<AncestorView> = ancestors
			.unwrap_or_default()
			.iter()
			.filter_map(|ancestor| self.factory.create_ancestors(ancestor.as_ref(), Some(identity)))
			.collect();

		let mut inherited = AncestorStyle::new();
		for ancestor in &resolved {
			if let Some(source) = self.factory.cached_view.get(&ancestor.ancestor) {
				source.component.ancestor_style(&source.attributes, &mut inherited);
			}
		}

		let factory = &mut *self.factory;
		let view = match factory.cached_view.get_mut(&identity) {
			Some(view) => view,
			None => return,
		};
		let mut style = reset;
		style.extend(&inherited.to_style());
		view.ancestors = resolved;
		view.ancestor_style = inherited;
		factory.tree.set_style(&view.element, &style);
		self.update_layout();
	}

	/// Attaches `child` as the last subview, detaching it from a previous superview first.
	/// Returns `false` if `child` isn't cached or is this view itself.
	pub fn add_subview(&mut self, child: Identity) -> bool {
		if child == self.identity || !self.factory.cached_view.contains_key(&child) {
			return false;
		}
		if self.factory.cached_view.get(&child).and_then(|view| view.superview).is_some() {
			if let Some(mut child) = self.factory.view_mut(child) {
				child.remove_from_superview();
			}
		}

		let factory = &mut *self.factory;
		let parent_element = match factory.cached_view.get_mut(&self.identity) {
			Some(parent) => {
				parent.subviews.push(child);
				parent.element.clone()
			}
			None => return false,
		};
		match factory.cached_view.get_mut(&child) {
			Some(view) => {
				view.superview = Some(self.identity);
				factory.tree.append_child(&parent_element, &view.element);
				true
			}
			None => {
				error!("Subview {} vanished while being attached.", child);
				false
			}
		}
	}

	/// Detaches this view from its superview and its element from the native tree. The cache entry stays.
	pub fn remove_from_superview(&mut self) {
		let factory = &mut *self.factory;
		let superview = match factory.cached_view.get_mut(&self.identity) {
			Some(view) => {
				factory.tree.remove_element(&view.element);
				view.superview.take()
			}
			None => return,
		};
		let identity = self.identity;
		if let Some(superview) = superview {
			if let Some(parent) = factory.cached_view.get_mut(&superview) {
				parent.subviews.retain(|&subview| subview != identity);
			}
		}
	}

	pub fn remove_all_subviews(&mut self) {
		let factory = &mut *self.factory;
		let subviews = match factory.cached_view.get_mut(&self.identity) {
			Some(view) => core::mem::take(&mut view.subviews),
			None => return,
		};
		for subview in subviews {
			if let Some(view) = factory.cached_view.get_mut(&subview) {
				if view.superview == Some(self.identity) {
					view.superview = None;
					factory.tree.remove_element(&view.element);
				}
			}
		}
	}
}

impl<'a, T: NativeTree> Debug for ViewMut<'a, T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewMut").field("identity", &self.identity).finish_non_exhaustive()
	}
}
