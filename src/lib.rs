//! Materializes a host-computed UI tree onto platform-native elements.
//!
//! The host sends already-resolved node descriptors; this crate keeps one [`ComponentView`](`view::ComponentView`)
//! per host identity, mirrors attributes, absolute layout and children onto the native tree,
//! and folds virtual ancestors (logical parents that aren't native parents) into position and inherited style.
//!
//! Start at [`Engine`].

#![doc(html_root_url = "https://docs.rs/remote-tree-dom/0.0.1")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod bridge;
pub mod component;
pub mod engine;
pub mod error;
pub mod factory;
pub mod page;
pub mod platform;
pub mod route_buffer;
pub mod view;
pub mod wire;

pub use engine::{Engine, EngineConfig};
pub use factory::ComponentFactory;
pub use page::Page;
pub use platform::{HostChannel, NativeTree};
