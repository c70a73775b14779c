//! Failures at the decode boundary.
//!
//! None of these ever leave the [`Engine`](`crate::engine::Engine`): each one is logged at `debug` level and the offending input is dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("malformed message: {0}")]
	Json(#[from] serde_json::Error),
	/// The payload decoded to `null`, `false`, `0` or an empty string.
	#[error("empty message")]
	Empty,
	#[error("expected a list of identities")]
	NotAList,
}
