#![doc = "authoring-core: publish-dependency resolution and clipboard paste for a content-authoring backend."]

//! This crate contains the two content-graph algorithms of the authoring
//! backend: resolving the full set of repository paths that must travel with a
//! publish submission, and the recursive copy/move engine behind clipboard
//! paste. The surrounding system supplies the content store, the
//! state/dependency oracles and the workflow pipeline through the traits in
//! [`contract`].
//!
//! # Usage
//! Add this as a dependency wherever submission closure or clipboard paste
//! logic is needed; implement the `contract` traits against your store.

pub mod clipboard;
pub mod config;
pub mod contract;
pub mod resolve;
