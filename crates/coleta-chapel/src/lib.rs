//! Chapel Library catalog source.
//!
//! The Chapel Library exposes its catalog as a paginated JSON API;
//! this crate maps its payloads onto the core pipeline's record
//! model.

mod catalog;

pub use catalog::ChapelLibrary;
