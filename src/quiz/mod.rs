//! Quiz content model
//!
//! This module contains the static quiz definition: rounds, multiple
//! choice questions and the media references attached to them. The
//! content is validated with `garde` and serialized with `serde`.

pub mod config;
pub mod media;
pub mod question;
