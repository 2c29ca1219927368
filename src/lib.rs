//! # Quizdeck
//!
//! This library provides the core logic of a presentation-style quiz: a
//! host shows rounds of multiple-choice questions, a countdown limits each
//! question, scores accumulate with optional negative marking, and the quiz
//! content can be edited and persisted between sessions.
//!
//! Rendering, audio and storage engines are left to the host application,
//! which plugs them in through the [`store::Persistence`],
//! [`media_store::MediaStore`] and [`session::FeedbackSink`] traits and
//! drives time by scheduling [`AlarmMessage`]s.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod config;
pub mod constants;
pub mod game;
pub mod id;
pub mod media_store;
pub mod quiz;
pub mod scoring;
pub mod session;
pub mod store;
pub mod timer;

/// Alarm messages for timed events of a session
///
/// The session hands these to the host's scheduling function together with
/// a delay; the host passes them back to [`game::Game::receive_alarm`] once
/// the delay elapsed. Each alarm carries the epoch it was scheduled in and is
/// ignored if the session has moved on since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One second of the question countdown elapsed
    Tick {
        /// Timer epoch at scheduling time
        epoch: u64,
    },
    /// The reveal delay after an answer elapsed
    Reveal {
        /// Slide epoch at scheduling time
        epoch: u64,
    },
    /// The feedback slide should continue on its own
    AutoAdvance {
        /// Slide epoch at scheduling time
        epoch: u64,
    },
}
