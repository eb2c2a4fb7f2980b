//! Pixel-signature matching and rule evaluation for window automation.
//!
//! Frames captured from a window are scanned for known color sequences
//! ([`scanner::scan`] over a [`index::SignatureIndex`]); the matches become
//! signals ([`readout`], [`signals::SignalStore`]) that per-rule loops
//! ([`evaluator::RuleEvaluator`]) turn into key presses, serialized through
//! the [`gate::ActionGate`]. [`session::Session`] wires it together.

pub mod dump;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod index;
pub mod logger;
pub mod platform;
pub mod readout;
pub mod rule;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod signals;
pub mod signature;
pub mod sleep;
pub mod task;
pub mod types;
