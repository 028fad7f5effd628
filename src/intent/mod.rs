//! Intent classification
//!
//! Maps an utterance plus the current conversation context to the catalog
//! template it most likely refers to.

pub mod classifier;

pub use classifier::{IntentClassifier, IntentResult};
