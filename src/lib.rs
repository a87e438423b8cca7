// Library surface for the binary and for headless integration tests.
// Presentation lives in the binary.
pub mod catalog;
pub mod config;
pub mod controller;
pub mod history;
pub mod metrics;
pub mod passage;
pub mod quote;
pub mod runtime;
pub mod selection;
pub mod session;
pub mod source;
pub mod text_stats;
pub mod util;
