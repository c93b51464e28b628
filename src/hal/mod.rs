//! Concrete implementations of the traits in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: recording test doubles for the link and the display
//! - `console`: a [`VentDisplay`](crate::traits::VentDisplay) that renders
//!   through `tracing`, used by the headless daemon

pub mod console;
pub mod mock;

pub use console::*;
pub use mock::*;
