//! Trait seams between the control core and its external collaborators.
//!
//! The control core never talks to a broker or a screen directly. It goes
//! through these two traits, which lets the same services run against rumqttc
//! in the daemon and against the mocks in [`crate::hal`] in tests.
//!
//! | Trait | Collaborator |
//! |-------|--------------|
//! | [`MessagingLink`] | Publish/subscribe link to the remote peer |
//! | [`VentDisplay`] | Whatever renders readings for the operator |

pub mod display;
pub mod network;

pub use display::*;
pub use network::*;
