//! Channel layer: prompt detection and the interactive VTY stream.
//!
//! Output is accumulated in a [`PatternBuffer`] with escape sequences
//! stripped; a [`VtyProfile`] says what a prompt and a rejected command look
//! like for the device family.

mod buffer;
mod profile;
mod vty;

pub use buffer::PatternBuffer;
pub use profile::VtyProfile;
pub use vty::VtyChannel;
