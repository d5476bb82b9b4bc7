//! Raw libusb transfer submission and completion-callback plumbing.
//!
//! Built directly on `libusb1-sys` rather than the high-level `rusb` crate:
//! `rusb`'s safe surface only exposes synchronous, blocking transfers, and
//! the submit/resubmit-from-completion-callback discipline this bridge
//! needs has no synchronous equivalent.

pub mod session;
pub mod transfer;

pub use session::UsbSession;
