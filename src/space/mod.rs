//! Kekspace: the container a set of documents lives in.
//!
//! A space is created once per storage root and loaded by every chain
//! operation for its identity salt. Owner and contributor contacts are
//! carried for display only.

mod contact;
mod errors;
mod kekspace;

pub use contact::Contact;
pub use errors::{SpaceError, SpaceResult};
pub use kekspace::{Kekspace, SpaceConfig};
