//! Cloud Volumes ONTAP modifications
//!
//! Request payloads and local checks live in [`params`]; the submit-and-wait
//! sequences in [`workflows`].

pub mod params;
pub mod workflows;

pub use params::*;
pub use workflows::*;
