//! Legacy flat-file transfer and roster views.

mod legacy;
mod roster;

pub use legacy::*;
pub use roster::*;
