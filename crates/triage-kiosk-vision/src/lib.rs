//! Vision boundary for the triage kiosk.
//!
//! The kiosk never implements face detection itself. This crate defines the
//! narrow interfaces it consumes from the outside world:
//!
//! - [`FrameSource`]: a camera that yields raster frames
//! - [`FaceDetector`]: locates faces and produces fixed-length embeddings
//! - [`DistanceMetric`]: compares two embeddings (smaller = more similar)
//!
//! plus the plain data types passed across it ([`Frame`], [`FaceBox`],
//! [`Detection`]) and scripted doubles for driving the kiosk without hardware.

pub mod detector;
pub mod distance;
pub mod frame;
pub mod scripted;

pub use detector::*;
pub use distance::*;
pub use frame::*;
pub use scripted::*;
