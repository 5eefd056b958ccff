//! Depth inference.
//!
//! A `DepthBackend` turns a camera frame into a raw, unscaled depth map at the
//! frame's resolution. Backends are selected by name through the
//! `BackendRegistry`; the execution device is resolved once at startup and
//! handed to the backend constructor.

mod backend;
mod backends;
mod device;
mod preprocess;
mod registry;

pub use backend::DepthBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use device::ExecutionDevice;
pub use preprocess::{to_model_input, IMAGENET_MEAN, IMAGENET_STD};
pub use registry::BackendRegistry;
