//! # svcd sample
//!
//! The example services and the demo entry point, exposed as a library for integration
//! testing.

pub mod error;
pub mod example_service;
pub mod lifecycle;

pub use error::SampleError;
pub use example_service::{ExampleService, SomeEvent, EX_SOME_EVENT};
pub use lifecycle::{run_example, run_example_with, ExampleRun, ExampleSystem};
