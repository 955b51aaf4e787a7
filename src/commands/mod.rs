//! Command orchestrators

pub mod push;

pub use push::{PushCommand, PushRequest};
