#![allow(dead_code)]

pub mod engine;
pub mod fixtures;

pub use engine::{FailingEngine, MockEngine, row};
pub use fixtures::*;
