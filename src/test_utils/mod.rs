//! Test utilities.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository and port implementations for mocking persistence
//!   and external services
//! - `TestAppStateBuilder` for HTTP-level tests

mod app_state_builder;
mod billing_mocks;
mod credits_mocks;
mod factories;
mod gallery_mocks;
mod image_mocks;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use credits_mocks::*;
pub use factories::*;
pub use gallery_mocks::*;
pub use image_mocks::*;
