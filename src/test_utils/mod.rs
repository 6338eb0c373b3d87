//! Test utilities shared by use case and route tests.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations for mocking persistence
//! - Builders for constructing a `FeatureGate` or `AppState` over those mocks

mod app_state_builder;
mod factories;
mod subscription_mocks;
mod usage_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use subscription_mocks::*;
pub use usage_mocks::*;
