//! Test module for integration and determinism tests.
//!
//! - **Integration tests**: full episodes through the controller
//! - **Determinism tests**: same scene and actions give the same results
//! - **Helper functions**: scene and environment factories
//!
//! # Test Structure
//!
//! - `integration.rs`: end-to-end episode scenarios
//! - `determinism.rs`: replay and parallel-batch determinism
//! - `helpers.rs`: test setup utilities

mod helpers;
