//! Helpers for tests that need a real database. Enabled by the `test_utils` feature.
pub mod fixtures;
pub mod prepare_env;
