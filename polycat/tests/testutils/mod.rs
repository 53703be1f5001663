//! Test utilities for PolyCat integration tests
//!
//! TestFixture wraps a catalog (in memory, or durable in a temporary
//! directory) with helpers for building tables and placements.

pub mod test_fixture;
