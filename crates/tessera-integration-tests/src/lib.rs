//! Integration test crate for the Tessera budget engine.
//!
//! This crate has no library code. Its tests drive budgets, schedules and
//! block production across `tessera-types`, `tessera-store` and
//! `tessera-budget` together.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tessera-integration-tests
//! ```
