//! Integration test suite.
//!
//! 1. Change computation and dispatch examples
//! 2. Record save lifecycle
//! 3. Concurrent dispatch and registration

pub mod concurrency_tests;
pub mod dispatch_tests;
pub mod helpers;
