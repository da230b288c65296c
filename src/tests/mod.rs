//! # Report Pipeline Test Suite
//!
//! Scenario tests that drive the whole report through an in-memory transport,
//! plus the shared [`stub::StubTransport`] used by module unit tests.


mod pipeline_tests;
