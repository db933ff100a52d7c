//! Core identity test suite
//!
//! Property tests over the key encodings and end-to-end runs against a real
//! env file.

mod property_tests;

// Test helpers and fixtures
pub mod helpers;
