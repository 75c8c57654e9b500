//! Integration tests

mod adapter_tests;
