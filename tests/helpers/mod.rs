// ==========================================
// Shared integration test helpers
// ==========================================

#![allow(dead_code)]

pub mod test_data_builder;

pub use test_data_builder::*;
