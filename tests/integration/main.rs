// tests/integration/main.rs
#[path = "../common/mod.rs"]
mod common;

mod api_tests;
mod gating_tests;
mod pipeline_tests;
mod recognition_tests;
