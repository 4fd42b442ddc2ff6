pub mod common;

mod fetcher_tests;
mod pipeline_tests;
