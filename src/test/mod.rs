// Test utilities module
// Only compiled when running tests

pub mod utils;
