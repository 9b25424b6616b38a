// Library exports for the binary, integration tests and embedding applications

pub mod app_data;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod coordinators;
pub mod errors;
pub mod providers;
pub mod stores;
pub mod types;
pub mod worker;

#[cfg(test)]
pub mod test;
