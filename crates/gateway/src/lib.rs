pub mod codec;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;
