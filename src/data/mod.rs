pub mod loader;
pub mod sample;
pub mod schema;
pub mod writer;
