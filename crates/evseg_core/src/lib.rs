pub mod aggregate;
pub mod assemble;
pub mod chunking;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod segment;
