pub mod cache;
pub mod filter;
pub mod models;
pub mod tree;
