//! Notion as a headless CMS: wire types, HTTP client, row normalization
//! and field mapping.

pub mod client;
pub mod fields;
pub mod models;
pub mod transform;
