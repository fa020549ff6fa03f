pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notion;
pub mod rendering;
pub mod search;
pub mod api {
    pub mod blog;
    pub mod category;
    pub mod data;
    pub mod envelope;
    pub mod errors;
    pub mod extract;
    pub mod meta;
    pub mod search;
    pub mod upload;
}
pub mod storage {
    pub mod client;
}
