pub mod blocks;
pub mod markdown;
pub mod meta;
