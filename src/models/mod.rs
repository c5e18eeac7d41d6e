//! Data types shared by the crawler, the enrichment sources and the sink

pub mod field_map;
pub mod movie;

pub use field_map::FieldMap;
pub use movie::{DEFAULT_QUALITY, MovieRecord, TorrentInfo};
