//! Scratcher: crawls a torrent index and enriches every movie with metadata
//! from OMDb, FilmAffinity and IMDb before appending it to a JSON Lines file.

pub mod cli;
pub mod config;
pub mod models;
pub mod services;
