//! corpusdb - chunked access to large annotated corpora
//!
//! Resolves logical chunk indices to physical file locations, coordinates
//! the lifecycle of loaded corpus segments, and maps, highlights and
//! rasterizes the markables that annotations attach to.

pub mod access;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod highlight;
pub mod index;
pub mod mapping;
pub mod observability;
pub mod raster;
pub mod segment;
