//! Station catalog core for the Athens (OASA) transit network.
//!
//! Route files are GeoJSON feature collections, one per line direction. The
//! [`extract`] module pulls the station points out of each file, [`cluster`]
//! merges the points that describe the same physical stop, and [`catalog`]
//! wires the two together and answers the lookups the map and search screens
//! need.

pub mod catalog;
pub mod cluster;
pub mod error;
pub mod extract;
pub mod line;
pub mod location;
pub mod preferences;
pub mod station;
pub mod tools;

pub use catalog::{RouteSource, StationCatalog};
pub use cluster::{cluster_stations, recluster, ClusterConfig};
pub use extract::{extract_stations, try_extract_stations};
pub use line::{LineCatalog, LineCategory, LineInfo, LineRef};
pub use location::Location;
pub use station::{RawStationFeature, Station, StationRecord, Stations};
