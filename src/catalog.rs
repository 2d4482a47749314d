use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, JsonValue};
use kdtree::{distance::squared_euclidean, KdTree};
use rayon::prelude::*;

use crate::cluster::{cluster_stations, ClusterConfig};
use crate::error::{CatalogError, Result};
use crate::extract::extract_stations;
use crate::line::{LineCatalog, LineRef};
use crate::location::{Location, METERS_PER_DEGREE};
use crate::station::{RawStationFeature, Station, StationRecord, Stations};

/// Raw contents of one route file along with the line it belongs to
#[derive(Debug, Clone)]
pub struct RouteSource {
    pub line: LineRef,
    pub path: Option<PathBuf>,
    pub content: String,
}

impl RouteSource {
    pub fn new(line: LineRef, content: String) -> Self {
        RouteSource {
            line,
            path: None,
            content,
        }
    }

    pub fn from_path(line: LineRef, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(RouteSource {
            line,
            path: Some(path.to_path_buf()),
            content,
        })
    }

    pub fn extract(&self) -> Vec<RawStationFeature> {
        let stations = extract_stations(
            &self.content,
            &self.line.line_number,
            self.line.category.as_str(),
        );
        tracing::debug!(
            line = %self.line,
            path = ?self.path,
            "extracted {} station points",
            stations.len()
        );
        stations
    }
}

/// The merged station set of the whole network, with the lookups the map and
/// search screens need
pub struct StationCatalog {
    stations: Vec<Station>,
    by_id: HashMap<String, usize>,
    index: KdTree<f64, usize, [f64; 2]>,
}

impl StationCatalog {
    /// Extracts every route file, in parallel, then clusters the combined points once
    pub fn build(sources: &[RouteSource], config: &ClusterConfig) -> Self {
        let raw = sources
            .par_iter()
            .map(RouteSource::extract)
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        let stations = cluster_stations(&raw, config);
        tracing::info!(
            "built station catalog: {} route files, {} station points, {} stations",
            sources.len(),
            raw.len(),
            stations.len()
        );

        StationCatalog::from_stations(stations)
    }

    /// Reads every route file the line catalog lists, relative to `root`.
    /// Files that cannot be read are logged and left out.
    pub fn load(lines: &LineCatalog, root: &Path, config: &ClusterConfig) -> Self {
        let routes = lines
            .lines()
            .iter()
            .flat_map(|l| l.routes.iter().map(move |r| (l.line_ref(), root.join(r))))
            .collect::<Vec<_>>();

        let sources = routes
            .into_par_iter()
            .filter_map(|(line, path)| match RouteSource::from_path(line, &path) {
                Ok(source) => Some(source),
                Err(err) => {
                    tracing::warn!("skipping route file: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();

        StationCatalog::build(&sources, config)
    }

    pub fn from_stations(stations: Vec<Station>) -> Self {
        let mut by_id = HashMap::with_capacity(stations.len());
        let mut index = KdTree::new(2);
        for (i, station) in stations.iter().enumerate() {
            by_id.entry(station.id.clone()).or_insert(i);
            if let Err(err) = index.add([station.latitude, station.longitude], i) {
                tracing::warn!("station {} has unusable coordinates: {err:?}", station.id);
            }
        }

        StationCatalog {
            stations,
            by_id,
            index,
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn find_station(&self, station_id: &str) -> Option<&Station> {
        self.by_id.get(station_id).map(|i| &self.stations[*i])
    }

    pub fn lines_at(&self, station_id: &str) -> Option<&BTreeSet<LineRef>> {
        self.find_station(station_id).map(|s| &s.lines)
    }

    pub fn stations_for_line(&self, line: &LineRef) -> Vec<&Station> {
        self.stations.iter().filter(|s| s.serves(line)).collect()
    }

    /// Case and accent insensitive substring match on the local and english names
    pub fn search(&self, query: &str) -> Vec<&Station> {
        let query = fold(query.trim());
        if query.is_empty() {
            return vec![];
        }

        self.stations
            .iter()
            .filter(|s| {
                fold(&s.name).contains(&query)
                    || s.name_en.as_deref().map(fold).map_or(false, |n| n.contains(&query))
            })
            .collect()
    }

    /// The `count` closest stations, nearest first
    pub fn nearest(&self, location: &Location, count: usize) -> Vec<&Station> {
        if count == 0 || self.stations.is_empty() {
            return vec![];
        }

        // Degree space distorts east-west distances, so the tree's k nearest only
        // bound the search: anything closer on the ground lies inside the radius
        // of the farthest of them, widened for the shorter longitude degrees
        let point = [location.latitude, location.longitude];
        let k = count.min(self.stations.len());
        let Ok(found) = self.index.nearest(&point, k, &squared_euclidean) else {
            return vec![];
        };
        let reach = found
            .iter()
            .map(|(_, &i)| location.distance(&self.stations[i].location()))
            .fold(0.0, f64::max);

        let lat_degrees = reach / METERS_PER_DEGREE * 1.01;
        let narrowest = (location.latitude.abs() + lat_degrees).min(89.9).to_radians().cos();
        let radius = lat_degrees / narrowest;

        let Ok(candidates) = self.index.within(&point, radius * radius, &squared_euclidean) else {
            return vec![];
        };

        let mut ranked = candidates
            .into_iter()
            .map(|(_, &i)| (location.distance(&self.stations[i].location()), &self.stations[i]))
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        ranked.into_iter().take(count).map(|(_, s)| s).collect()
    }

    /// Stations within `meters` of the location, nearest first
    pub fn within(&self, location: &Location, meters: f64) -> Vec<&Station> {
        let mut found = self
            .stations
            .iter()
            .map(|s| (location.distance(&s.location()), s))
            .filter(|(d, _)| *d <= meters)
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));

        found.into_iter().map(|(_, s)| s).collect()
    }

    /// Map layer features, each tagged with the display colors of the lines it serves
    pub fn feature_collection(&self, lines: &LineCatalog) -> FeatureCollection {
        let features = self
            .stations
            .iter()
            .map(|s| {
                let mut feature: Feature = s.as_feature();
                let colors = s
                    .lines
                    .iter()
                    .filter_map(|l| lines.color_for(l))
                    .map(JsonValue::from)
                    .collect::<Vec<_>>();
                if let Some(properties) = feature.properties.as_mut() {
                    properties.insert("colors".to_string(), JsonValue::Array(colors));
                }
                feature
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl Into<Stations> for StationCatalog {
    fn into(self) -> Stations {
        Stations::from_stations(self.stations)
    }
}

impl Into<FeatureCollection> for StationCatalog {
    fn into(self) -> FeatureCollection {
        let stations: Stations = self.into();
        stations.into()
    }
}

/// Lowercases and strips accents so "Σύνταγμα", "ΣΥΝΤΑΓΜΑ" and "συνταγμα" compare equal
fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ά' => 'α',
            'έ' => 'ε',
            'ή' => 'η',
            'ί' | 'ϊ' | 'ΐ' => 'ι',
            'ό' => 'ο',
            'ύ' | 'ϋ' | 'ΰ' => 'υ',
            'ώ' => 'ω',
            'ς' => 'σ',
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            c => c,
        })
        .collect()
}
