use std::collections::{hash_map::Entry, BTreeSet, HashMap};

use itertools::Itertools;
use kdtree::{distance::squared_euclidean, KdTree};
use serde::{Deserialize, Serialize};

use crate::line::LineRef;
use crate::location::Location;
use crate::station::{RawStationFeature, Station};

/// Roughly 11 meters at Athens' latitude
pub const DEFAULT_TOLERANCE_DEGREES: f64 = 0.0001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Maximum separation, in degrees on each axis independently, for two
    /// station points to count as the same physical stop
    #[serde(default = "default_tolerance")]
    pub tolerance_degrees: f64,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_DEGREES
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            tolerance_degrees: DEFAULT_TOLERANCE_DEGREES,
        }
    }
}

/// Running merge state. The representative fields always belong to the member
/// with the lowest input index.
#[derive(Debug, Clone)]
struct Cluster {
    first_index: usize,
    id: String,
    name: String,
    name_en: Option<String>,
    latitude_sum: f64,
    longitude_sum: f64,
    count: usize,
    lines: BTreeSet<LineRef>,
}

impl Cluster {
    fn centroid(&self) -> [f64; 2] {
        let n = self.count as f64;
        [self.latitude_sum / n, self.longitude_sum / n]
    }

    fn absorb(&mut self, other: Cluster) {
        if other.first_index < self.first_index {
            self.first_index = other.first_index;
            self.id = other.id;
            self.name = other.name;
            self.name_en = other.name_en;
        }
        self.latitude_sum += other.latitude_sum;
        self.longitude_sum += other.longitude_sum;
        self.count += other.count;
        self.lines.extend(other.lines);
    }
}

impl Into<Station> for Cluster {
    fn into(self) -> Station {
        let [latitude, longitude] = self.centroid();
        Station {
            id: self.id,
            name: self.name,
            name_en: self.name_en,
            latitude,
            longitude,
            lines: self.lines,
        }
    }
}

/// Merges raw station points from many route files into one record per physical
/// stop. Points sharing an id always merge; the remaining groups merge into a
/// seed when they sit within the configured tolerance of it.
pub fn cluster_stations(raw: &[RawStationFeature], config: &ClusterConfig) -> Vec<Station> {
    let clusters = raw
        .iter()
        .enumerate()
        .map(|(i, r)| Cluster {
            first_index: i,
            id: r.id.clone(),
            name: r.name.clone(),
            name_en: r.name_en.clone(),
            latitude_sum: r.latitude,
            longitude_sum: r.longitude,
            count: 1,
            lines: BTreeSet::from([r.line.clone()]),
        })
        .collect::<Vec<_>>();

    merge(clusters, config)
}

/// Runs an already merged station list through the clusterer again, each
/// station weighted as a single point
pub fn recluster(stations: Vec<Station>, config: &ClusterConfig) -> Vec<Station> {
    let clusters = stations
        .into_iter()
        .enumerate()
        .map(|(i, s)| Cluster {
            first_index: i,
            id: s.id,
            name: s.name,
            name_en: s.name_en,
            latitude_sum: s.latitude,
            longitude_sum: s.longitude,
            count: 1,
            lines: s.lines,
        })
        .collect::<Vec<_>>();

    merge(clusters, config)
}

fn merge(clusters: Vec<Cluster>, config: &ClusterConfig) -> Vec<Station> {
    let mut clusters = merge_by_id(clusters);

    // Merging moves centroids, so scan again until a pass merges nothing
    loop {
        let before = clusters.len();
        clusters = merge_nearby(clusters, config.tolerance_degrees);
        if clusters.len() == before {
            break;
        }
    }

    clusters.into_iter().map(|c| c.into()).collect()
}

fn merge_by_id(clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut by_id: HashMap<String, usize> = HashMap::with_capacity(clusters.len());
    let mut merged: Vec<Cluster> = Vec::with_capacity(clusters.len());

    for cluster in clusters {
        match by_id.get(&cluster.id) {
            Some(&i) => merged[i].absorb(cluster),
            None => {
                by_id.insert(cluster.id.clone(), merged.len());
                merged.push(cluster);
            }
        }
    }

    merged
}

/// One seed scan over the clusters. Seeds are visited in position order, and
/// each absorbs the still unassigned clusters inside its own tolerance box.
/// Returns the merged clusters ordered by first input index.
fn merge_nearby(clusters: Vec<Cluster>, tolerance: f64) -> Vec<Cluster> {
    let centroids = clusters.iter().map(Cluster::centroid).collect::<Vec<_>>();

    let seeds = (0..clusters.len())
        .sorted_by(|&a, &b| {
            centroids[a][0]
                .total_cmp(&centroids[b][0])
                .then(centroids[a][1].total_cmp(&centroids[b][1]))
                .then_with(|| clusters[a].id.cmp(&clusters[b].id))
        })
        .collect::<Vec<_>>();

    // The tree holds each distinct position once, identical centroids share an entry
    let mut kdtree = KdTree::new(2);
    let mut positions: Vec<Vec<usize>> = vec![];
    let mut by_position: HashMap<(u64, u64), usize> = HashMap::with_capacity(centroids.len());
    for (i, c) in centroids.iter().enumerate() {
        match by_position.entry((c[0].to_bits(), c[1].to_bits())) {
            Entry::Occupied(e) => positions[*e.get()].push(i),
            Entry::Vacant(e) => {
                let p = positions.len();
                e.insert(p);
                positions.push(vec![i]);
                if let Err(err) = kdtree.add(*c, p) {
                    tracing::debug!(
                        "station {} left out of the proximity index: {err:?}",
                        clusters[i].id
                    );
                }
            }
        }
    }

    // The box's corners lie at sqrt(2) * tolerance, query a circle that covers them
    let radius = 4.0 * tolerance * tolerance;
    let mut assigned = vec![false; clusters.len()];
    let mut groups: Vec<Vec<usize>> = vec![];

    for seed in seeds {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;

        let seed_location = location_of(&centroids[seed]);
        let mut members = vec![seed];
        let neighbours = kdtree
            .within(&centroids[seed], radius, &squared_euclidean)
            .unwrap_or_default();

        for (_, &p) in neighbours {
            for &j in &positions[p] {
                if !assigned[j] && seed_location.within_box(&location_of(&centroids[j]), tolerance) {
                    assigned[j] = true;
                    members.push(j);
                }
            }
        }

        groups.push(members);
    }

    let mut slots = clusters.into_iter().map(Some).collect::<Vec<_>>();

    groups
        .into_iter()
        .filter_map(|members| {
            members
                .into_iter()
                .filter_map(|i| slots[i].take())
                .reduce(|mut acc, c| {
                    acc.absorb(c);
                    acc
                })
        })
        .sorted_by_key(|c| c.first_index)
        .collect()
}

fn location_of(centroid: &[f64; 2]) -> Location {
    Location::new(centroid[0], centroid[1], String::new())
}
