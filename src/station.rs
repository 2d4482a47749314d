use std::collections::BTreeSet;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::{Deserialize, Serialize};

use crate::line::LineRef;
use crate::location::Location;

pub trait StationRecord {
    fn id(&self) -> &str;
    fn location(&self) -> Location;
    fn name(&self) -> String;
    fn as_feature(&self) -> Feature;
}

/// One station point as found in a single route file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStationFeature {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub line: LineRef,
}

/// A physical stop, merged across every route that serves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub lines: BTreeSet<LineRef>,
}

impl Station {
    pub fn serves(&self, line: &LineRef) -> bool {
        self.lines.contains(line)
    }
}

impl From<RawStationFeature> for Station {
    fn from(raw: RawStationFeature) -> Self {
        Station {
            id: raw.id,
            name: raw.name,
            name_en: raw.name_en,
            latitude: raw.latitude,
            longitude: raw.longitude,
            lines: BTreeSet::from([raw.line]),
        }
    }
}

fn point_feature<'a>(
    location: &Location,
    id: &str,
    name: &str,
    name_en: Option<&str>,
    lines: impl Iterator<Item = &'a LineRef>,
) -> Feature {
    let geometry = Geometry::new(Value::Point(location.lnglat()));

    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), JsonValue::from(id));
    properties.insert("name".to_string(), JsonValue::from(name));
    if let Some(name_en) = name_en {
        properties.insert("name_en".to_string(), JsonValue::from(name_en));
    }
    let lines = lines
        .map(|l| serde_json::to_value(l).unwrap_or(JsonValue::Null))
        .collect::<Vec<JsonValue>>();
    properties.insert("lines".to_string(), JsonValue::Array(lines));

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

impl StationRecord for RawStationFeature {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.name.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_feature(&self) -> Feature {
        self.clone().into()
    }
}

impl Into<Feature> for RawStationFeature {
    fn into(self) -> Feature {
        point_feature(
            &self.location(),
            &self.id,
            &self.name,
            self.name_en.as_deref(),
            std::iter::once(&self.line),
        )
    }
}

impl StationRecord for Station {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.name.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_feature(&self) -> Feature {
        self.clone().into()
    }
}

impl Into<Feature> for Station {
    fn into(self) -> Feature {
        point_feature(
            &self.location(),
            &self.id,
            &self.name,
            self.name_en.as_deref(),
            self.lines.iter(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stations {
    pub stations: Vec<Station>,

    #[serde(rename = "count")]
    pub station_count: usize,
}

impl Stations {
    pub fn from_stations(stations: Vec<Station>) -> Self {
        let station_count = stations.len();
        Stations {
            stations,
            station_count,
        }
    }

    pub fn find_station(&self, station_id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == station_id)
    }
}

impl From<Vec<Station>> for Stations {
    fn from(stations: Vec<Station>) -> Self {
        Stations::from_stations(stations)
    }
}

impl Into<FeatureCollection> for Stations {
    fn into(self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self
                .stations
                .into_iter()
                .map(|s| s.into())
                .collect::<Vec<Feature>>(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_feature() {
        let station = Station {
            id: "node/1".into(),
            name: "Σύνταγμα".into(),
            name_en: Some("Syntagma".into()),
            latitude: 37.9755,
            longitude: 23.7348,
            lines: BTreeSet::from([LineRef::new("2", "metro"), LineRef::new("3", "metro")]),
        };

        let feature = station.as_feature();
        let Some(Value::Point(coords)) = feature.geometry.as_ref().map(|g| g.value.clone()) else {
            panic!("expected a point geometry");
        };
        assert_eq!(coords, vec![23.7348, 37.9755]);

        let properties = feature.properties.unwrap();
        assert_eq!(properties["name_en"], "Syntagma");
        assert_eq!(properties["lines"].as_array().unwrap().len(), 2);
        assert_eq!(properties["lines"][0]["line"], "2");
        assert_eq!(properties["lines"][0]["category"], "metro");
    }

    #[test]
    fn test_find_station() {
        let raw = RawStationFeature {
            id: "a".into(),
            name: "A".into(),
            name_en: None,
            latitude: 1.0,
            longitude: 2.0,
            line: LineRef::new("1", "tram"),
        };
        let stations = Stations::from_stations(vec![raw.into()]);

        assert_eq!(stations.station_count, 1);
        assert!(stations.find_station("a").is_some());
        assert!(stations.find_station("b").is_none());

        let collection: FeatureCollection = stations.into();
        assert_eq!(collection.features.len(), 1);
    }
}
