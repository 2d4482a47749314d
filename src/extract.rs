use geojson::{feature::Id, Feature, JsonObject, JsonValue, Value};

use crate::error::ExtractError;
use crate::line::LineRef;
use crate::station::RawStationFeature;

const STATION_TYPE: &str = "Station";
const CROSSING_MARKERS: [&str; 2] = ["railway_crossing", "crossing"];
const ENGLISH_NAME_KEYS: [&str; 2] = ["int_name", "name:en"];

/// Extracts the station points of one route file. Documents that cannot be read
/// are logged and yield no stations so the caller can move on to the next file.
pub fn extract_stations(raw_data: &str, line_number: &str, category: &str) -> Vec<RawStationFeature> {
    match try_extract_stations(raw_data, line_number, category) {
        Ok(stations) => stations,
        Err(err) => {
            tracing::warn!(
                line = line_number,
                category = category,
                "skipping route document: {err}"
            );
            vec![]
        }
    }
}

pub fn try_extract_stations(
    raw_data: &str,
    line_number: &str,
    category: &str,
) -> Result<Vec<RawStationFeature>, ExtractError> {
    let document: JsonValue = serde_json::from_str(raw_data)?;
    let features = document
        .get("features")
        .and_then(JsonValue::as_array)
        .ok_or(ExtractError::MissingFeatures)?;

    let line = LineRef::new(line_number, category);

    let stations = features
        .iter()
        .filter_map(|value| Feature::from_json_value(value.clone()).ok())
        .filter_map(|feature| station_from_feature(&feature, &line))
        .collect::<Vec<_>>();

    Ok(stations)
}

fn station_from_feature(feature: &Feature, line: &LineRef) -> Option<RawStationFeature> {
    let properties = feature.properties.as_ref()?;

    if string_property(properties, "type") != Some(STATION_TYPE) {
        return None;
    }

    if let Some(railway) = string_property(properties, "railway") {
        if CROSSING_MARKERS.contains(&railway) {
            return None;
        }
    }

    let name = string_property(properties, "name").filter(|n| !n.is_empty())?;

    let Value::Point(coordinates) = &feature.geometry.as_ref()?.value else {
        return None;
    };
    let [longitude, latitude] = coordinates.as_slice() else {
        return None;
    };

    let name_en = ENGLISH_NAME_KEYS
        .iter()
        .filter_map(|key| string_property(properties, key))
        .find(|n| !n.is_empty())
        .map(str::to_string);

    let id = feature_id(feature, properties)
        .unwrap_or_else(|| synthesized_id(name, line, *latitude, *longitude));

    Some(RawStationFeature {
        id,
        name: name.to_string(),
        name_en,
        latitude: *latitude,
        longitude: *longitude,
        line: line.clone(),
    })
}

fn string_property<'a>(properties: &'a JsonObject, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(JsonValue::as_str)
}

/// The `@id` property first, then the GeoJSON feature id member
fn feature_id(feature: &Feature, properties: &JsonObject) -> Option<String> {
    let from_property = match properties.get("@id") {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    from_property.or_else(|| match &feature.id {
        Some(Id::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Id::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Fallback identity for features without an upstream id. The position is part
/// of the key so that same-named stops at different places never share an id.
fn synthesized_id(name: &str, line: &LineRef, latitude: f64, longitude: f64) -> String {
    format!(
        "{}/{}/{}@{:.5},{:.5}",
        line.line_number, line.category, name, latitude, longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(features: Vec<JsonValue>) -> String {
        json!({
            "type": "FeatureCollection",
            "features": features,
        })
        .to_string()
    }

    fn point(properties: JsonValue, coordinates: JsonValue) -> JsonValue {
        json!({
            "type": "Feature",
            "properties": properties,
            "geometry": {"type": "Point", "coordinates": coordinates},
        })
    }

    #[test]
    fn test_syntagma_station() {
        let raw = collection(vec![point(
            json!({"type": "Station", "name": "Syntagma"}),
            json!([23.7275, 37.9838]),
        )]);

        let stations = extract_stations(&raw, "2", "metro");
        assert_eq!(stations.len(), 1);

        let syntagma = &stations[0];
        assert_eq!(syntagma.name, "Syntagma");
        assert_eq!(syntagma.latitude, 37.9838);
        assert_eq!(syntagma.longitude, 23.7275);
        assert_eq!(syntagma.line, LineRef::new("2", "metro"));
        assert_eq!(syntagma.name_en, None);
        assert!(!syntagma.id.is_empty());
    }

    #[test]
    fn test_crossings_excluded() {
        for marker in ["railway_crossing", "crossing"] {
            let raw = collection(vec![point(
                json!({"type": "Station", "name": "X", "railway": marker}),
                json!([23.0, 38.0]),
            )]);
            assert!(extract_stations(&raw, "1", "suburban").is_empty());
        }

        let raw = collection(vec![point(
            json!({"type": "Station", "name": "X", "railway": "station"}),
            json!([23.0, 38.0]),
        )]);
        assert_eq!(extract_stations(&raw, "1", "suburban").len(), 1);
    }

    #[test]
    fn test_feature_filters() {
        let raw = collection(vec![
            point(json!({"type": "Platform", "name": "A"}), json!([23.0, 38.0])),
            point(json!({"type": "station", "name": "B"}), json!([23.0, 38.0])),
            point(json!({"type": "Station"}), json!([23.0, 38.0])),
            point(json!({"type": "Station", "name": ""}), json!([23.0, 38.0])),
            point(json!({"type": "Station", "name": 5}), json!([23.0, 38.0])),
            point(json!({"type": "Station", "name": "C"}), json!([23.0, 38.0, 100.0])),
            json!({
                "type": "Feature",
                "properties": {"type": "Station", "name": "D"},
                "geometry": {"type": "LineString", "coordinates": [[23.0, 38.0], [23.1, 38.1]]},
            }),
            json!({
                "type": "Feature",
                "properties": {"type": "Station", "name": "E"},
                "geometry": null,
            }),
            json!({"not": "a feature"}),
            point(json!({"type": "Station", "name": "F"}), json!([23.5, 38.5])),
        ]);

        let stations = extract_stations(&raw, "B1", "bus");
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "F");
    }

    #[test]
    fn test_document_order_preserved() {
        let raw = collection(
            ["Kifisia", "Marousi", "Irini"]
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    point(
                        json!({"type": "Station", "name": name}),
                        json!([23.8 - i as f64 * 0.01, 38.07]),
                    )
                })
                .collect(),
        );

        let names = extract_stations(&raw, "1", "metro")
            .into_iter()
            .map(|s| s.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Kifisia", "Marousi", "Irini"]);
    }

    #[test]
    fn test_english_name_order() {
        let raw = collection(vec![
            point(
                json!({"type": "Station", "name": "Σύνταγμα", "int_name": "Syntagma", "name:en": "Syntagma Square"}),
                json!([23.7348, 37.9755]),
            ),
            point(
                json!({"type": "Station", "name": "Ομόνοια", "int_name": "", "name:en": "Omonia"}),
                json!([23.7283, 37.9841]),
            ),
        ]);

        let stations = extract_stations(&raw, "2", "metro");
        assert_eq!(stations[0].name_en.as_deref(), Some("Syntagma"));
        assert_eq!(stations[1].name_en.as_deref(), Some("Omonia"));
    }

    #[test]
    fn test_identifiers() {
        let raw = collection(vec![
            point(
                json!({"type": "Station", "name": "A", "@id": "node/123"}),
                json!([23.0, 38.0]),
            ),
            point(
                json!({"type": "Station", "name": "B", "@id": 456}),
                json!([23.0, 38.0]),
            ),
            json!({
                "type": "Feature",
                "id": "feature-7",
                "properties": {"type": "Station", "name": "C"},
                "geometry": {"type": "Point", "coordinates": [23.0, 38.0]},
            }),
            point(json!({"type": "Station", "name": "D"}), json!([23.1, 38.1])),
            point(json!({"type": "Station", "name": "D"}), json!([23.2, 38.2])),
        ]);

        let stations = extract_stations(&raw, "10", "tram");
        assert_eq!(stations[0].id, "node/123");
        assert_eq!(stations[1].id, "456");
        assert_eq!(stations[2].id, "feature-7");
        assert_ne!(stations[3].id, stations[4].id);
        assert_eq!(stations[3].id, "10/tram/D@38.10000,23.10000");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(extract_stations("{ not json", "1", "bus").is_empty());
        assert!(extract_stations("{\"type\": \"FeatureCollection\"}", "1", "bus").is_empty());
        assert!(extract_stations("{\"features\": {}}", "1", "bus").is_empty());

        assert!(matches!(
            try_extract_stations("[1, 2", "1", "bus"),
            Err(ExtractError::Json(_))
        ));
        assert!(matches!(
            try_extract_stations("{\"features\": 3}", "1", "bus"),
            Err(ExtractError::MissingFeatures)
        ));
    }

    #[test]
    fn test_unknown_category_passthrough() {
        let raw = collection(vec![point(
            json!({"type": "Station", "name": "Piraeus"}),
            json!([23.643, 37.948]),
        )]);

        let stations = extract_stations(&raw, "P1", "ferry");
        assert_eq!(stations[0].line.category.to_string(), "ferry");
    }
}
