use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tools::serde::line_number_from_str_or_int;

/// Transit mode of a line. Unknown categories are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineCategory {
    Bus,
    Trolley,
    Metro,
    Tram,
    Suburban,
    Other(String),
}

impl LineCategory {
    pub fn as_str(&self) -> &str {
        match self {
            LineCategory::Bus => "bus",
            LineCategory::Trolley => "trolley",
            LineCategory::Metro => "metro",
            LineCategory::Tram => "tram",
            LineCategory::Suburban => "suburban",
            LineCategory::Other(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for LineCategory {
    fn from(raw: &str) -> Self {
        match raw {
            "bus" => LineCategory::Bus,
            "trolley" => LineCategory::Trolley,
            "metro" => LineCategory::Metro,
            "tram" => LineCategory::Tram,
            "suburban" => LineCategory::Suburban,
            other => LineCategory::Other(other.to_string()),
        }
    }
}

impl From<String> for LineCategory {
    fn from(raw: String) -> Self {
        LineCategory::from(raw.as_str())
    }
}

impl From<LineCategory> for String {
    fn from(category: LineCategory) -> Self {
        category.as_str().to_string()
    }
}

impl Display for LineCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (line number, category) pair, the unit of line membership for a station
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineRef {
    #[serde(rename = "line", deserialize_with = "line_number_from_str_or_int")]
    pub line_number: String,
    pub category: LineCategory,
}

impl LineRef {
    pub fn new(line_number: &str, category: impl Into<LineCategory>) -> Self {
        Self {
            line_number: line_number.to_string(),
            category: category.into(),
        }
    }
}

impl Display for LineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.line_number, self.category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInfo {
    #[serde(deserialize_with = "line_number_from_str_or_int")]
    pub number: String,
    pub category: LineCategory,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    /// Display color as `#RRGGBB`
    #[serde(default)]
    pub color: Option<String>,
    /// Route file paths, one per direction
    #[serde(default)]
    pub routes: Vec<String>,
}

impl LineInfo {
    pub fn line_ref(&self) -> LineRef {
        LineRef {
            line_number: self.number.clone(),
            category: self.category.clone(),
        }
    }
}

#[derive(Deserialize)]
struct LineCatalogFile {
    lines: Vec<LineInfo>,
}

/// Immutable lookup table of every known line and its display metadata.
///
/// Built once by the caller and handed by reference to whatever needs line
/// colors or route files.
#[derive(Debug, Clone, Default)]
pub struct LineCatalog {
    lines: Vec<LineInfo>,
    index: HashMap<LineRef, usize>,
}

impl LineCatalog {
    pub fn new(lines: Vec<LineInfo>) -> Self {
        let mut index = HashMap::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            // First definition wins on duplicates
            index.entry(line.line_ref()).or_insert(i);
        }

        LineCatalog { lines, index }
    }

    /// Parses a `{"lines": [...]}` document
    pub fn from_json(data: &str) -> Result<Self> {
        let file: LineCatalogFile = serde_json::from_str(data)?;
        Ok(LineCatalog::new(file.lines))
    }

    pub fn lines(&self) -> &[LineInfo] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn find_line(&self, line: &LineRef) -> Option<&LineInfo> {
        self.index.get(line).map(|i| &self.lines[*i])
    }

    pub fn color_for(&self, line: &LineRef) -> Option<&str> {
        self.find_line(line).and_then(|l| l.color.as_deref())
    }

    pub fn lines_in_category<'a>(
        &'a self,
        category: &'a LineCategory,
    ) -> impl Iterator<Item = &'a LineInfo> + 'a {
        self.lines.iter().filter(move |l| &l.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = r##"{
        "lines": [
            {"number": 2, "category": "metro", "name": "Ανθούπολη - Ελληνικό", "color": "#E2231A", "routes": ["metro/2.geojson"]},
            {"number": "3", "category": "metro", "name": "Δουκίσσης Πλακεντίας - Αεροδρόμιο", "color": "#0066B3"},
            {"number": "040", "category": "bus", "name": "Πειραιάς - Σύνταγμα"},
            {"number": "X1", "category": "ferry", "name": "Unknown"}
        ]
    }"##;

    #[test]
    fn test_category_passthrough() {
        assert_eq!(LineCategory::from("metro"), LineCategory::Metro);
        assert_eq!(LineCategory::from("Metro"), LineCategory::Other("Metro".into()));
        assert_eq!(LineCategory::from("ferry").to_string(), "ferry");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = LineCatalog::from_json(LINES).unwrap();
        assert_eq!(catalog.len(), 4);

        let line_2 = LineRef::new("2", "metro");
        assert_eq!(catalog.color_for(&line_2), Some("#E2231A"));
        assert_eq!(catalog.find_line(&line_2).unwrap().routes.len(), 1);

        let bus = LineRef::new("040", "bus");
        assert!(catalog.find_line(&bus).is_some());
        assert_eq!(catalog.color_for(&bus), None);

        assert!(catalog.find_line(&LineRef::new("2", "bus")).is_none());
        assert_eq!(catalog.lines_in_category(&LineCategory::Metro).count(), 2);
        assert_eq!(
            catalog
                .lines_in_category(&LineCategory::Other("ferry".into()))
                .count(),
            1
        );
    }

    #[test]
    fn test_catalog_invalid() {
        assert!(LineCatalog::from_json("{\"lines\": 4}").is_err());
        assert!(LineCatalog::from_json("not json").is_err());
    }
}
