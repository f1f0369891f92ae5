use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the station table. Each network has its own coordinate pair,
/// type tag and label columns; any of them may be empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "Lat1", default, deserialize_with = "csv::invalid_option")]
    pub lat1: Option<f64>,
    #[serde(rename = "Long1", default, deserialize_with = "csv::invalid_option")]
    pub long1: Option<f64>,
    #[serde(rename = "Rahat", default)]
    pub rahat: Option<String>,
    #[serde(rename = "District", default)]
    pub district: Option<String>,
    #[serde(rename = "Tehsil", default)]
    pub tehsil: Option<String>,

    #[serde(rename = "Lat2", default, deserialize_with = "csv::invalid_option")]
    pub lat2: Option<f64>,
    #[serde(rename = "Long2", default, deserialize_with = "csv::invalid_option")]
    pub long2: Option<f64>,
    #[serde(rename = "IMD", default)]
    pub imd: Option<String>,
    #[serde(rename = "DISTRICT-Name", default)]
    pub imd_district: Option<String>,
    #[serde(rename = "Station-Name", default)]
    pub imd_station: Option<String>,
}

impl StationRecord {
    /// Coordinates for `source`, or `None` when either half is missing or not finite.
    pub fn position(&self, source: Source) -> Option<(f64, f64)> {
        let (lat, lon) = match source {
            Source::Rahat => (self.lat1, self.long1),
            Source::Imd => (self.lat2, self.long2),
        };
        match (lat, lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn type_tag(&self, source: Source) -> &str {
        let tag = match source {
            Source::Rahat => self.rahat.as_deref(),
            Source::Imd => self.imd.as_deref(),
        };
        tag.unwrap_or("Unknown")
    }

    /// (district, tehsil) labels shown in the popup.
    pub fn labels(&self, source: Source) -> (&str, &str) {
        let (district, tehsil) = match source {
            Source::Rahat => (&self.district, &self.tehsil),
            Source::Imd => (&self.imd_district, &self.imd_station),
        };
        (
            district.as_deref().unwrap_or(""),
            tehsil.as_deref().unwrap_or(""),
        )
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    Rahat,
    #[serde(rename = "IMD")]
    Imd,
}

impl Source {
    pub fn color(self) -> MarkerColor {
        match self {
            Source::Rahat => MarkerColor::Red,
            Source::Imd => MarkerColor::Blue,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Rahat => f.write_str("Rahat"),
            Source::Imd => f.write_str("IMD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StationType {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "ARG")]
    Arg,
}

impl StationType {
    /// Exact, case-sensitive match. Anything else is not plotted.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AWS" => Some(StationType::Aws),
            "ARG" => Some(StationType::Arg),
            _ => None,
        }
    }
}

impl fmt::Display for StationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationType::Aws => f.write_str("AWS"),
            StationType::Arg => f.write_str("ARG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Blue,
}

impl MarkerColor {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Blue => "blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerShape {
    Pin,
    Circle { radius: f64, fill_opacity: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub source: Source,
    pub station_type: StationType,
    pub lat: f64,
    pub lon: f64,
    pub shape: MarkerShape,
    pub color: MarkerColor,
    pub popup: String,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Rahat,
    Imd,
    Combined,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Rahat, RenderMode::Imd, RenderMode::Combined];

    pub fn sources(self) -> &'static [Source] {
        match self {
            RenderMode::Rahat => &[Source::Rahat],
            RenderMode::Imd => &[Source::Imd],
            RenderMode::Combined => &[Source::Rahat, Source::Imd],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderMode::Rahat => "Rahat",
            RenderMode::Imd => "IMD",
            RenderMode::Combined => "Combined",
        }
    }

    pub fn query_value(self) -> &'static str {
        match self {
            RenderMode::Rahat => "rahat",
            RenderMode::Imd => "imd",
            RenderMode::Combined => "combined",
        }
    }
}
