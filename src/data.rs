use crate::config::InputConfig;
use crate::types::{BoundaryFeature, StationRecord};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use once_cell::sync::OnceCell;
use shapefile::Reader;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Both input files, parsed.
#[derive(Debug)]
pub struct Dataset {
    pub stations: Vec<StationRecord>,
    pub boundaries: Vec<BoundaryFeature>,
}

/// Loads the dataset on first use and hands out the same copy afterwards.
/// A failed load is not cached, so the next call tries again.
pub struct DataCache {
    input: InputConfig,
    cell: OnceCell<Arc<Dataset>>,
}

impl DataCache {
    pub fn new(input: InputConfig) -> Self {
        Self {
            input,
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<Dataset>> {
        self.cell
            .get_or_try_init(|| load_data(&self.input).map(Arc::new))
            .map(Arc::clone)
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

pub fn load_data(input: &InputConfig) -> Result<Dataset> {
    let stations = load_stations(&input.stations_csv)?;
    info!("Loaded {} station records", stations.len());

    let boundaries = load_boundaries(&input.boundaries, &input.district_column)?;
    info!("Loaded {} boundary features", boundaries.len());

    Ok(Dataset { stations, boundaries })
}

pub fn load_stations(path: &Path) -> Result<Vec<StationRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);

    let mut stations = Vec::new();
    for (row, result) in rdr.deserialize::<StationRecord>().enumerate() {
        let record = result
            .with_context(|| format!("Malformed CSV row {} in {:?}", row + 1, path))?;
        stations.push(record);
    }

    Ok(stations)
}

pub fn load_boundaries(path: &Path, name_column: &str) -> Result<Vec<BoundaryFeature>> {
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension: {:?}", path))?;

    match extension.as_str() {
        "shp" => load_shapefile(path, name_column),
        "json" | "geojson" => load_geojson(path, name_column),
        _ => Err(anyhow!("Unsupported geometry format: {}", extension)),
    }
}

fn load_shapefile(path: &Path, name_column: &str) -> Result<Vec<BoundaryFeature>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut features = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = match record.get(name_column) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.trim().to_string(),
            _ => String::new(),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // boundaries only
        };

        features.push(BoundaryFeature { name, geometry });
    }

    Ok(features)
}

fn load_geojson(path: &Path, name_column: &str) -> Result<Vec<BoundaryFeature>> {
    use geojson::GeoJson;
    use std::io::BufReader;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for feature in collection.features {
        let name = match feature.properties.as_ref().and_then(|props| props.get(name_column)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geom: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        features.push(BoundaryFeature { name, geometry });
    }

    Ok(features)
}
