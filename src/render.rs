use crate::classify::emit_markers;
use crate::config::MapConfig;
use crate::data::Dataset;
use crate::legend::legend_html;
use crate::types::{BoundaryFeature, MarkerSpec, RenderMode};
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

const LEAFLET_ASSETS: &str = r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css"/>
<link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css"/>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css"/>
<script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>"#;

// `__MAP_DATA__` and `__MAP_ID__` are substituted before output.
const MAP_SCRIPT: &str = r#"<script>
(function () {
  const data = __MAP_DATA__;
  const map = L.map("__MAP_ID__").setView(data.center, data.zoom);
  L.tileLayer(data.tiles.url, { attribution: data.tiles.attribution, maxZoom: 19 }).addTo(map);

  const overlays = {};
  if (data.boundary) {
    const boundary = L.geoJSON(data.boundary.geojson, {
      style: function () { return data.boundary.style; },
      onEachFeature: function (feature, layer) {
        if (feature.properties && feature.properties.district) {
          layer.bindTooltip(feature.properties.district);
        }
      }
    }).addTo(map);
    overlays[data.boundary.name] = boundary;
  }

  data.layers.forEach(function (group) {
    const layer = L.featureGroup();
    group.markers.forEach(function (m) {
      let marker;
      if (m.shape.kind === "circle") {
        marker = L.circleMarker([m.lat, m.lon], {
          radius: m.shape.radius,
          color: m.color,
          fill: true,
          fillColor: m.color,
          fillOpacity: m.shape.fill_opacity
        });
      } else {
        marker = L.marker([m.lat, m.lon], {
          icon: L.AwesomeMarkers.icon({
            icon: "info-sign",
            markerColor: m.color,
            prefix: "glyphicon"
          })
        });
      }
      const popup = document.createElement("div");
      popup.style.whiteSpace = "pre-line";
      popup.textContent = m.popup;
      marker.bindPopup(popup);
      marker.addTo(layer);
    });
    layer.addTo(map);
    overlays[group.name] = layer;
  });

  L.control.layers(null, overlays).addTo(map);
  window.stationMap = map;
})();
</script>"#;

#[derive(Debug, Clone, Serialize)]
pub struct BoundaryStyle {
    #[serde(rename = "fillColor")]
    pub fill_color: &'static str,
    pub color: &'static str,
    pub weight: f64,
    #[serde(rename = "fillOpacity")]
    pub fill_opacity: f64,
}

pub const BOUNDARY_STYLE: BoundaryStyle = BoundaryStyle {
    fill_color: "white",
    color: "black",
    weight: 0.5,
    fill_opacity: 0.1,
};

#[derive(Debug, Clone, Serialize)]
pub struct BoundaryLayer {
    pub name: String,
    pub style: BoundaryStyle,
    pub geojson: FeatureCollection,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerLayer {
    pub name: String,
    pub markers: Vec<MarkerSpec>,
}

#[derive(Debug, Clone, Serialize)]
struct TileLayer {
    url: String,
    attribution: String,
}

#[derive(Serialize)]
struct MapData<'a> {
    center: [f64; 2],
    zoom: u8,
    tiles: TileLayer,
    boundary: Option<&'a BoundaryLayer>,
    layers: &'a [MarkerLayer],
}

/// Everything drawn on one map: base view, district outlines and marker layers.
#[derive(Debug, Clone)]
pub struct MapCanvas {
    pub view: MapConfig,
    pub boundary: Option<BoundaryLayer>,
    pub layers: Vec<MarkerLayer>,
}

impl MapCanvas {
    pub fn new(view: MapConfig) -> Self {
        Self {
            view,
            boundary: None,
            layers: Vec::new(),
        }
    }

    pub fn add_boundaries(&mut self, boundaries: &[BoundaryFeature]) {
        let features = boundaries
            .iter()
            .map(|b| {
                let mut properties = serde_json::Map::new();
                properties.insert("district".to_string(), b.name.clone().into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&b.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        self.boundary = Some(BoundaryLayer {
            name: self.view.boundary_layer_name.clone(),
            style: BOUNDARY_STYLE,
            geojson: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
        });
    }

    pub fn add_markers(&mut self, name: impl Into<String>, markers: Vec<MarkerSpec>) {
        self.layers.push(MarkerLayer {
            name: name.into(),
            markers,
        });
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.layers.iter().flat_map(|l| l.markers.iter())
    }

    pub fn marker_count(&self) -> usize {
        self.markers().count()
    }

    /// The map as an embeddable `<div>` plus script, bound to `element_id`.
    pub fn map_fragment(&self, element_id: &str, style: &str) -> Result<String> {
        let (url, attribution) = self.view.tile_layer();
        let data = MapData {
            center: self.view.center,
            zoom: self.view.zoom,
            tiles: TileLayer { url, attribution },
            boundary: self.boundary.as_ref(),
            layers: &self.layers,
        };
        let json = serde_json::to_string(&data).context("Failed to serialize map data")?;
        // keep string contents from closing the script element
        let json = json.replace("</", "<\\/");

        let script = MAP_SCRIPT
            .replace("__MAP_DATA__", &json)
            .replace("__MAP_ID__", element_id);

        Ok(format!("<div id=\"{element_id}\" style=\"{style}\"></div>\n{script}"))
    }

    /// Self-contained HTML document with only the map, filling the window.
    pub fn to_html(&self) -> Result<String> {
        let fragment = self.map_fragment(
            "map",
            "position:absolute;top:0;bottom:0;left:0;right:0;",
        )?;
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\"/>\n\
             <title>{title}</title>\n{LEAFLET_ASSETS}\n\
             <style>html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>\n\
             </head>\n<body>\n{fragment}\n</body>\n</html>\n",
            title = escape_html(&self.view.title),
        ))
    }

    /// Writes the standalone document and returns the exact text written.
    pub fn save(&self, path: &Path) -> Result<String> {
        let html = self.to_html()?;
        fs::write(path, &html).with_context(|| format!("Failed to write map to {:?}", path))?;
        info!("Saved map with {} markers to {:?}", self.marker_count(), path);
        Ok(html)
    }
}

pub fn build_canvas(view: &MapConfig, dataset: &Dataset, mode: RenderMode) -> MapCanvas {
    let mut canvas = MapCanvas::new(view.clone());
    canvas.add_boundaries(&dataset.boundaries);
    for &source in mode.sources() {
        canvas.add_markers(source.to_string(), emit_markers(&dataset.stations, source));
    }
    canvas
}

/// The interactive page: mode selector, map, legend, export button and the
/// click report.
pub fn render_page(canvas: &MapCanvas, mode: RenderMode) -> Result<String> {
    let view = &canvas.view;
    let fragment = canvas.map_fragment(
        "map",
        &format!("width:{}px;height:{}px;", view.width, view.height),
    )?;

    let options: String = RenderMode::ALL
        .iter()
        .map(|m| {
            let checked = if *m == mode { " checked" } else { "" };
            format!(
                "<label><input type=\"radio\" name=\"mode\" value=\"{}\" \
                 onchange=\"this.form.submit()\"{checked}/> {}</label>\n",
                m.query_value(),
                m.label(),
            )
        })
        .collect();

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<title>{title}</title>
{LEAFLET_ASSETS}
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.legend {{ list-style: none; padding: 0; }}
.swatch {{ display: inline-block; width: 12px; height: 12px; margin-right: 6px; }}
.swatch.circle {{ border-radius: 50%; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>This app visualizes station data on the Uttar Pradesh map.</p>
<form method="get" action="/">
<p>Select data to display:</p>
{options}</form>
{fragment}
<p id="interaction"></p>
{legend}
<form method="get" action="/export">
<input type="hidden" name="mode" value="{mode_value}"/>
<button type="submit">Download Map as HTML</button>
</form>
<script>
window.stationMap.on("click", function (e) {{
  fetch("/api/interaction", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify({{ lat: e.latlng.lat, lng: e.latlng.lng }})
  }})
    .then(function (r) {{ return r.json(); }})
    .then(function (report) {{
      document.getElementById("interaction").textContent =
        "Last clicked: " + report.last_clicked.lat.toFixed(4) + ", " +
        report.last_clicked.lng.toFixed(4) +
        (report.district ? " (" + report.district + ")" : "");
    }});
}});
</script>
</body>
</html>
"#,
        title = escape_html(&view.title),
        legend = legend_html(),
        mode_value = mode.query_value(),
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarkerColor, MarkerShape, Source, StationRecord};
    use geo::polygon;
    use geo::MultiPolygon;
    use tempfile::TempDir;

    fn dataset(stations: Vec<StationRecord>) -> Dataset {
        let lucknow = polygon![
            (x: 80.5, y: 26.5),
            (x: 81.5, y: 26.5),
            (x: 81.5, y: 27.5),
            (x: 80.5, y: 27.5),
        ];
        Dataset {
            stations,
            boundaries: vec![BoundaryFeature {
                name: "Lucknow".to_string(),
                geometry: MultiPolygon::new(vec![lucknow]),
            }],
        }
    }

    fn lucknow_station() -> StationRecord {
        StationRecord {
            lat1: Some(26.8),
            long1: Some(80.9),
            rahat: Some("AWS".into()),
            district: Some("Lucknow".into()),
            tehsil: Some("Sadar".into()),
            lat2: Some(27.0),
            long2: Some(81.0),
            imd: Some("ARG".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_canvas_layers_per_mode() {
        let data = dataset(vec![lucknow_station()]);
        let view = MapConfig::default();

        let rahat = build_canvas(&view, &data, RenderMode::Rahat);
        assert_eq!(rahat.layers.len(), 1);
        assert_eq!(rahat.layers[0].name, "Rahat");
        let pin = rahat.markers().next().unwrap();
        assert_eq!(
            (pin.lat, pin.lon, pin.shape, pin.color),
            (26.8, 80.9, MarkerShape::Pin, MarkerColor::Red)
        );

        let imd = build_canvas(&view, &data, RenderMode::Imd);
        let pin = imd.markers().next().unwrap();
        assert_eq!(pin.source, Source::Imd);
        assert_eq!(
            (pin.lat, pin.lon, pin.shape, pin.color),
            (27.0, 81.0, MarkerShape::Pin, MarkerColor::Blue)
        );

        let combined = build_canvas(&view, &data, RenderMode::Combined);
        assert_eq!(combined.marker_count(), rahat.marker_count() + imd.marker_count());
    }

    #[test]
    fn test_boundary_layer_style() {
        let canvas = build_canvas(&MapConfig::default(), &dataset(vec![]), RenderMode::Rahat);
        let boundary = canvas.boundary.as_ref().unwrap();

        assert_eq!(boundary.name, "Uttar Pradesh Districts");
        assert_eq!(boundary.geojson.features.len(), 1);
        let json = serde_json::to_value(&boundary.style).unwrap();
        assert_eq!(json["fillColor"], "white");
        assert_eq!(json["color"], "black");
        assert_eq!(json["weight"], 0.5);
        assert_eq!(json["fillOpacity"], 0.1);
    }

    #[test]
    fn test_export_without_markers_keeps_boundaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uttar_pradesh_map.html");
        let canvas = build_canvas(&MapConfig::default(), &dataset(vec![]), RenderMode::Combined);
        assert_eq!(canvas.marker_count(), 0);

        let written = canvas.save(&path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, html);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("Uttar Pradesh Districts"));
        assert!(html.contains("\"FeatureCollection\""));
        assert!(html.contains("\"Lucknow\""));
        assert!(!html.contains("__MAP_DATA__"));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("map.html");
        let canvas = MapCanvas::new(MapConfig::default());

        assert!(canvas.save(&path).is_err());
    }

    #[test]
    fn test_popup_cannot_close_script() {
        let station = StationRecord {
            district: Some("</script><b>".into()),
            ..lucknow_station()
        };
        let data = dataset(vec![station]);
        let canvas = build_canvas(&MapConfig::default(), &data, RenderMode::Rahat);
        let html = canvas.to_html().unwrap();

        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<\\/script><b>"));
    }

    #[test]
    fn test_page_has_selector_legend_and_export() {
        let data = dataset(vec![lucknow_station()]);
        let canvas = build_canvas(&MapConfig::default(), &data, RenderMode::Imd);
        let page = render_page(&canvas, RenderMode::Imd).unwrap();

        assert!(page.contains("value=\"imd\" onchange=\"this.form.submit()\" checked"));
        assert!(page.contains("Download Map as HTML"));
        assert!(page.contains("<input type=\"hidden\" name=\"mode\" value=\"imd\"/>"));
        assert!(page.contains("Blue Markers"));
        assert!(page.contains("width:800px;height:600px;"));
    }
}
