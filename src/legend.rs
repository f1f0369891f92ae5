use crate::classify::MARKER_RULES;
use crate::types::{MarkerColor, MarkerShape, Source, StationType};

/// One line of the map legend, derived from the marker rules so that the
/// text always matches what is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub color: MarkerColor,
    pub shape: MarkerShape,
    pub source: Source,
    pub station_type: StationType,
}

impl LegendEntry {
    pub fn title(&self) -> String {
        let color = match self.color {
            MarkerColor::Red => "Red",
            MarkerColor::Blue => "Blue",
        };
        let shape = match self.shape {
            MarkerShape::Pin => "Markers",
            MarkerShape::Circle { .. } => "Circles",
        };
        format!("{color} {shape}")
    }

    pub fn description(&self) -> String {
        let shown_as = match self.shape {
            MarkerShape::Pin => "markers",
            MarkerShape::Circle { .. } => "circles",
        };
        format!(
            "{source} {kind} ({source} data with '{kind}' type, displayed as {shown_as})",
            source = self.source,
            kind = self.station_type,
        )
    }
}

pub fn legend_entries() -> Vec<LegendEntry> {
    MARKER_RULES
        .iter()
        .map(|rule| LegendEntry {
            color: rule.source.color(),
            shape: rule.shape,
            source: rule.source,
            station_type: rule.station_type,
        })
        .collect()
}

pub fn legend_markdown() -> String {
    let mut out = String::from("### Legend\n");
    for entry in legend_entries() {
        out.push_str(&format!("- **{}**: {}\n", entry.title(), entry.description()));
    }
    out
}

pub fn legend_html() -> String {
    let mut out = String::from("<h3>Legend</h3>\n<ul class=\"legend\">\n");
    for entry in legend_entries() {
        let swatch = match entry.shape {
            MarkerShape::Pin => "pin",
            MarkerShape::Circle { .. } => "circle",
        };
        out.push_str(&format!(
            "  <li><span class=\"swatch {swatch}\" style=\"background:{color}\"></span><strong>{title}</strong>: {desc}</li>\n",
            color = entry.color.as_str(),
            title = entry.title(),
            desc = entry.description(),
        ));
    }
    out.push_str("</ul>\n");
    out
}
