//! Station classification: which records become markers, and what they look like.
//!
//! The shape assignment is swapped between the two networks (Rahat AWS is a pin,
//! IMD AWS is a circle). The legend describes exactly this table.

use crate::types::{MarkerShape, MarkerSpec, RenderMode, Source, StationRecord, StationType};
use tracing::trace;

pub const CIRCLE_RADIUS: f64 = 8.0;
pub const CIRCLE_FILL_OPACITY: f64 = 0.7;

const CIRCLE: MarkerShape = MarkerShape::Circle {
    radius: CIRCLE_RADIUS,
    fill_opacity: CIRCLE_FILL_OPACITY,
};

#[derive(Debug, Clone, Copy)]
pub struct MarkerRule {
    pub source: Source,
    pub station_type: StationType,
    pub shape: MarkerShape,
}

/// Shape drawn for a station of `station_type` in `source`.
pub const fn shape_for(source: Source, station_type: StationType) -> MarkerShape {
    match (source, station_type) {
        (Source::Rahat, StationType::Aws) => MarkerShape::Pin,
        (Source::Rahat, StationType::Arg) => CIRCLE,
        (Source::Imd, StationType::Aws) => CIRCLE,
        (Source::Imd, StationType::Arg) => MarkerShape::Pin,
    }
}

const fn rule(source: Source, station_type: StationType) -> MarkerRule {
    MarkerRule {
        source,
        station_type,
        shape: shape_for(source, station_type),
    }
}

/// Every (source, type) pair in legend order.
pub static MARKER_RULES: [MarkerRule; 4] = [
    rule(Source::Rahat, StationType::Aws),
    rule(Source::Rahat, StationType::Arg),
    rule(Source::Imd, StationType::Aws),
    rule(Source::Imd, StationType::Arg),
];

/// Marker for one record and one network, or `None` when the record has no
/// usable coordinates for that network or an unrecognised type tag.
pub fn classify_and_emit(record: &StationRecord, source: Source) -> Option<MarkerSpec> {
    let (lat, lon) = record.position(source)?;

    let tag = record.type_tag(source);
    let Some(station_type) = StationType::from_tag(tag) else {
        trace!("Skipping {} record with type {:?}", source, tag);
        return None;
    };

    let (district, tehsil) = record.labels(source);

    Some(MarkerSpec {
        source,
        station_type,
        lat,
        lon,
        shape: shape_for(source, station_type),
        color: source.color(),
        popup: format!(
            "{source} ({station_type})\nLat: {lat:?}\nLong: {lon:?}\n\
             Station: {district}\nTehsil: {tehsil}"
        ),
    })
}

pub fn emit_markers(records: &[StationRecord], source: Source) -> Vec<MarkerSpec> {
    records
        .iter()
        .filter_map(|record| classify_and_emit(record, source))
        .collect()
}

/// Each network is evaluated independently; combined mode is the Rahat pass
/// followed by the IMD pass, with no deduplication.
pub fn markers_for_mode(records: &[StationRecord], mode: RenderMode) -> Vec<MarkerSpec> {
    mode.sources()
        .iter()
        .flat_map(|&source| emit_markers(records, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarkerColor;

    fn lucknow() -> StationRecord {
        StationRecord {
            lat1: Some(26.8),
            long1: Some(80.9),
            rahat: Some("AWS".into()),
            district: Some("Lucknow".into()),
            tehsil: Some("Sadar".into()),
            lat2: Some(27.0),
            long2: Some(81.0),
            imd: Some("ARG".into()),
            imd_district: Some("Lucknow".into()),
            imd_station: Some("Amausi".into()),
        }
    }

    fn count(markers: &[MarkerSpec], source: Source) -> usize {
        markers.iter().filter(|m| m.source == source).count()
    }

    #[test]
    fn test_rahat_aws_is_red_pin() {
        let marker = classify_and_emit(&lucknow(), Source::Rahat).unwrap();

        assert_eq!(marker.shape, MarkerShape::Pin);
        assert_eq!(marker.color, MarkerColor::Red);
        assert_eq!((marker.lat, marker.lon), (26.8, 80.9));
        for needle in ["AWS", "26.8", "80.9", "Lucknow", "Sadar"] {
            assert!(
                marker.popup.contains(needle),
                "popup missing {needle}: {}",
                marker.popup
            );
        }
        assert_eq!(
            marker.popup,
            "Rahat (AWS)\nLat: 26.8\nLong: 80.9\nStation: Lucknow\nTehsil: Sadar"
        );
    }

    #[test]
    fn test_rahat_arg_is_red_circle() {
        let record = StationRecord {
            rahat: Some("ARG".into()),
            ..lucknow()
        };
        let marker = classify_and_emit(&record, Source::Rahat).unwrap();

        assert_eq!(
            marker.shape,
            MarkerShape::Circle {
                radius: 8.0,
                fill_opacity: 0.7
            }
        );
        assert_eq!(marker.color, MarkerColor::Red);
    }

    #[test]
    fn test_imd_arg_is_blue_pin() {
        let marker = classify_and_emit(&lucknow(), Source::Imd).unwrap();

        assert_eq!(marker.shape, MarkerShape::Pin);
        assert_eq!(marker.color, MarkerColor::Blue);
        assert_eq!((marker.lat, marker.lon), (27.0, 81.0));
        assert_eq!(
            marker.popup,
            "IMD (ARG)\nLat: 27.0\nLong: 81.0\nStation: Lucknow\nTehsil: Amausi"
        );
    }

    #[test]
    fn test_imd_aws_is_blue_circle() {
        let record = StationRecord {
            imd: Some("AWS".into()),
            ..lucknow()
        };
        let marker = classify_and_emit(&record, Source::Imd).unwrap();

        assert!(matches!(marker.shape, MarkerShape::Circle { .. }));
        assert_eq!(marker.color, MarkerColor::Blue);
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let tags = [None, Some("Unknown"), Some("aws"), Some(" AWS"), Some("RG"), Some("")];
        for tag in tags {
            let record = StationRecord {
                rahat: tag.map(String::from),
                ..lucknow()
            };
            assert!(classify_and_emit(&record, Source::Rahat).is_none(), "{tag:?}");
        }
    }

    #[test]
    fn test_missing_imd_coordinate_never_plots() {
        let record = StationRecord {
            long2: None,
            ..lucknow()
        };
        for mode in RenderMode::ALL {
            assert_eq!(count(&markers_for_mode(&[record.clone()], mode), Source::Imd), 0);
        }
        // the Rahat half of the same row is unaffected
        assert_eq!(markers_for_mode(&[record], RenderMode::Combined).len(), 1);
    }

    #[test]
    fn test_mode_selects_networks() {
        let records = vec![lucknow()];

        let rahat = markers_for_mode(&records, RenderMode::Rahat);
        assert_eq!((count(&rahat, Source::Rahat), count(&rahat, Source::Imd)), (1, 0));

        let imd = markers_for_mode(&records, RenderMode::Imd);
        assert_eq!((count(&imd, Source::Rahat), count(&imd, Source::Imd)), (0, 1));
    }

    #[test]
    fn test_combined_is_sum_without_dedup() {
        let records = vec![
            lucknow(),
            lucknow(),
            StationRecord {
                rahat: Some("ARG".into()),
                imd: Some("Unknown".into()),
                ..lucknow()
            },
            StationRecord {
                lat1: None,
                imd: Some("AWS".into()),
                ..lucknow()
            },
            StationRecord::default(),
        ];

        let rahat = markers_for_mode(&records, RenderMode::Rahat).len();
        let imd = markers_for_mode(&records, RenderMode::Imd).len();
        let combined = markers_for_mode(&records, RenderMode::Combined);

        assert_eq!((rahat, imd), (3, 3));
        assert_eq!(combined.len(), rahat + imd);
        // Rahat pass first, then IMD
        assert_eq!(combined[0].source, Source::Rahat);
        assert_eq!(combined[combined.len() - 1].source, Source::Imd);
    }

    #[test]
    fn test_rule_table_matches_shape_for() {
        assert_eq!(MARKER_RULES.len(), 4);
        for rule in &MARKER_RULES {
            assert_eq!(rule.shape, shape_for(rule.source, rule.station_type));
        }
        assert_eq!(shape_for(Source::Rahat, StationType::Aws), MarkerShape::Pin);
        assert_eq!(shape_for(Source::Imd, StationType::Aws), CIRCLE);
    }
}
