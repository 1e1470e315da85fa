use std::io::Read;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use geo::Point;
use itertools::Itertools;
use log::warn;
use serde::de::DeserializeOwned;

use super::raw_types::{FeedCongestion, FeedSegment};
use crate::SegmentId;
use crate::model::{CongestionRecord, CongestionState, TrafficSegment};

const CONGESTION_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parses the traffic segment feed: comma delimited, one header row.
///
/// Malformed rows are logged and skipped; they never abort the whole feed.
pub fn parse_segments<R: Read>(reader: R) -> Vec<TrafficSegment> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    parse_rows(reader, "traffic segment", |raw: FeedSegment| {
        let id = parse_id(&raw.id)?;
        let coordinates = parse_coordinates(&raw.coordinates)?;
        Ok(TrafficSegment {
            id,
            description: raw.description.trim().to_string(),
            coordinates,
        })
    })
}

/// Parses the congestion feed: `#` delimited, no header,
/// `id#date#current state#planned state`. Only the current state is kept.
pub fn parse_congestion<R: Read>(reader: R) -> Vec<CongestionRecord> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'#')
        .flexible(true)
        .from_reader(reader);

    parse_rows(reader, "congestion", |raw: FeedCongestion| {
        let segment = parse_id(&raw.id)?;
        let observed_at = NaiveDateTime::parse_from_str(raw.date.trim(), CONGESTION_DATE_FORMAT)
            .map_err(|e| format!("invalid date '{}': {e}", raw.date))?;
        let state = CongestionState::from_code(&raw.current_state)
            .ok_or_else(|| format!("unknown state code '{}'", raw.current_state))?;
        Ok(CongestionRecord {
            segment,
            observed_at,
            state,
        })
    })
}

fn parse_rows<R, T, O, F>(mut reader: csv::Reader<R>, kind: &str, convert: F) -> Vec<O>
where
    R: Read,
    T: DeserializeOwned,
    F: Fn(T) -> Result<O, String>,
{
    let mut skipped = 0usize;
    let parsed: Vec<O> = reader
        .records()
        .enumerate()
        .filter_map(|(row, record)| {
            let result = record
                .and_then(|record: StringRecord| record.deserialize::<T>(None))
                .map_err(|e| e.to_string())
                .and_then(&convert);
            match result {
                Ok(value) => Some(value),
                Err(reason) => {
                    skipped += 1;
                    warn!("Skipping {kind} row {}: {reason}", row + 1);
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {skipped} malformed {kind} rows");
    }
    parsed
}

fn parse_id(raw: &str) -> Result<SegmentId, String> {
    raw.trim()
        .parse::<SegmentId>()
        .map_err(|e| format!("invalid segment id '{raw}': {e}"))
}

/// Splits a flat `lon,lat,lon,lat,...` list into points
fn parse_coordinates(raw: &str) -> Result<Vec<Point<f64>>, String> {
    let values = raw
        .split(',')
        .map(|value| value.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{raw}': {e}"))?;

    if let Some(value) = values.iter().find(|value| !value.is_finite()) {
        return Err(format!("non-finite coordinate {value} in '{raw}'"));
    }
    if values.len() % 2 != 0 {
        return Err(format!("odd number of coordinate values ({})", values.len()));
    }

    let points: Vec<Point<f64>> = values
        .into_iter()
        .tuples()
        .map(|(lon, lat)| Point::new(lon, lat))
        .collect();

    if points.len() < 2 {
        return Err(format!("polyline has {} point(s), need at least 2", points.len()));
    }
    Ok(points)
}
