use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{PolisError, Result};
use crate::io::{round_to, Feature, RawGeometry};

/// Read a GeoJSON `FeatureCollection` (or a lone `Feature`) and hand its features out in batches.
pub(super) fn read_batches(
    path: &Path,
    batch_size: usize,
    mut f: impl FnMut(Vec<Feature>) -> Result<()>,
) -> Result<usize> {
    let bytes = fs::read(path).map_err(|e| PolisError::io(path, e))?;
    let mut value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| PolisError::format(path, format!("failed to parse GeoJSON: {e}")))?;

    let kind = value["type"].as_str().map(str::to_owned);
    let features = match kind.as_deref() {
        Some("FeatureCollection") => match value.get_mut("features").map(Value::take) {
            Some(Value::Array(features)) => features,
            _ => return Err(PolisError::format(path, "FeatureCollection has no features array")),
        },
        Some("Feature") => vec![value],
        other => return Err(PolisError::format(path, format!("expected a FeatureCollection, found {other:?}"))),
    };

    let total = features.len();
    let mut batch = Vec::with_capacity(batch_size.min(total));
    for (idx, mut feature) in features.into_iter().enumerate() {
        let geometry = feature.get_mut("geometry").map(Value::take).unwrap_or(Value::Null);
        let polygons = parse_geometry(&geometry)
            .map_err(|e| PolisError::format(path, format!("feature {idx}: {e}")))?;
        batch.push(Feature { geometry: RawGeometry::GeoJson(geometry), polygons });
        if batch.len() == batch_size {
            f(std::mem::take(&mut batch))?;
        }
    }
    if !batch.is_empty() { f(batch)?; }
    Ok(total)
}

/// Convert a GeoJSON geometry object to a MultiPolygon; `None` for null or non-polygonal geometries.
pub fn parse_geometry(geometry: &Value) -> Result<Option<MultiPolygon<f64>>, String> {
    if geometry.is_null() { return Ok(None) }
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(Some(MultiPolygon(vec![parse_polygon(coords)?]))),
        Some("MultiPolygon") => {
            let parts = coords.as_array()
                .ok_or("MultiPolygon coordinates must be an array")?;
            Ok(Some(MultiPolygon(parts.iter().map(parse_polygon).collect::<Result<_, _>>()?)))
        }
        Some(_) => Ok(None),
        None => Err("geometry has no type".to_owned()),
    }
}

/// Parse `[[exterior], [hole], ...]`.
fn parse_polygon(coords: &Value) -> Result<Polygon<f64>, String> {
    let rings = coords.as_array().ok_or("Polygon coordinates must be an array of rings")?;
    let Some((exterior, holes)) = rings.split_first() else {
        return Ok(Polygon::new(LineString::new(vec![]), vec![]));
    };
    Ok(Polygon::new(
        parse_ring(exterior)?,
        holes.iter().map(parse_ring).collect::<Result<_, _>>()?,
    ))
}

/// Parse `[[x, y], [x, y], ...]`. Extra ordinates (z, m) are ignored.
fn parse_ring(coords: &Value) -> Result<LineString<f64>, String> {
    let points = coords.as_array().ok_or("ring must be an array of positions")?;
    points.iter()
        .map(|position| match position.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(format!("invalid position {position}")),
            },
            _ => Err(format!("invalid position {position}")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString)
}

/// Write a MultiPolygon as a GeoJSON geometry object (a `Polygon` when it has one part).
pub fn geometry_to_json(mp: &MultiPolygon<f64>) -> Value {
    fn ring(ls: &LineString<f64>) -> Value {
        Value::Array(ls.coords().map(|c| json!([c.x, c.y])).collect())
    }
    fn polygon(p: &Polygon<f64>) -> Value {
        Value::Array(std::iter::once(p.exterior()).chain(p.interiors()).map(ring).collect())
    }

    match mp.0.as_slice() {
        [single] => json!({ "type": "Polygon", "coordinates": polygon(single) }),
        parts => json!({ "type": "MultiPolygon", "coordinates": parts.iter().map(polygon).collect::<Vec<_>>() }),
    }
}

/// Streaming `FeatureCollection` writer with a single `polis` property per feature.
pub(super) struct GeoJsonSink {
    path: PathBuf,
    out: BufWriter<File>,
    precision: u8,
    written: usize,
}

impl GeoJsonSink {
    pub(super) fn create(path: &Path, precision: u8) -> Result<Self> {
        let file = File::create(path).map_err(|e| PolisError::io(path, e))?;
        let mut sink = Self { path: path.to_path_buf(), out: BufWriter::new(file), precision, written: 0 };
        sink.put(br#"{"type":"FeatureCollection","features":["#)?;
        Ok(sink)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes).map_err(|e| PolisError::io(&self.path, e))
    }

    /// Write one feature. Non-polygonal geometries are kept as they were read.
    pub(super) fn write(&mut self, feature: &Feature, polis: Option<f64>) -> Result<bool> {
        let geometry = match (&feature.geometry, &feature.polygons) {
            (RawGeometry::GeoJson(value), _) => value.clone(),
            (RawGeometry::Shape(_), Some(mp)) => geometry_to_json(mp),
            (RawGeometry::Shape(_), None) => Value::Null,
        };
        let record = json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": { "polis": polis.map(|v| round_to(v, self.precision)) },
        });
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| PolisError::format(&self.path, format!("failed to encode feature: {e}")))?;

        if self.written > 0 { self.put(b",")? }
        self.put(&bytes)?;
        self.written += 1;
        Ok(true)
    }

    pub(super) fn finish(mut self) -> Result<()> {
        self.put(b"]}\n")?;
        self.out.flush().map_err(|e| PolisError::io(&self.path, e))?;
        if let Err(e) = self.out.get_ref().sync_all() {
            warn!("failed to sync {}: {e}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use serde_json::json;

    use super::{geometry_to_json, parse_geometry};

    #[test]
    fn parses_polygon_with_hole() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]],
                [[1, 1], [1, 2], [2, 2], [2, 1], [1, 1]]
            ]
        });
        let mp = parse_geometry(&geometry).unwrap().unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
        assert_eq!(mp.0[0].interiors().len(), 1);
    }

    #[test]
    fn closes_open_rings_and_ignores_z() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [[[[0, 0, 5], [1, 0, 5], [1, 1, 5]]], [[[3, 3], [4, 3], [4, 4]]]]
        });
        let mp = parse_geometry(&geometry).unwrap().unwrap();
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].exterior().0.len(), 4);
        assert_eq!(mp.0[0].exterior().0.first(), mp.0[0].exterior().0.last());
    }

    #[test]
    fn non_polygonal_and_null_geometries() {
        assert_eq!(parse_geometry(&json!(null)).unwrap(), None);
        assert_eq!(parse_geometry(&json!({ "type": "Point", "coordinates": [1, 2] })).unwrap(), None);
        assert!(parse_geometry(&json!({ "coordinates": [] })).is_err());
        assert!(parse_geometry(&json!({ "type": "Polygon", "coordinates": [[["a", 1]]] })).is_err());
    }

    #[test]
    fn writes_polygon_or_multipolygon() {
        let square = polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 1.)];
        let single = geometry_to_json(&MultiPolygon(vec![square.clone()]));
        assert_eq!(single["type"], "Polygon");
        assert_eq!(single["coordinates"][0].as_array().unwrap().len(), 5);
        assert_eq!(parse_geometry(&single).unwrap().unwrap(), MultiPolygon(vec![square.clone()]));

        let double = geometry_to_json(&MultiPolygon(vec![square.clone(), square]));
        assert_eq!(double["type"], "MultiPolygon");
        assert_eq!(double["coordinates"].as_array().unwrap().len(), 2);
    }
}
