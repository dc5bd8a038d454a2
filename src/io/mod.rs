mod geojson;
mod shp;
mod staged;

use std::fmt;
use std::path::Path;

use geo::MultiPolygon;
use tracing::warn;

use crate::error::{PolisError, Result};
use geojson::GeoJsonSink;
use shp::ShapefileSink;
use staged::StagedOutput;

pub use geojson::{geometry_to_json, parse_geometry};
pub use shp::{geo_to_shp, shp_to_geo};

/// Vector file formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    Shapefile,
    GeoJson,
}

impl VectorFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("shp") => Ok(Self::Shapefile),
            Some("geojson" | "json") => Ok(Self::GeoJson),
            _ => Err(PolisError::UnsupportedFormat { path: path.to_path_buf() }),
        }
    }
}

/// A record's geometry exactly as it was read, kept for writing back out.
pub enum RawGeometry {
    Shape(shapefile::Shape),
    GeoJson(serde_json::Value),
}

impl fmt::Debug for RawGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(shape) => write!(f, "Shape({shape})"),
            Self::GeoJson(value) => f.debug_tuple("GeoJson").field(value).finish(),
        }
    }
}

/// One input record: its original geometry and, when polygonal, its `geo` conversion.
#[derive(Debug)]
pub struct Feature {
    pub geometry: RawGeometry,
    pub polygons: Option<MultiPolygon<f64>>,
}

/// Stream the features of `path` to `f` in batches of at most `batch_size`,
/// in file order. Returns the number of features read.
pub fn for_each_batch(
    path: &Path,
    batch_size: usize,
    f: impl FnMut(Vec<Feature>) -> Result<()>,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    match VectorFormat::from_path(path)? {
        VectorFormat::Shapefile => shp::read_batches(path, batch_size, f),
        VectorFormat::GeoJson => geojson::read_batches(path, batch_size, f),
    }
}

/// Read every feature of `path`.
pub fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let mut features = Vec::new();
    for_each_batch(path, 4096, |batch| {
        features.extend(batch);
        Ok(())
    })?;
    Ok(features)
}

enum Sink {
    Shapefile(ShapefileSink),
    GeoJson(GeoJsonSink),
}

/// FeatureWriter writes scored features to a staged output, published atomically by `finish`.
pub struct FeatureWriter {
    sink: Sink,
    staged: StagedOutput,
    written: usize,
    skipped: usize,
}

impl FeatureWriter {
    /// Create a writer for `path`, choosing the format from its extension.
    /// `precision` is the number of decimals kept for the `polis` attribute.
    pub fn create(path: &Path, precision: u8) -> Result<Self> {
        let format = VectorFormat::from_path(path)?;
        let staged = StagedOutput::new(path)?;
        let sink = match format {
            VectorFormat::Shapefile => Sink::Shapefile(ShapefileSink::create(&staged.path(), precision)?),
            VectorFormat::GeoJson => Sink::GeoJson(GeoJsonSink::create(&staged.path(), precision)?),
        };
        Ok(Self { sink, staged, written: 0, skipped: 0 })
    }

    /// Write one feature with its score (`None` for records that could not be scored).
    pub fn write(&mut self, feature: &Feature, polis: Option<f64>) -> Result<()> {
        let written = match &mut self.sink {
            Sink::Shapefile(sink) => sink.write(feature, polis)?,
            Sink::GeoJson(sink) => sink.write(feature, polis)?,
        };
        if written {
            self.written += 1;
        } else {
            warn!(record = self.written + self.skipped, "record has no polygon geometry; omitted from output");
            self.skipped += 1;
        }
        Ok(())
    }

    /// Number of records that could not be represented in the output format.
    #[inline] pub fn skipped(&self) -> usize { self.skipped }

    /// Close the output and move it into place. Returns the number of records written.
    pub fn finish(self) -> Result<usize> {
        match self.sink {
            Sink::Shapefile(sink) => sink.finish()?,
            Sink::GeoJson(sink) => sink.finish()?,
        }
        self.staged.commit()?;
        Ok(self.written)
    }
}

/// Round to `precision` decimal places.
#[inline]
pub(crate) fn round_to(value: f64, precision: u8) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use geo::{polygon, MultiPolygon};
    use serde_json::json;

    use super::{geo_to_shp, read_features, round_to, Feature, FeatureWriter, RawGeometry, VectorFormat};
    use crate::PolisError;

    #[test]
    fn format_from_extension() {
        assert_eq!(VectorFormat::from_path(Path::new("a/b.shp")).unwrap(), VectorFormat::Shapefile);
        assert_eq!(VectorFormat::from_path(Path::new("b.SHP")).unwrap(), VectorFormat::Shapefile);
        assert_eq!(VectorFormat::from_path(Path::new("b.geojson")).unwrap(), VectorFormat::GeoJson);
        assert_eq!(VectorFormat::from_path(Path::new("b.json")).unwrap(), VectorFormat::GeoJson);
        assert!(matches!(
            VectorFormat::from_path(Path::new("b.gpkg")),
            Err(PolisError::UnsupportedFormat { .. })
        ));
        assert!(VectorFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(0.123456, 2), 0.12);
        assert_eq!(round_to(0.125001, 2), 0.13);
        assert_eq!(round_to(3.0, 0), 3.0);
    }

    #[test]
    fn features_format_for_debugging() {
        let square = MultiPolygon(vec![polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.)]]);
        let shape = Feature {
            geometry: RawGeometry::Shape(shapefile::Shape::Polygon(geo_to_shp(&square))),
            polygons: Some(square),
        };
        assert!(format!("{shape:?}").contains("Shape("));

        let json = Feature { geometry: RawGeometry::GeoJson(json!({ "type": "Point" })), polygons: None };
        let text = format!("{json:?}");
        assert!(text.contains("GeoJson"));
        assert!(text.contains("polygons: None"));
    }

    #[test]
    fn shapefile_writer_skips_records_without_polygons() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.shp");
        let square = MultiPolygon(vec![polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.)]]);

        let mut writer = FeatureWriter::create(&path, 2).unwrap();
        let point = Feature { geometry: RawGeometry::GeoJson(json!({ "type": "Point", "coordinates": [0, 0] })), polygons: None };
        let polygon = Feature { geometry: RawGeometry::GeoJson(json!(null)), polygons: Some(square) };
        writer.write(&polygon, Some(0.5)).unwrap();
        writer.write(&point, None).unwrap();
        writer.write(&polygon, None).unwrap();
        assert_eq!(writer.skipped(), 1);
        assert_eq!(writer.finish().unwrap(), 2);

        let features = read_features(&path).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f.polygons.is_some()));
    }
}
