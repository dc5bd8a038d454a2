use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{self as shp, PolygonRing, Shape};

use crate::error::{PolisError, Result};
use crate::io::{round_to, Feature, RawGeometry};

/// Stream shapes from a `.shp` file (with its `.shx`/`.dbf` sidecars) in batches.
pub(super) fn read_batches(
    path: &Path,
    batch_size: usize,
    mut f: impl FnMut(Vec<Feature>) -> Result<()>,
) -> Result<usize> {
    let mut reader = shp::Reader::from_path(path)
        .map_err(|e| PolisError::format(path, format!("failed to open shapefile: {e}")))?;

    let mut total = 0;
    let mut batch = Vec::with_capacity(batch_size);
    for result in reader.iter_shapes_and_records() {
        let (shape, _record) = result
            .map_err(|e| PolisError::format(path, format!("error reading record {total}: {e}")))?;
        batch.push(Feature { polygons: shp_to_geo(&shape), geometry: RawGeometry::Shape(shape) });
        total += 1;
        if batch.len() == batch_size {
            f(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)))?;
        }
    }
    if !batch.is_empty() { f(batch)?; }
    Ok(total)
}

/// Convert a polygonal shape to `geo::MultiPolygon<f64>`; `None` for any other shape.
/// M and Z values are dropped.
pub fn shp_to_geo(shape: &Shape) -> Option<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Some(rings_to_geo(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonM(p) => Some(rings_to_geo(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonZ(p) => Some(rings_to_geo(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        _ => None,
    }
}

/// Group rings as the reader reports them: each outer ring followed by its holes.
fn rings_to_geo<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiPolygon<f64> {
    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let ls = LineString(ring.points().iter().map(&xy).collect());
        match ring {
            PolygonRing::Outer(_) => {
                if let Some(ext) = current_exterior.take() {
                    polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
                }
                current_exterior = Some(ls);
            }
            // A hole with no preceding outer ring is promoted to an outer ring.
            PolygonRing::Inner(_) if current_exterior.is_none() => current_exterior = Some(ls),
            PolygonRing::Inner(_) => current_holes.push(ls),
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}

/// Convert geo::MultiPolygon<f64> to shapefile::Polygon
pub fn geo_to_shp(mp: &MultiPolygon<f64>) -> shp::Polygon {
    /// Signed area of a ring (positive when counter-clockwise)
    fn signed_area(pts: &[shp::Point]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    fn ring_points(ls: &LineString<f64>) -> Vec<shp::Point> {
        let mut pts = ls.coords().map(|c| shp::Point { x: c.x, y: c.y }).collect::<Vec<_>>();
        if let (Some(first), Some(last)) = (pts.first().copied(), pts.last()) {
            if first.x != last.x || first.y != last.y { pts.push(first) }
        }
        pts
    }

    // Shapefile ordering: [ext CW, hole CCW, hole CCW, ..., next ext CW, ...]
    let mut rings: Vec<PolygonRing<shp::Point>> = Vec::new();
    for poly in &mp.0 {
        let mut ext = ring_points(poly.exterior());
        if signed_area(&ext) > 0.0 { ext.reverse() }
        rings.push(PolygonRing::Outer(ext));

        for hole in poly.interiors() {
            let mut pts = ring_points(hole);
            if signed_area(&pts) < 0.0 { pts.reverse() }
            rings.push(PolygonRing::Inner(pts));
        }
    }

    shp::Polygon::with_rings(rings)
}

/// Polygon shapefile writer with a single numeric `polis` attribute.
pub(super) struct ShapefileSink {
    path: PathBuf,
    writer: shp::Writer<BufWriter<File>>,
    precision: u8,
}

impl ShapefileSink {
    pub(super) fn create(path: &Path, precision: u8) -> Result<Self> {
        let field = FieldName::try_from("polis")
            .map_err(|e| PolisError::format(path, format!("invalid field name: {e:?}")))?;
        let table = TableWriterBuilder::new().add_numeric_field(field, 15, precision);
        let writer = shp::Writer::from_path(path, table)
            .map_err(|e| PolisError::format(path, format!("failed to create shapefile: {e}")))?;
        Ok(Self { path: path.to_path_buf(), writer, precision })
    }

    /// Write one record. Returns `false` when the feature has no polygon to write.
    pub(super) fn write(&mut self, feature: &Feature, polis: Option<f64>) -> Result<bool> {
        let mut record = Record::default();
        record.insert("polis".to_owned(), FieldValue::Numeric(polis.map(|v| round_to(v, self.precision))));

        let written = match &feature.geometry {
            RawGeometry::Shape(Shape::Polygon(p)) => self.writer.write_shape_and_record(p, &record),
            RawGeometry::Shape(Shape::PolygonM(p)) => self.writer.write_shape_and_record(p, &record),
            RawGeometry::Shape(Shape::PolygonZ(p)) => self.writer.write_shape_and_record(p, &record),
            _ => match &feature.polygons {
                Some(mp) if !mp.0.is_empty() => self.writer.write_shape_and_record(&geo_to_shp(mp), &record),
                _ => return Ok(false),
            },
        };
        written.map_err(|e| PolisError::format(&self.path, format!("failed to write record: {e}")))?;
        Ok(true)
    }

    /// Flush headers and close the files.
    pub(super) fn finish(self) -> Result<()> {
        drop(self.writer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use shapefile::{self as shp, PolygonRing, Shape};

    use super::{geo_to_shp, shp_to_geo};

    fn pt(x: f64, y: f64) -> shp::Point { shp::Point { x, y } }

    #[test]
    fn outer_rings_group_their_holes() {
        let shape = Shape::Polygon(shp::Polygon::with_rings(vec![
            PolygonRing::Outer(vec![pt(0., 0.), pt(0., 4.), pt(4., 4.), pt(4., 0.), pt(0., 0.)]),
            PolygonRing::Inner(vec![pt(1., 1.), pt(2., 1.), pt(2., 2.), pt(1., 2.), pt(1., 1.)]),
            PolygonRing::Outer(vec![pt(10., 10.), pt(10., 11.), pt(11., 11.), pt(11., 10.), pt(10., 10.)]),
        ]));
        let mp = shp_to_geo(&shape).unwrap();
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(mp.0[1].interiors().len(), 0);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
    }

    #[test]
    fn non_polygon_shapes_have_no_polygons() {
        assert!(shp_to_geo(&Shape::NullShape).is_none());
        assert!(shp_to_geo(&Shape::Point(pt(1., 2.))).is_none());
    }

    #[test]
    fn geo_round_trip_keeps_outline() {
        let square = polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 1.)];
        let shape = geo_to_shp(&MultiPolygon(vec![square]));
        let rings = shape.rings();
        assert_eq!(rings.len(), 1);
        assert!(matches!(rings[0], PolygonRing::Outer(_)));
        assert_eq!(rings[0].points().len(), 5);

        let back = shp_to_geo(&Shape::Polygon(shape)).unwrap();
        assert_eq!(back.0.len(), 1);
        let xs = back.0[0].exterior().coords().map(|c| c.x).sum::<f64>();
        assert_eq!(xs, 2.0); // 0 + 0 + 1 + 1 + 0, in clockwise order
    }
}
