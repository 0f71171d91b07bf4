use crate::types::VectorDataset;
use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords};
use proj4rs::Proj;

pub const WGS84_EPSG: u32 = 4326;

/// Reproject a dataset to WGS84. Datasets already in EPSG:4326, or with no
/// identifiable CRS, are passed through untouched; coordinates are then
/// assumed compatible.
pub fn to_wgs84(dataset: VectorDataset) -> Result<VectorDataset> {
    let Some(code) = dataset.epsg else {
        return Ok(dataset);
    };
    if code == WGS84_EPSG {
        return Ok(dataset);
    }

    let transform = CrsTransform::new(code, WGS84_EPSG)?;
    let mut records = dataset.records;
    for record in &mut records {
        if let Some(geometry) = record.geometry.take() {
            record.geometry = Some(
                geometry
                    .try_map_coords(|coord| transform.apply(coord))
                    .with_context(|| format!("Failed to reproject EPSG:{} coordinates", code))?,
            );
        }
    }

    Ok(VectorDataset {
        records,
        epsg: Some(WGS84_EPSG),
    })
}

/// A source→target coordinate transform between two EPSG-coded systems.
pub struct CrsTransform {
    source: Proj,
    target: Proj,
    source_is_latlong: bool,
    target_is_latlong: bool,
}

impl CrsTransform {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = proj_for_epsg(source_epsg)?;
        let target = proj_for_epsg(target_epsg)?;
        let source_is_latlong = source.is_latlong();
        let target_is_latlong = target.is_latlong();
        Ok(CrsTransform {
            source,
            target,
            source_is_latlong,
            target_is_latlong,
        })
    }

    // proj4rs works in radians on geographic systems, degrees never cross
    // the transform boundary.
    pub fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.source_is_latlong {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| anyhow!("Reprojection failed: {}", e))?;

        Ok(if self.target_is_latlong {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }
}

fn proj_for_epsg(code: u32) -> Result<Proj> {
    let short = u16::try_from(code)
        .map_err(|_| anyhow!("EPSG:{} is outside the supported code range", code))?;
    let def = crs_definitions::from_code(short)
        .ok_or_else(|| anyhow!("EPSG:{} is not in the CRS registry", code))?;
    Proj::from_proj_string(def.proj4)
        .map_err(|e| anyhow!("Failed to initialize EPSG:{}: {}", code, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureRecord;
    use approx::assert_relative_eq;
    use geo::{Geometry, Point};
    use std::collections::HashMap;

    fn dataset(x: f64, y: f64, epsg: Option<u32>) -> VectorDataset {
        VectorDataset {
            records: vec![FeatureRecord {
                attributes: HashMap::new(),
                geometry: Some(Geometry::Point(Point::new(x, y))),
            }],
            epsg,
        }
    }

    fn point_of(dataset: &VectorDataset) -> Point<f64> {
        match &dataset.records[0].geometry {
            Some(Geometry::Point(point)) => *point,
            _ => panic!("expected point"),
        }
    }

    #[test]
    fn wgs84_input_is_passed_through() {
        let result = to_wgs84(dataset(30.0, 10.0, Some(WGS84_EPSG))).unwrap();
        assert_eq!(point_of(&result), Point::new(30.0, 10.0));
        assert_eq!(result.epsg, Some(WGS84_EPSG));
    }

    #[test]
    fn unknown_crs_is_passed_through() {
        let result = to_wgs84(dataset(30.0, 10.0, None)).unwrap();
        assert_eq!(point_of(&result), Point::new(30.0, 10.0));
        assert_eq!(result.epsg, None);
    }

    #[test]
    fn web_mercator_reprojects_to_degrees() {
        // (1°, 1°) in EPSG:3857 meters.
        let result = to_wgs84(dataset(111319.49079327357, 111325.14286638486, Some(3857))).unwrap();
        let point = point_of(&result);
        assert_relative_eq!(point.x(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(point.y(), 1.0, epsilon = 1e-6);
        assert_eq!(result.epsg, Some(WGS84_EPSG));
    }

    #[test]
    fn unknown_epsg_code_is_fatal() {
        let error = to_wgs84(dataset(0.0, 0.0, Some(65000))).unwrap_err();
        assert!(error.to_string().contains("EPSG:65000"));
    }
}
