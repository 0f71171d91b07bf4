use crate::types::{FeatureRecord, VectorDataset};
use anyhow::{anyhow, bail, Context, Result};
use geo::Geometry;
use std::path::{Path, PathBuf};

/// Load a vector source into records plus its EPSG code, when identifiable.
/// Recognized inputs are `.shp` files and `.gdb` feature classes (the
/// container path runs up to and including `.gdb`, the feature class is the
/// final path segment). Anything else fails before any transcoding starts.
pub fn load_vector_file(path: &Path) -> Result<VectorDataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase());

    if extension.as_deref() == Some("shp") {
        load_shapefile(path)
    } else if let Some((container, feature_class)) = split_gdb_path(path) {
        load_feature_class(&container, &feature_class)
    } else {
        bail!(
            "Format not recognized: {:?}. Please provide a .shp file or a feature class inside a .gdb",
            path
        );
    }
}

fn split_gdb_path(path: &Path) -> Option<(PathBuf, String)> {
    let text = path.to_string_lossy();
    let idx = text.find(".gdb")?;
    let container = PathBuf::from(&text[..idx + ".gdb".len()]);
    let feature_class = path.file_name()?.to_string_lossy().into_owned();
    Some((container, feature_class))
}

fn load_shapefile(path: &Path) -> Result<VectorDataset> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {:?}", path))?;

    let mut records = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        let geometry = shape_to_geometry(shape)?;
        let attributes = record
            .into_iter()
            .map(|(name, value)| (name, field_value_text(value)))
            .collect();
        records.push(FeatureRecord {
            attributes,
            geometry,
        });
    }

    let epsg = read_prj_epsg(path);
    Ok(VectorDataset { records, epsg })
}

fn shape_to_geometry(shape: shapefile::Shape) -> Result<Option<Geometry<f64>>> {
    if matches!(shape, shapefile::Shape::NullShape) {
        return Ok(None);
    }
    let geometry: Geometry<f64> = shape
        .try_into()
        .map_err(|e| anyhow!("Failed to convert shape: {:?}", e))?;
    Ok(Some(flatten_single_part(geometry)))
}

// Shapefiles store every polygon/polyline as a multi-part shape; one-part
// shapes come back out as the single-part kind.
fn flatten_single_part(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::MultiPoint(mut points) if points.0.len() == 1 => {
            Geometry::Point(points.0.remove(0))
        }
        Geometry::MultiLineString(mut lines) if lines.0.len() == 1 => {
            Geometry::LineString(lines.0.remove(0))
        }
        Geometry::MultiPolygon(mut polygons) if polygons.0.len() == 1 => {
            Geometry::Polygon(polygons.0.remove(0))
        }
        other => other,
    }
}

fn field_value_text(value: shapefile::dbase::FieldValue) -> String {
    use shapefile::dbase::FieldValue;
    match value {
        FieldValue::Character(Some(text)) => text,
        FieldValue::Character(None) => String::new(),
        FieldValue::Numeric(Some(number)) => number.to_string(),
        FieldValue::Numeric(None) => String::new(),
        FieldValue::Float(Some(number)) => number.to_string(),
        FieldValue::Float(None) => String::new(),
        FieldValue::Integer(number) => number.to_string(),
        FieldValue::Double(number) => number.to_string(),
        FieldValue::Logical(Some(flag)) => flag.to_string(),
        FieldValue::Logical(None) => String::new(),
        other => format!("{:?}", other),
    }
}

fn read_prj_epsg(shp_path: &Path) -> Option<u32> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = std::fs::read_to_string(prj_path).ok()?;
    epsg_from_wkt(&wkt)
}

/// The authority entry closing a WKT definition names the CRS itself;
/// earlier entries belong to nested components (datum, base CRS, units).
/// ESRI-flavored WKT without authority entries yields `None`.
fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    let mut code = None;
    for (idx, _) in wkt.match_indices("\"EPSG\"") {
        let rest = &wkt[idx + "\"EPSG\"".len()..];
        let Some(end) = rest.find(']') else {
            continue;
        };
        let digits: String = rest[..end].chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(parsed) = digits.parse::<u32>() {
            code = Some(parsed);
        }
    }
    code
}

#[cfg(feature = "gdb")]
fn load_feature_class(container: &Path, feature_class: &str) -> Result<VectorDataset> {
    use gdal::vector::LayerAccess;
    use std::collections::HashMap;

    if feature_class.ends_with(".gdb") {
        bail!("No feature class named in geodatabase path: {:?}", container);
    }

    let dataset = gdal::Dataset::open(container)
        .with_context(|| format!("Failed to open geodatabase: {:?}", container))?;
    let mut layer = dataset.layer_by_name(feature_class).with_context(|| {
        format!(
            "Feature class '{}' not found in {:?}",
            feature_class, container
        )
    })?;

    let epsg = layer.spatial_ref().and_then(|mut srs| {
        srs.auto_identify_epsg().ok()?;
        srs.auth_code().ok().map(|code| code as u32)
    });

    let mut records = Vec::new();
    for feature in layer.features() {
        let mut attributes = HashMap::new();
        for (name, value) in feature.fields() {
            attributes.insert(name, value.map(gdal_field_text).unwrap_or_default());
        }
        let geometry = match feature.geometry() {
            Some(geometry) => Some(
                geometry
                    .to_geo()
                    .map_err(|e| anyhow!("Failed to convert geometry: {:?}", e))?,
            ),
            None => None,
        };
        records.push(FeatureRecord {
            attributes,
            geometry,
        });
    }

    Ok(VectorDataset { records, epsg })
}

#[cfg(feature = "gdb")]
fn gdal_field_text(value: gdal::vector::FieldValue) -> String {
    use gdal::vector::FieldValue;
    match value {
        FieldValue::StringValue(text) => text,
        FieldValue::IntegerValue(number) => number.to_string(),
        FieldValue::Integer64Value(number) => number.to_string(),
        FieldValue::RealValue(number) => number.to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(not(feature = "gdb"))]
fn load_feature_class(container: &Path, _feature_class: &str) -> Result<VectorDataset> {
    bail!(
        "Geodatabase input {:?} requires GDAL support; rebuild with `--features gdb`",
        container
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_extension_is_fatal() {
        let error = load_vector_file(Path::new("/data/parcels.geojson")).unwrap_err();
        assert!(error.to_string().contains("Format not recognized"));
    }

    #[test]
    fn gdb_path_splits_into_container_and_feature_class() {
        let (container, feature_class) =
            split_gdb_path(Path::new("/data/hydrology.gdb/streams")).unwrap();
        assert_eq!(container, PathBuf::from("/data/hydrology.gdb"));
        assert_eq!(feature_class, "streams");

        assert!(split_gdb_path(Path::new("/data/parcels.shp")).is_none());
    }

    #[test]
    fn wkt_authority_parsing_takes_the_outermost_crs() {
        // Nested GEOGCS authority must not win over the PROJCS one.
        let utm10 = r#"PROJCS["NAD83 / UTM zone 10N",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],AUTHORITY["EPSG","4269"]],PROJECTION["Transverse_Mercator"],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","26910"]]"#;
        assert_eq!(epsg_from_wkt(utm10), Some(26910));

        // WKT2 uses ID[...] with an unquoted code.
        let wkt2 = r#"GEOGCRS["WGS 84",ID["EPSG",4326]]"#;
        assert_eq!(epsg_from_wkt(wkt2), Some(4326));

        // ESRI .prj files often carry no authority at all.
        let esri = r#"PROJCS["NAD_1983_BC_Environment_Albers",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]]],PROJECTION["Albers"]]"#;
        assert_eq!(epsg_from_wkt(esri), None);
    }

    #[test]
    fn single_part_multis_flatten_to_single_kinds() {
        let polygon = geo::Polygon::new(
            geo::LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let flattened = flatten_single_part(Geometry::MultiPolygon(geo::MultiPolygon::new(vec![
            polygon.clone(),
        ])));
        assert_eq!(flattened, Geometry::Polygon(polygon.clone()));

        let two_parts = Geometry::MultiPolygon(geo::MultiPolygon::new(vec![
            polygon.clone(),
            polygon,
        ]));
        assert!(matches!(
            flatten_single_part(two_parts),
            Geometry::MultiPolygon(_)
        ));
    }
}
