use geo::Geometry;
use std::collections::HashMap;

/// One input feature: its attribute row plus the geometry, if any.
///
/// Attribute values are stringified at load time; the exporter only ever
/// reads them to resolve label text.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub attributes: HashMap<String, String>,
    /// `None` for records with a null shape. Such records are skipped.
    pub geometry: Option<Geometry<f64>>,
}

impl FeatureRecord {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A loaded feature collection together with its coordinate reference
/// system, when one could be identified from the source.
#[derive(Debug, Clone)]
pub struct VectorDataset {
    pub records: Vec<FeatureRecord>,
    pub epsg: Option<u32>,
}
