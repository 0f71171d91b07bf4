use crate::config::StyleConfig;
use crate::types::FeatureRecord;
use geo::{Centroid, Coord, Geometry, LineString, Polygon};
use tracing::warn;

/// The six geometry kinds this exporter understands, borrowed from the
/// record's geometry. Anything else is reported by name and skipped.
#[derive(Clone, Copy)]
pub enum SupportedGeometry<'a> {
    Point(&'a geo::Point<f64>),
    MultiPoint(&'a geo::MultiPoint<f64>),
    Line(&'a geo::LineString<f64>),
    MultiLine(&'a geo::MultiLineString<f64>),
    Polygon(&'a geo::Polygon<f64>),
    MultiPolygon(&'a geo::MultiPolygon<f64>),
}

pub fn classify(geometry: &Geometry<f64>) -> Result<SupportedGeometry<'_>, &'static str> {
    match geometry {
        Geometry::Point(point) => Ok(SupportedGeometry::Point(point)),
        Geometry::MultiPoint(points) => Ok(SupportedGeometry::MultiPoint(points)),
        Geometry::LineString(line) => Ok(SupportedGeometry::Line(line)),
        Geometry::MultiLineString(lines) => Ok(SupportedGeometry::MultiLine(lines)),
        Geometry::Polygon(polygon) => Ok(SupportedGeometry::Polygon(polygon)),
        Geometry::MultiPolygon(polygons) => Ok(SupportedGeometry::MultiPolygon(polygons)),
        Geometry::Line(_) => Err("Line"),
        Geometry::Rect(_) => Err("Rect"),
        Geometry::Triangle(_) => Err("Triangle"),
        Geometry::GeometryCollection(_) => Err("GeometryCollection"),
    }
}

/// Geometry of one output placemark, already reduced to bare coordinate
/// sequences in the order they will be serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum KmlGeometry {
    Point(Coord<f64>),
    MultiPoint(Vec<Coord<f64>>),
    Line(Vec<Coord<f64>>),
    MultiLine(Vec<Vec<Coord<f64>>>),
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

/// Outer ring first, then the holes in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRings {
    pub outer: Vec<Coord<f64>>,
    pub inner: Vec<Vec<Coord<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub scale: f64,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub scale: f64,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyStyle {
    pub fill: bool,
    pub color: Option<String>,
}

/// Inline style of one placemark. Each feature owns its own copy; there is
/// no style sharing in the output document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureStyle {
    pub icon: Option<IconStyle>,
    pub label: Option<LabelStyle>,
    pub line: Option<LineStyle>,
    pub poly: Option<PolyStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: Option<String>,
    pub style: FeatureStyle,
    pub geometry: KmlGeometry,
}

fn vertex_sequence(line: &LineString<f64>) -> Vec<Coord<f64>> {
    line.coords().copied().collect()
}

fn ring_sequences(polygon: &Polygon<f64>) -> PolygonRings {
    PolygonRings {
        outer: vertex_sequence(polygon.exterior()),
        inner: polygon.interiors().iter().map(vertex_sequence).collect(),
    }
}

fn feature_name(label: &str, show_labels: bool) -> Option<String> {
    if show_labels && !label.is_empty() {
        Some(label.to_string())
    } else {
        None
    }
}

/// Never render an empty label glyph: the scale is forced to 0 unless the
/// feature actually has visible label text, whatever `label_scale` says.
fn label_style(label: &str, show_labels: bool, style: &StyleConfig) -> LabelStyle {
    let has_visible_label = show_labels && !label.is_empty();
    LabelStyle {
        scale: if has_visible_label { style.label_scale } else { 0.0 },
        color: Some(style.label_color.clone()),
    }
}

fn point_style(label: &str, show_labels: bool, style: &StyleConfig) -> FeatureStyle {
    FeatureStyle {
        icon: Some(IconStyle {
            scale: style.point_icon_scale,
            color: Some(style.point_icon_color.clone()),
        }),
        label: Some(label_style(label, show_labels, style)),
        ..Default::default()
    }
}

fn line_style(label: &str, show_labels: bool, style: &StyleConfig) -> FeatureStyle {
    FeatureStyle {
        label: Some(label_style(label, show_labels, style)),
        line: Some(LineStyle {
            color: style.line_color.clone(),
            width: style.line_width,
        }),
        ..Default::default()
    }
}

/// Shared polygon styling. Fill color is AND-gated: it only takes effect
/// when the fill flag is set and a color was supplied. Label scale is 0
/// unconditionally; area labels are carried by the centroid points.
fn polygon_style(style: &StyleConfig) -> FeatureStyle {
    let fill_color = if style.poly_fill {
        style.poly_color.clone()
    } else {
        None
    };
    FeatureStyle {
        label: Some(LabelStyle {
            scale: 0.0,
            color: None,
        }),
        line: Some(LineStyle {
            color: style.line_color.clone(),
            width: style.line_width,
        }),
        poly: Some(PolyStyle {
            fill: style.poly_fill,
            color: fill_color,
        }),
        ..Default::default()
    }
}

/// Build the one placemark a supported geometry maps to.
pub fn build_feature(
    geometry: SupportedGeometry<'_>,
    label: &str,
    show_labels: bool,
    style: &StyleConfig,
) -> Placemark {
    match geometry {
        SupportedGeometry::Point(point) => Placemark {
            name: feature_name(label, show_labels),
            style: point_style(label, show_labels, style),
            geometry: KmlGeometry::Point(point.0),
        },
        SupportedGeometry::MultiPoint(points) => Placemark {
            name: feature_name(label, show_labels),
            style: point_style(label, show_labels, style),
            geometry: KmlGeometry::MultiPoint(points.iter().map(|p| p.0).collect()),
        },
        SupportedGeometry::Line(line) => Placemark {
            name: feature_name(label, show_labels),
            style: line_style(label, show_labels, style),
            geometry: KmlGeometry::Line(vertex_sequence(line)),
        },
        SupportedGeometry::MultiLine(lines) => Placemark {
            name: feature_name(label, show_labels),
            style: line_style(label, show_labels, style),
            geometry: KmlGeometry::MultiLine(lines.iter().map(vertex_sequence).collect()),
        },
        // Polygon placemarks are never named; KML renders polygon labels at
        // a vertex, so labels go on the centroid point instead.
        SupportedGeometry::Polygon(polygon) => Placemark {
            name: None,
            style: polygon_style(style),
            geometry: KmlGeometry::Polygon(ring_sequences(polygon)),
        },
        SupportedGeometry::MultiPolygon(polygons) => Placemark {
            name: None,
            style: polygon_style(style),
            geometry: KmlGeometry::MultiPolygon(polygons.iter().map(ring_sequences).collect()),
        },
    }
}

/// Derived label feature for an area record: an icon-less point at the
/// geometry's centroid carrying the visible label. MultiPolygon centroids
/// are area-weighted across parts.
fn centroid_label(geometry: &Geometry<f64>, label: &str, style: &StyleConfig) -> Option<Placemark> {
    let centroid = geometry.centroid()?;
    Some(Placemark {
        name: Some(label.to_string()),
        style: FeatureStyle {
            icon: Some(IconStyle {
                scale: 0.0,
                color: None,
            }),
            label: Some(LabelStyle {
                scale: style.label_scale,
                color: Some(style.label_color.clone()),
            }),
            ..Default::default()
        },
        geometry: KmlGeometry::Point(centroid.0),
    })
}

/// Translate records into output placemarks, in input order. Records with a
/// null geometry are skipped silently; unsupported geometry kinds are
/// skipped with a warning. Area records with visible label text additionally
/// emit their centroid label point right after the area placemark.
pub fn transcode(
    records: &[FeatureRecord],
    label_column: Option<&str>,
    show_labels: bool,
    style: &StyleConfig,
) -> Vec<Placemark> {
    let mut placemarks = Vec::new();

    for record in records {
        let Some(geometry) = record.geometry.as_ref() else {
            continue;
        };

        let label = label_column
            .and_then(|column| record.attribute(column))
            .unwrap_or("");

        let supported = match classify(geometry) {
            Ok(supported) => supported,
            Err(kind) => {
                warn!("Unsupported geometry type '{}' skipped", kind);
                continue;
            }
        };

        let is_area = matches!(
            supported,
            SupportedGeometry::Polygon(_) | SupportedGeometry::MultiPolygon(_)
        );

        placemarks.push(build_feature(supported, label, show_labels, style));

        let has_visible_label = show_labels && !label.is_empty();
        if is_area && has_visible_label {
            if let Some(label_point) = centroid_label(geometry, label, style) {
                placemarks.push(label_point);
            }
        }
    }

    placemarks
}
