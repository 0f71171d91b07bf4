use crate::kml::{FeatureStyle, KmlGeometry, Placemark, PolygonRings};
use anyhow::{Context, Result};
use geo::Coord;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Serialize the whole document once, in placemark order.
pub fn write_kml<W: Write>(placemarks: &[Placemark], out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(kml))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;

    for placemark in placemarks {
        write_placemark(&mut writer, placemark)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    Ok(())
}

pub fn save_kml(placemarks: &[Placemark], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut out = BufWriter::new(file);
    write_kml(placemarks, &mut out)?;
    out.flush()
        .with_context(|| format!("Failed to write output file: {:?}", path))?;
    Ok(())
}

fn write_placemark<W: Write>(writer: &mut Writer<W>, placemark: &Placemark) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    if let Some(name) = &placemark.name {
        text_element(writer, "name", name)?;
    }
    write_style(writer, &placemark.style)?;
    write_geometry(writer, &placemark.geometry)?;
    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    Ok(())
}

fn write_style<W: Write>(writer: &mut Writer<W>, style: &FeatureStyle) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Style")))?;

    if let Some(icon) = &style.icon {
        writer.write_event(Event::Start(BytesStart::new("IconStyle")))?;
        if let Some(color) = &icon.color {
            text_element(writer, "color", color)?;
        }
        text_element(writer, "scale", &number(icon.scale))?;
        writer.write_event(Event::End(BytesEnd::new("IconStyle")))?;
    }

    if let Some(label) = &style.label {
        writer.write_event(Event::Start(BytesStart::new("LabelStyle")))?;
        if let Some(color) = &label.color {
            text_element(writer, "color", color)?;
        }
        text_element(writer, "scale", &number(label.scale))?;
        writer.write_event(Event::End(BytesEnd::new("LabelStyle")))?;
    }

    if let Some(line) = &style.line {
        writer.write_event(Event::Start(BytesStart::new("LineStyle")))?;
        text_element(writer, "color", &line.color)?;
        text_element(writer, "width", &number(line.width))?;
        writer.write_event(Event::End(BytesEnd::new("LineStyle")))?;
    }

    if let Some(poly) = &style.poly {
        writer.write_event(Event::Start(BytesStart::new("PolyStyle")))?;
        if let Some(color) = &poly.color {
            text_element(writer, "color", color)?;
        }
        text_element(writer, "fill", if poly.fill { "1" } else { "0" })?;
        writer.write_event(Event::End(BytesEnd::new("PolyStyle")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_geometry<W: Write>(writer: &mut Writer<W>, geometry: &KmlGeometry) -> Result<()> {
    match geometry {
        KmlGeometry::Point(coord) => write_point(writer, *coord)?,
        KmlGeometry::MultiPoint(points) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for coord in points {
                write_point(writer, *coord)?;
            }
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
        KmlGeometry::Line(coords) => write_line(writer, coords)?,
        KmlGeometry::MultiLine(lines) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for coords in lines {
                write_line(writer, coords)?;
            }
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
        KmlGeometry::Polygon(rings) => write_polygon(writer, rings)?,
        KmlGeometry::MultiPolygon(polygons) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for rings in polygons {
                write_polygon(writer, rings)?;
            }
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
    }
    Ok(())
}

fn write_point<W: Write>(writer: &mut Writer<W>, coord: Coord<f64>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Point")))?;
    text_element(writer, "coordinates", &coordinates_text(&[coord]))?;
    writer.write_event(Event::End(BytesEnd::new("Point")))?;
    Ok(())
}

fn write_line<W: Write>(writer: &mut Writer<W>, coords: &[Coord<f64>]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("LineString")))?;
    text_element(writer, "coordinates", &coordinates_text(coords))?;
    writer.write_event(Event::End(BytesEnd::new("LineString")))?;
    Ok(())
}

fn write_polygon<W: Write>(writer: &mut Writer<W>, rings: &PolygonRings) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Polygon")))?;

    writer.write_event(Event::Start(BytesStart::new("outerBoundaryIs")))?;
    write_linear_ring(writer, &rings.outer)?;
    writer.write_event(Event::End(BytesEnd::new("outerBoundaryIs")))?;

    for inner in &rings.inner {
        writer.write_event(Event::Start(BytesStart::new("innerBoundaryIs")))?;
        write_linear_ring(writer, inner)?;
        writer.write_event(Event::End(BytesEnd::new("innerBoundaryIs")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Polygon")))?;
    Ok(())
}

fn write_linear_ring<W: Write>(writer: &mut Writer<W>, coords: &[Coord<f64>]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("LinearRing")))?;
    text_element(writer, "coordinates", &coordinates_text(coords))?;
    writer.write_event(Event::End(BytesEnd::new("LinearRing")))?;
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn coordinates_text(coords: &[Coord<f64>]) -> String {
    coords
        .iter()
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn number(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;
    use crate::kml::{build_feature, SupportedGeometry};
    use geo::{LineString, Point, Polygon};

    fn render(placemarks: &[Placemark]) -> String {
        let mut buffer = Vec::new();
        write_kml(placemarks, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn point_placemark_renders_name_styles_and_coordinates() {
        let style = StyleConfig::default();
        let point = Point::new(30.0, 10.5);
        let placemark = build_feature(SupportedGeometry::Point(&point), "A", true, &style);

        let kml = render(&[placemark]);
        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(kml.contains("<kml xmlns=\"http://www.opengis.net/kml/2.2\">"));
        assert!(kml.contains("<name>A</name>"));
        assert!(kml.contains("<coordinates>30,10.5</coordinates>"));
        assert!(kml.contains("<IconStyle>"));
        assert!(kml.contains("<scale>1</scale>"));
        assert!(kml.contains("<color>ff0000ff</color>"));
    }

    #[test]
    fn unnamed_placemark_has_no_name_element() {
        let style = StyleConfig::default();
        let point = Point::new(1.0, 2.0);
        let placemark = build_feature(SupportedGeometry::Point(&point), "", true, &style);

        let kml = render(&[placemark]);
        assert!(!kml.contains("<name>"));
    }

    #[test]
    fn polygon_rings_render_outer_then_inner() {
        let style = StyleConfig::default();
        let polygon = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![
                (1.0, 1.0),
                (2.0, 1.0),
                (2.0, 2.0),
                (1.0, 2.0),
                (1.0, 1.0),
            ])],
        );
        let placemark = build_feature(SupportedGeometry::Polygon(&polygon), "", true, &style);

        let kml = render(&[placemark]);
        let outer = kml.find("<outerBoundaryIs>").unwrap();
        let inner = kml.find("<innerBoundaryIs>").unwrap();
        assert!(outer < inner);
        assert!(kml.contains("<coordinates>0,0 4,0 4,4 0,4 0,0</coordinates>"));
        assert!(kml.contains("<coordinates>1,1 2,1 2,2 1,2 1,1</coordinates>"));
        assert!(kml.contains("<fill>0</fill>"));
    }

    #[test]
    fn label_text_is_escaped() {
        let style = StyleConfig::default();
        let point = Point::new(0.0, 0.0);
        let placemark = build_feature(SupportedGeometry::Point(&point), "Fish & Chips", true, &style);

        let kml = render(&[placemark]);
        assert!(kml.contains("<name>Fish &amp; Chips</name>"));
    }

    #[test]
    fn serialization_is_deterministic() {
        let style = StyleConfig::default();
        let point = Point::new(12.345678901234, -7.000000001);
        let placemark = build_feature(SupportedGeometry::Point(&point), "A", true, &style);

        assert_eq!(render(&[placemark.clone()]), render(&[placemark]));
    }
}
