use anyhow::Result;
use clap::Parser;
use kml_export::config::StyleConfig;
use kml_export::{data, kml, reproject, writer};
use std::path::PathBuf;

/// Convert a shapefile or geodatabase feature class into styled KML.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input vector data: a .shp file or a path to a .gdb feature class
    input: PathBuf,
    /// Output KML file path
    output: PathBuf,
    /// Attribute column to use for labels
    #[arg(long, value_name = "COLUMN")]
    label_column: Option<String>,
    /// Hide feature labels
    #[arg(long = "no-labels", action = clap::ArgAction::SetFalse, default_value_t = true)]
    show_labels: bool,
    /// Load styling from a TOML file; individual flags below still override
    #[arg(long, value_name = "FILE")]
    style: Option<PathBuf>,
    /// Line and polygon outline color (aabbggrr)
    #[arg(long, value_name = "COLOR")]
    line_color: Option<String>,
    /// Line and polygon outline width
    #[arg(long, value_name = "WIDTH")]
    line_width: Option<f64>,
    /// Fill polygons
    #[arg(long)]
    fill: bool,
    /// Polygon fill color (aabbggrr); only takes effect together with --fill
    #[arg(long, value_name = "COLOR")]
    poly_color: Option<String>,
    /// Label text color (aabbggrr)
    #[arg(long, value_name = "COLOR")]
    label_color: Option<String>,
    /// Label text scale
    #[arg(long, value_name = "SCALE")]
    label_scale: Option<f64>,
    /// Point icon scale; 0 hides icons
    #[arg(long, value_name = "SCALE")]
    icon_scale: Option<f64>,
    /// Point icon color (aabbggrr)
    #[arg(long, value_name = "COLOR")]
    icon_color: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let style = build_style(&cli)?;

    let dataset = data::load_vector_file(&cli.input)?;
    let dataset = reproject::to_wgs84(dataset)?;
    let placemarks = kml::transcode(
        &dataset.records,
        cli.label_column.as_deref(),
        cli.show_labels,
        &style,
    );
    writer::save_kml(&placemarks, &cli.output)?;

    println!("KML saved to: {}", cli.output.display());
    Ok(())
}

fn build_style(cli: &Cli) -> Result<StyleConfig> {
    let mut style = match &cli.style {
        Some(path) => StyleConfig::load_from_file(path)?,
        None => StyleConfig::default(),
    };

    if let Some(color) = &cli.line_color {
        style.line_color = color.clone();
    }
    if let Some(width) = cli.line_width {
        style.line_width = width;
    }
    if cli.fill {
        style.poly_fill = true;
    }
    if let Some(color) = &cli.poly_color {
        style.poly_color = Some(color.clone());
    }
    if let Some(color) = &cli.label_color {
        style.label_color = color.clone();
    }
    if let Some(scale) = cli.label_scale {
        style.label_scale = scale;
    }
    if let Some(scale) = cli.icon_scale {
        style.point_icon_scale = scale;
    }
    if let Some(color) = &cli.icon_color {
        style.point_icon_color = color.clone();
    }

    Ok(style)
}
