use crate::CliError;
use clap::{ArgAction, Parser};
use geo::{Coord, Rect};
use line_stacks::StackParams;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Line Stacks - Lays out duplicate lines of a GeoJSON file as parallel, non-overlapping bands
pub struct Settings {
    /// GeoJSON file with LineString features, `-` reads stdin
    #[clap(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// GeoJSON file receiving the stacked lines, `-` writes to stdout
    #[clap(short, long, value_name = "FILE", default_value = "-")]
    pub output: PathBuf,

    /// Comma separated attributes to aggregate by
    #[clap(short, long, default_value = "")]
    pub attributes: String,

    /// Integer attribute ordering the lines of a stack, smallest closest to the original line
    #[clap(long)]
    pub order_attribute: Option<String>,

    /// Boolean attribute inverting the sides a line is drawn on
    #[clap(long)]
    pub invert_sides_attribute: Option<String>,

    /// Minimum line width in pixels
    #[clap(long, default_value = "8")]
    pub min_line_width: i64,

    /// Maximum line width in pixels
    #[clap(long, default_value = "80")]
    pub max_line_width: i64,

    /// Draw the stacks on both sides of the line
    #[clap(long, default_value = "true", action = ArgAction::Set)]
    pub draw_on_both_sides: bool,

    /// Spacing in pixels between the lines of a stack
    #[clap(long, default_value = "0")]
    pub spacing: i64,

    /// Rhai script defining `fn line_width(length, count)`, replacing the min/max rule
    #[clap(long, value_name = "FILE")]
    pub script_file: Option<PathBuf>,

    /// Value of `customVariable1` in the render script
    #[clap(long, default_value = "")]
    pub custom_variable1: String,

    /// Value of `customVariable2` in the render script
    #[clap(long, default_value = "")]
    pub custom_variable2: String,

    /// Bounding box of the output image in map units: minx,miny,maxx,maxy
    #[clap(long, value_parser = parse_bbox, default_value = "0,0,1024,768")]
    pub bbox: Rect<f64>,

    /// Output image width in pixels
    #[clap(long, default_value = "1024")]
    pub width: u32,

    /// Output image height in pixels
    #[clap(long, default_value = "768")]
    pub height: u32,

    /// Log the time spent in each phase
    #[clap(long, default_value = "false")]
    pub measure_durations: bool,

    /// Write SQL insert statements of the generated lines to this file (debugging only)
    #[clap(long, value_name = "FILE")]
    pub debug_sql_file: Option<PathBuf>,
}

impl Settings {
    /// Build the stacking parameters, reading the script file if one is given
    pub fn to_params(&self) -> Result<StackParams, CliError> {
        let render_script = match &self.script_file {
            Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?,
            None => String::new(),
        };

        Ok(StackParams {
            attributes: StackParams::parse_attributes(&self.attributes),
            order_attribute: non_empty(&self.order_attribute),
            invert_sides_attribute: non_empty(&self.invert_sides_attribute),
            min_line_width: self.min_line_width,
            max_line_width: self.max_line_width,
            draw_on_both_sides: self.draw_on_both_sides,
            spacing_between_stack_entries: self.spacing,
            render_script,
            script_custom_variable1: self.custom_variable1.clone(),
            script_custom_variable2: self.custom_variable2.clone(),
            output_bbox: self.bbox,
            output_width: self.width,
            output_height: self.height,
            enable_duration_measurement: self.measure_durations,
            debug_sql_file: self.debug_sql_file.clone(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse `minx,miny,maxx,maxy`
fn parse_bbox(value: &str) -> Result<Rect<f64>, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in bbox: {e}"))?;
    match parts.as_slice() {
        &[min_x, min_y, max_x, max_y] => Ok(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        )),
        _ => Err(format!(
            "expected minx,miny,maxx,maxy but got {} value(s)",
            parts.len()
        )),
    }
}
