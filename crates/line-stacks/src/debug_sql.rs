//! SQL dump of generated lines, for inspecting the output in a spatial database

use crate::{AGG_COUNT_ATTRIBUTE_NAME, Feature, FeatureCollection, Result, Value, WIDTH_ATTRIBUTE_NAME};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One `INSERT` statement per feature. Only the geometry, `agg_count` and `line_width` are
/// written; missing values become `NULL`.
pub fn to_sql_statements(collection: &FeatureCollection, table: &str) -> Vec<String> {
    collection
        .features
        .iter()
        .map(|feature| {
            format!(
                "INSERT INTO {table} (geom, {AGG_COUNT_ATTRIBUTE_NAME}, {WIDTH_ATTRIBUTE_NAME}) VALUES (ST_GeomFromText('{}'), {}, {});",
                to_wkt(feature),
                sql_value(feature.attribute(AGG_COUNT_ATTRIBUTE_NAME)),
                sql_value(feature.attribute(WIDTH_ATTRIBUTE_NAME)),
            )
        })
        .collect()
}

/// Write [`to_sql_statements`] to `path`, one statement per line
pub fn dump_collection_to_sql_file(
    collection: &FeatureCollection,
    path: impl AsRef<Path>,
    table: &str,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for statement in to_sql_statements(collection, table) {
        writeln!(writer, "{statement}")?;
    }
    writer.flush()?;
    tracing::debug!(
        "Wrote {} statements to {}",
        collection.len(),
        path.as_ref().display()
    );
    Ok(())
}

fn to_wkt(feature: &Feature) -> String {
    let mut wkt = String::from("LINESTRING(");
    for (i, c) in feature.geometry.0.iter().enumerate() {
        if i > 0 {
            wkt.push_str(", ");
        }
        let _ = write!(wkt, "{} {}", c.x, c.y);
    }
    wkt.push(')');
    wkt
}

fn sql_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(f)) => f.to_string(),
        Some(Value::String(s)) => format!("'{}'", s.replace('\'', "''")),
    }
}
