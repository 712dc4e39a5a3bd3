//! StackProcess - the stacking pipeline from input features to offset output lines
//!
//! Input features are aggregated by their key attributes, grouped into stacks of identical
//! geometries, ordered within each stack and finally laid out side by side as offset copies of
//! the shared path.

use crate::{
    AggregatedFeature, ClampWidth, Feature, FeatureAggregator, FeatureCollection, GeometryType,
    MapUnits, OrderComparator, Result, RhaiScript, Schema, ScriptedWidth, Side, Stack,
    StackError, StackLayout, Value, WidthResolver, build_stacks, debug_sql, line_length,
    offset_line, side_multiplier,
};

use geo::{LineString, Rect};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Attribute holding the number of input features merged into an output feature
pub const AGG_COUNT_ATTRIBUTE_NAME: &str = "agg_count";

/// Attribute holding the resolved line width in pixels
pub const WIDTH_ATTRIBUTE_NAME: &str = "line_width";

/// Table name used in the debug SQL dump
const DEBUG_SQL_TABLE: &str = "stacked_lines";

/// Advisory notifications around one execution
pub trait ProgressListener {
    fn started(&mut self) {}
    fn complete(&mut self) {}
}

/// Progress listener ignoring all notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}

/// Parameters of one stacking request
///
/// The output view (`output_bbox`, `output_width`, `output_height`) should match the image
/// that is being rendered, so that pixel widths and spacings come out right on screen.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct StackParams {
    /// Attributes to aggregate by
    pub attributes: Vec<String>,
    /// Integer attribute ordering the members of a stack; smaller values are placed closer
    /// to the original line. Included in the aggregation.
    pub order_attribute: Option<String>,
    /// Boolean attribute inverting the sides a feature is drawn on. Null and false keep the
    /// default placement. Included in the aggregation.
    pub invert_sides_attribute: Option<String>,
    /// Minimum line width in pixels
    pub min_line_width: i64,
    /// Maximum line width in pixels
    pub max_line_width: i64,
    /// Draw the stacks on both sides of the line
    pub draw_on_both_sides: bool,
    /// Spacing in pixels between the lines of a stack and to the original line
    pub spacing_between_stack_entries: i64,
    /// Render script replacing the min/max width rule; blank disables scripting
    pub render_script: String,
    /// Exposed to the render script as `customVariable1`
    pub script_custom_variable1: String,
    /// Exposed to the render script as `customVariable2`
    pub script_custom_variable2: String,
    /// Bounding box of the output image in map units
    pub output_bbox: Rect<f64>,
    /// Output image width in pixels
    pub output_width: u32,
    /// Output image height in pixels
    pub output_height: u32,
    /// Log the time spent in each phase at INFO level
    pub enable_duration_measurement: bool,
    /// File receiving SQL insert statements of the generated lines, for debugging only
    pub debug_sql_file: Option<PathBuf>,
}

impl Default for StackParams {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            order_attribute: None,
            invert_sides_attribute: None,
            min_line_width: 8,
            max_line_width: 80,
            draw_on_both_sides: true,
            spacing_between_stack_entries: 0,
            render_script: String::new(),
            script_custom_variable1: String::new(),
            script_custom_variable2: String::new(),
            output_bbox: Rect::new(
                geo::Coord { x: 0.0, y: 0.0 },
                geo::Coord {
                    x: 1024.0,
                    y: 768.0,
                },
            ),
            output_width: 1024,
            output_height: 768,
            enable_duration_measurement: false,
            debug_sql_file: None,
        }
    }
}

impl StackParams {
    /// Split a comma separated attribute list, ignoring blank entries
    pub fn parse_attributes(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Full list of aggregation attributes: `attributes`, then the order and invert-sides
    /// attributes when set
    pub fn aggregation_attributes(&self) -> Vec<String> {
        let mut names = self.attributes.clone();
        for extra in [&self.order_attribute, &self.invert_sides_attribute]
            .into_iter()
            .flatten()
        {
            if !extra.is_empty() && !names.contains(extra) {
                names.push(extra.clone());
            }
        }
        names
    }

    /// Check the request level constraints
    pub fn validate(&self) -> Result<()> {
        ClampWidth::new(self.min_line_width, self.max_line_width).validate()?;
        if self.spacing_between_stack_entries < 0 {
            return Err(StackError::InvalidParameter {
                name: "spacingBetweenStackEntries",
                reason: format!(
                    "has to be a positive value or 0, but currently is {}",
                    self.spacing_between_stack_entries
                ),
            });
        }
        MapUnits::new(self.output_bbox, self.output_width, self.output_height)?;
        Ok(())
    }

    fn uses_script(&self) -> bool {
        !self.render_script.trim().is_empty()
    }
}

/// Everything derived from the parameters and the input schema before features are touched
struct Prepared {
    units: MapUnits,
    key_attributes: Vec<String>,
    output_schema: Schema,
}

/// The stacking transform
#[derive(Debug, Clone)]
pub struct StackProcess {
    params: StackParams,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl StackProcess {
    pub fn new(params: StackParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &StackParams {
        &self.params
    }

    /// Run the transform, choosing the width strategy from the parameters.
    ///
    /// A non-blank `render_script` selects the scripted strategy; the script runtime lives for
    /// this call only and is released before returning, on success and on error.
    pub fn execute<I>(
        &self,
        schema: &Schema,
        features: I,
        progress: &mut dyn ProgressListener,
    ) -> Result<FeatureCollection>
    where
        I: IntoIterator<Item = Feature>,
    {
        let prepared = self.prepare(schema)?;

        if self.params.uses_script() {
            tracing::info!("Creating render script runtime");
            let mut resolver = ScriptedWidth::new(RhaiScript::new(&self.params.render_script)?)
                .with_custom_variables(
                    &self.params.script_custom_variable1,
                    &self.params.script_custom_variable2,
                )?
                .initialize()?;
            let result = self.run(prepared, features, &mut resolver, progress);
            resolver.release();
            result
        } else {
            let mut resolver = ClampWidth::new(self.params.min_line_width, self.params.max_line_width);
            self.run(prepared, features, &mut resolver, progress)
        }
    }

    /// Run the transform with a caller supplied width strategy
    pub fn execute_with<I, W>(
        &self,
        schema: &Schema,
        features: I,
        resolver: &mut W,
        progress: &mut dyn ProgressListener,
    ) -> Result<FeatureCollection>
    where
        I: IntoIterator<Item = Feature>,
        W: WidthResolver + ?Sized,
    {
        let prepared = self.prepare(schema)?;
        self.run(prepared, features, resolver, progress)
    }

    /// Validation and schema derivation; fails before any feature is processed
    fn prepare(&self, schema: &Schema) -> Result<Prepared> {
        schema.assert_geometry_type(GeometryType::LineString)?;
        self.params.validate()?;

        let units = MapUnits::new(
            self.params.output_bbox,
            self.params.output_width,
            self.params.output_height,
        )?;
        let key_attributes = self.params.aggregation_attributes();
        let output_schema = schema
            .project(&key_attributes)?
            .with_stack_attributes(AGG_COUNT_ATTRIBUTE_NAME, WIDTH_ATTRIBUTE_NAME)?;

        Ok(Prepared {
            units,
            key_attributes,
            output_schema,
        })
    }

    fn run<I, W>(
        &self,
        prepared: Prepared,
        features: I,
        resolver: &mut W,
        progress: &mut dyn ProgressListener,
    ) -> Result<FeatureCollection>
    where
        I: IntoIterator<Item = Feature>,
        W: WidthResolver + ?Sized,
    {
        let Prepared {
            units,
            key_attributes,
            output_schema,
        } = prepared;
        let measure = self.params.enable_duration_measurement;

        progress.started();

        let aggregator = FeatureAggregator::new(key_attributes);
        let aggregated = measured(measure, "aggregating features", || {
            aggregator.aggregate(features)
        })?;

        let stacks = measured(measure, "creating feature hashes to build line stacks", || {
            build_stacks(aggregated)
        });

        let comparator = OrderComparator::new(self.params.order_attribute.clone());
        let mut output = FeatureCollection::new(output_schema);
        measured(measure, "building the offset lines", || {
            for mut stack in stacks {
                comparator.sort(&mut stack)?;
                self.build_stack(&stack, resolver, &units, &mut output)?;
            }
            Ok::<(), StackError>(())
        })?;

        progress.complete();

        if let Some(path) = &self.params.debug_sql_file {
            tracing::warn!(
                "Writing debug SQL file to {}. This should only be activated for debugging purposes.",
                path.display()
            );
            if let Err(err) = debug_sql::dump_collection_to_sql_file(&output, path, DEBUG_SQL_TABLE)
            {
                tracing::error!("Failed to write debug SQL file {}: {err}", path.display());
            }
        }

        tracing::info!("Returning a collection with {} features", output.len());
        Ok(output)
    }

    /// Lay out the members of one ordered stack and append their offset lines
    fn build_stack<W>(
        &self,
        stack: &Stack,
        resolver: &mut W,
        units: &MapUnits,
        output: &mut FeatureCollection,
    ) -> Result<()>
    where
        W: WidthResolver + ?Sized,
    {
        let both_sides = self.params.draw_on_both_sides;
        let sides: &[Side] = if both_sides {
            &[Side::Left, Side::Right]
        } else {
            &[Side::Left]
        };

        let mut layout = StackLayout::new(self.params.spacing_between_stack_entries as f64);
        for member in &stack.members {
            let length = line_length(&member.feature.geometry);
            let width_px = resolver.resolve(length, member.count)?;

            let (next, placement) = layout.place(width_px as f64);
            let distance = placement.offset_map_units(units, both_sides);
            let inverted = self.is_inverted(member);

            let mut emitted = 0usize;
            for &side in sides {
                let multiplier = side_multiplier(side, inverted);
                match offset_line(&member.feature.geometry, distance * multiplier) {
                    Ok(geometry) => {
                        let suffix =
                            both_sides.then_some(if multiplier > 0.0 { "left" } else { "right" });
                        output.push(output_feature(member, suffix, geometry, width_px));
                        emitted += 1;
                    }
                    Err(err) => tracing::warn!(
                        "Ignoring possible illegal feature {}: {err}",
                        member.feature.id
                    ),
                }
            }

            // A member without any line keeps its band free for the next one
            if emitted > 0 {
                layout = next;
            }
        }
        Ok(())
    }

    fn is_inverted(&self, member: &AggregatedFeature) -> bool {
        let Some(name) = &self.params.invert_sides_attribute else {
            return false;
        };
        match member.feature.attribute(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// `suffix` names the side the line lands on when a member is drawn twice
fn output_feature(
    member: &AggregatedFeature,
    suffix: Option<&str>,
    geometry: LineString<f64>,
    width_px: u32,
) -> Feature {
    let id = match suffix {
        Some(suffix) => format!("{}.{suffix}", member.feature.id),
        None => member.feature.id.clone(),
    };
    let count = i64::try_from(member.count).unwrap_or(i64::MAX);
    let mut feature = Feature::new(id, geometry);
    feature.attributes = member.feature.attributes.clone();
    feature
        .with_attribute(AGG_COUNT_ATTRIBUTE_NAME, count)
        .with_attribute(WIDTH_ATTRIBUTE_NAME, width_px as i64)
}

/// Run `f`, logging its wall time when measuring is enabled
fn measured<T>(enabled: bool, phase: &str, f: impl FnOnce() -> T) -> T {
    if !enabled {
        return f();
    }
    let start = Instant::now();
    let result = f();
    tracing::info!(
        "Spent {:.3} seconds on {phase}",
        start.elapsed().as_secs_f64()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeType;
    use crate::width::tests::CountingRuntime;
    use geo::{Coord, line_string};

    #[derive(Default)]
    struct RecordingProgress {
        started: usize,
        completed: usize,
    }

    impl ProgressListener for RecordingProgress {
        fn started(&mut self) {
            self.started += 1;
        }

        fn complete(&mut self) {
            self.completed += 1;
        }
    }

    fn create_test_params() -> StackParams {
        // One map unit per pixel
        StackParams {
            output_bbox: Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 100.0 }),
            output_width: 100,
            output_height: 100,
            ..StackParams::default()
        }
    }

    fn create_test_schema() -> Schema {
        Schema::new("lines")
            .with_attribute("line", AttributeType::String)
            .with_attribute("order", AttributeType::Int)
            .with_attribute("invert", AttributeType::Bool)
    }

    fn create_test_feature(id: &str, line: &str, order: i64) -> Feature {
        Feature::new(id, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
            .with_attribute("line", line)
            .with_attribute("order", order)
            .with_attribute("invert", false)
    }

    fn offset_y(feature: &Feature) -> f64 {
        feature.geometry.0[0].y
    }

    fn int_attribute(feature: &Feature, name: &str) -> i64 {
        match feature.attribute(name) {
            Some(Value::Int(i)) => *i,
            other => panic!("unexpected {name}: {other:?}"),
        }
    }

    #[test]
    fn test_identical_lines_single_side() {
        let params = StackParams {
            draw_on_both_sides: false,
            ..create_test_params()
        };
        let features: Vec<Feature> = (0..3)
            .map(|i| Feature::new(i.to_string(), line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]))
            .collect();

        let output = StackProcess::new(params)
            .execute(&Schema::new("lines"), features, &mut NoProgress)
            .unwrap();

        assert_eq!(output.len(), 1);
        let feature = &output.features[0];
        assert_eq!(int_attribute(feature, AGG_COUNT_ATTRIBUTE_NAME), 3);
        assert_eq!(int_attribute(feature, WIDTH_ATTRIBUTE_NAME), 8);
        assert_eq!(
            feature.geometry,
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]
        );
    }

    #[test]
    fn test_output_schema() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            ..create_test_params()
        };
        let output = StackProcess::new(params)
            .execute(
                &create_test_schema(),
                vec![create_test_feature("1", "S1", 1)],
                &mut NoProgress,
            )
            .unwrap();
        let names: Vec<&str> = output
            .schema
            .attributes
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["line", "agg_count", "line_width"]);
    }

    #[test]
    fn test_stack_members_are_placed_side_by_side() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            order_attribute: Some("order".to_string()),
            draw_on_both_sides: false,
            spacing_between_stack_entries: 2,
            ..create_test_params()
        };
        let mut features = vec![
            create_test_feature("c", "S3", 3),
            create_test_feature("a", "S1", 1),
            create_test_feature("b", "S2", 2),
        ];
        // Ten more features of S2 make it wider than the minimum width
        for i in 0..10 {
            features.push(create_test_feature(&format!("b{i}"), "S2", 2));
        }

        let output = StackProcess::new(params)
            .execute(&create_test_schema(), features, &mut NoProgress)
            .unwrap();

        let ids: Vec<&str> = output.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let widths: Vec<i64> = output
            .features
            .iter()
            .map(|f| int_attribute(f, WIDTH_ATTRIBUTE_NAME))
            .collect();
        assert_eq!(widths, vec![8, 11, 8]);

        // spacing, then + width + spacing per member
        let offsets: Vec<f64> = output.features.iter().map(offset_y).collect();
        let expected = [2.0, 12.0, 25.0];
        for (offset, expected) in offsets.iter().zip(expected) {
            assert!((offset - expected).abs() < 1e-9, "{offset} != {expected}");
        }
    }

    #[test]
    fn test_both_sides_and_inverted() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            invert_sides_attribute: Some("invert".to_string()),
            ..create_test_params()
        };
        let features = vec![
            create_test_feature("plain", "S1", 1),
            create_test_feature("inverted", "S2", 1).with_attribute("invert", true),
        ];

        let output = StackProcess::new(params)
            .execute(&create_test_schema(), features, &mut NoProgress)
            .unwrap();
        assert_eq!(output.len(), 4);

        let by_id = |id: &str| {
            output
                .features
                .iter()
                .find(|f| f.id == id)
                .map(offset_y)
                .unwrap()
        };
        // First member: half its width away from the line
        assert!((by_id("plain.left") - 4.0).abs() < 1e-9);
        assert!((by_id("plain.right") + 4.0).abs() < 1e-9);
        // Second member starts after the first band and is flipped; ids follow where the
        // lines land
        assert!((by_id("inverted.left") - 12.0).abs() < 1e-9);
        assert!((by_id("inverted.right") + 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_distinct_lines_are_separate_stacks() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            draw_on_both_sides: false,
            ..create_test_params()
        };
        let features = vec![
            create_test_feature("a", "S1", 1),
            Feature::new("b", line_string![(x: 0.0, y: 50.0), (x: 10.0, y: 50.0)])
                .with_attribute("line", "S2")
                .with_attribute("order", 1i64)
                .with_attribute("invert", false),
        ];

        let output = StackProcess::new(params)
            .execute(&create_test_schema(), features, &mut NoProgress)
            .unwrap();
        // Both are the first member of their own stack, so neither is moved
        assert_eq!(output.len(), 2);
        assert!((offset_y(&output.features[0]) - 0.0).abs() < 1e-9);
        assert!((offset_y(&output.features[1]) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_min_line_width_fails_before_processing() {
        let params = StackParams {
            min_line_width: 0,
            ..create_test_params()
        };
        let mut progress = RecordingProgress::default();
        let result = StackProcess::new(params).execute(
            &create_test_schema(),
            vec![create_test_feature("1", "S1", 1)],
            &mut progress,
        );
        assert!(matches!(
            result,
            Err(StackError::InvalidParameter {
                name: "minLineWidth",
                ..
            })
        ));
        assert_eq!(progress.started, 0);
    }

    #[test]
    fn test_negative_spacing_fails() {
        let params = StackParams {
            spacing_between_stack_entries: -1,
            ..create_test_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_non_line_schema_fails() {
        let mut schema = create_test_schema();
        schema.geometry_type = GeometryType::Point;
        let result = StackProcess::new(create_test_params()).execute(
            &schema,
            Vec::new(),
            &mut NoProgress,
        );
        assert!(matches!(result, Err(StackError::InvalidGeometryType { .. })));
    }

    #[test]
    fn test_bad_script_fails_before_processing() {
        let params = StackParams {
            render_script: "fn line_width(length, count) {".to_string(),
            ..create_test_params()
        };
        let mut progress = RecordingProgress::default();
        let result = StackProcess::new(params).execute(
            &create_test_schema(),
            vec![create_test_feature("1", "S1", 1)],
            &mut progress,
        );
        assert!(matches!(result, Err(StackError::Script(_))));
        assert_eq!(progress.started, 0);
    }

    #[test]
    fn test_render_script_width() {
        let params = StackParams {
            draw_on_both_sides: false,
            render_script: r#"
                fn line_width(length, count) {
                    parse_int(customVariable1) + count
                }
            "#
            .to_string(),
            script_custom_variable1: "20".to_string(),
            ..create_test_params()
        };
        let features: Vec<Feature> = (0..2)
            .map(|i| create_test_feature(&i.to_string(), "S1", 1))
            .collect();
        let mut progress = RecordingProgress::default();
        let output = StackProcess::new(params)
            .execute(&create_test_schema(), features, &mut progress)
            .unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(int_attribute(&output.features[0], WIDTH_ATTRIBUTE_NAME), 22);
        assert_eq!((progress.started, progress.completed), (1, 1));
    }

    #[test]
    fn test_failing_script_top_level_fails_before_processing() {
        let params = StackParams {
            render_script: r#"throw "broken"; fn line_width(length, count) { 8 }"#.to_string(),
            ..create_test_params()
        };
        let mut progress = RecordingProgress::default();
        let result = StackProcess::new(params).execute(
            &create_test_schema(),
            Vec::new(),
            &mut progress,
        );
        assert!(matches!(result, Err(StackError::Script(_))));
        assert_eq!(progress.started, 0);
    }

    #[test]
    fn test_script_top_level_sees_custom_variables() {
        let params = StackParams {
            draw_on_both_sides: false,
            render_script: r#"
                let base = parse_int(customVariable2);
                fn line_width(length, count) { parse_int(customVariable2) * count }
            "#
            .to_string(),
            script_custom_variable2: "6".to_string(),
            ..create_test_params()
        };
        let output = StackProcess::new(params)
            .execute(
                &create_test_schema(),
                vec![create_test_feature("1", "S1", 1)],
                &mut NoProgress,
            )
            .unwrap();
        assert_eq!(int_attribute(&output.features[0], WIDTH_ATTRIBUTE_NAME), 6);
    }

    #[test]
    fn test_collapsed_line_is_skipped() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            order_attribute: Some("order".to_string()),
            draw_on_both_sides: false,
            spacing_between_stack_entries: 2,
            ..create_test_params()
        };
        let collapsed = |id: &str, line: &str| {
            Feature::new(id, line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)])
                .with_attribute("line", line)
                .with_attribute("order", 1i64)
                .with_attribute("invert", false)
        };
        let features = vec![
            collapsed("dot1", "D1"),
            create_test_feature("a", "S1", 1),
            collapsed("dot2", "D2"),
            create_test_feature("b", "S2", 2),
        ];

        let output = StackProcess::new(params)
            .execute(&create_test_schema(), features, &mut NoProgress)
            .unwrap();

        let ids: Vec<&str> = output.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        // The valid stack is laid out as if the collapsed lines never existed
        assert!((offset_y(&output.features[0]) - 2.0).abs() < 1e-9);
        assert!((offset_y(&output.features[1]) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_script_failure_aborts_and_releases_once() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            ..create_test_params()
        };
        let features: Vec<Feature> = (0..5)
            .map(|i| create_test_feature(&i.to_string(), &format!("S{i}"), 1))
            .collect();

        let runtime = CountingRuntime::new(Some(2));
        let calls = runtime.calls.clone();
        let releases = runtime.releases.clone();
        let mut progress = RecordingProgress::default();
        let result = {
            let mut resolver = ScriptedWidth::new(runtime);
            StackProcess::new(params).execute_with(
                &create_test_schema(),
                features,
                &mut resolver,
                &mut progress,
            )
        };

        assert!(matches!(result, Err(StackError::Script(_))));
        assert_eq!(calls.get(), 2);
        assert_eq!(releases.get(), 1);
        assert_eq!(progress.completed, 0);
    }

    #[test]
    fn test_missing_key_attribute_in_feature() {
        let params = StackParams {
            attributes: vec!["line".to_string()],
            ..create_test_params()
        };
        let features = vec![Feature::new(
            "no-line",
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
        )];
        let result =
            StackProcess::new(params).execute(&create_test_schema(), features, &mut NoProgress);
        assert!(matches!(result, Err(StackError::MissingAttribute { .. })));
    }

    #[test]
    fn test_parse_attributes() {
        assert_eq!(
            StackParams::parse_attributes(" line, color ,,operator"),
            vec!["line", "color", "operator"]
        );
        assert!(StackParams::parse_attributes("").is_empty());
    }

    #[test]
    fn test_aggregation_attributes() {
        let params = StackParams {
            attributes: vec!["line".to_string(), "order".to_string()],
            order_attribute: Some("order".to_string()),
            invert_sides_attribute: Some("invert".to_string()),
            ..StackParams::default()
        };
        assert_eq!(
            params.aggregation_attributes(),
            vec!["line", "order", "invert"]
        );
    }

    #[test]
    fn test_default_params() {
        let params = StackParams::default();
        assert_eq!(params.min_line_width, 8);
        assert_eq!(params.max_line_width, 80);
        assert!(params.draw_on_both_sides);
        assert_eq!(params.spacing_between_stack_entries, 0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_debug_sql_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stacks.sql");
        let params = StackParams {
            draw_on_both_sides: false,
            debug_sql_file: Some(path.clone()),
            ..create_test_params()
        };
        StackProcess::new(params)
            .execute(
                &Schema::new("lines"),
                vec![Feature::new(
                    "1",
                    line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                )],
                &mut NoProgress,
            )
            .unwrap();
        let sql = std::fs::read_to_string(path).unwrap();
        assert!(sql.contains("INSERT INTO stacked_lines"));
    }
}
