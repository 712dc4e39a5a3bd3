//! Width resolution strategies for stack members

use crate::{Result, ScriptRuntime, StackError};

/// Pixel width of one stack member, chosen once per request
pub trait WidthResolver {
    /// Width in pixels of a member with the given line length (map units) and merge count
    fn resolve(&mut self, line_length: f64, agg_count: u64) -> Result<u32>;
}

/// Width equal to the merge count, clamped into `[min, max]` pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampWidth {
    min: i64,
    max: i64,
}

impl ClampWidth {
    /// Bounds are checked by [`ClampWidth::validate`] before a request starts
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min < 1 {
            return Err(StackError::InvalidParameter {
                name: "minLineWidth",
                reason: format!(
                    "has to be a positive value bigger than 0, but currently is {}",
                    self.min
                ),
            });
        }
        if self.max < 1 {
            return Err(StackError::InvalidParameter {
                name: "maxLineWidth",
                reason: format!(
                    "has to be a positive value bigger than 0, but currently is {}",
                    self.max
                ),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self, agg_count: u64) -> u32 {
        let count = i64::try_from(agg_count).unwrap_or(i64::MAX);
        // Not `clamp`: a max below the min wins, like min(max(..)) does
        let width = count.max(self.min).min(self.max);
        u32::try_from(width.max(0)).unwrap_or(u32::MAX)
    }
}

impl WidthResolver for ClampWidth {
    fn resolve(&mut self, _line_length: f64, agg_count: u64) -> Result<u32> {
        Ok(self.width(agg_count))
    }
}

/// Width computed by a render script.
///
/// Owns the script runtime for the duration of one request and releases it exactly once,
/// either through [`ScriptedWidth::release`] or when dropped, whichever comes first.
pub struct ScriptedWidth<R: ScriptRuntime> {
    runtime: R,
    released: bool,
}

impl<R: ScriptRuntime> ScriptedWidth<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            released: false,
        }
    }

    /// Register the two custom variables every render script can read
    pub fn with_custom_variables(mut self, variable1: &str, variable2: &str) -> Result<Self> {
        self.runtime.register_global("customVariable1", variable1)?;
        self.runtime.register_global("customVariable2", variable2)?;
        Ok(self)
    }

    /// Evaluate the script up front, so a broken script fails before any feature is processed
    pub fn initialize(mut self) -> Result<Self> {
        self.runtime.initialize()?;
        Ok(self)
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.runtime.release();
        }
    }
}

impl<R: ScriptRuntime> WidthResolver for ScriptedWidth<R> {
    fn resolve(&mut self, line_length: f64, agg_count: u64) -> Result<u32> {
        if self.released {
            return Err(StackError::Script(
                "render script runtime has already been released".to_string(),
            ));
        }
        self.runtime.resolve_width(line_length, agg_count)
    }
}

impl<R: ScriptRuntime> Drop for ScriptedWidth<R> {
    fn drop(&mut self) {
        self.release();
    }
}
