//! Embedded render scripts computing the pixel width of a stack member
//!
//! A render script is a [Rhai](https://rhai.rs) script defining
//!
//! ```text
//! fn line_width(length, count) { ... }
//! ```
//!
//! where `length` is the length of the line in map units and `count` the number of features
//! merged into the stack member. The function returns the width in pixels, as an integer or a
//! float (rounded). Values registered with [`ScriptRuntime::register_global`] are visible as
//! global variables everywhere in the script, including inside functions.

use crate::{Result, StackError};
use rhai::{AST, CallFnOptions, Dynamic, Engine, FLOAT, INT, Scope};
use std::collections::BTreeMap;

/// Name of the function a render script has to define
pub const WIDTH_FUNCTION_NAME: &str = "line_width";

/// Upper bound of operations per script call, so a runaway script cannot hang a request
const MAX_OPERATIONS: u64 = 1_000_000;

/// Capability boundary to an external script runtime
pub trait ScriptRuntime {
    /// Expose a value to the script as a global variable
    fn register_global(&mut self, name: &str, value: &str) -> Result<()>;

    /// Run the top level of the script once. Globals registered so far are visible to it.
    fn initialize(&mut self) -> Result<()>;

    /// Evaluate the width function for one stack member
    fn resolve_width(&mut self, line_length: f64, agg_count: u64) -> Result<u32>;

    /// Release the resources held by the runtime; further calls fail
    fn release(&mut self);
}

/// [`ScriptRuntime`] backed by the Rhai engine
pub struct RhaiScript {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    globals: BTreeMap<String, Dynamic>,
    /// Top level statements run once, on [`ScriptRuntime::initialize`] or before the first
    /// width query, whichever comes first
    initialized: bool,
    released: bool,
}

impl RhaiScript {
    /// Compile a render script.
    ///
    /// # Errors
    /// [`StackError::Script`] if the script does not compile or does not define
    /// `line_width(length, count)`.
    pub fn new(source: &str) -> Result<Self> {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);

        let ast = engine
            .compile(source)
            .map_err(|e| StackError::Script(format!("failed to compile render script: {e}")))?;

        let defines_width_fn = ast
            .iter_functions()
            .any(|f| f.name == WIDTH_FUNCTION_NAME && f.params.len() == 2);
        if !defines_width_fn {
            return Err(StackError::Script(format!(
                "render script does not define the function {WIDTH_FUNCTION_NAME}(length, count)"
            )));
        }

        Ok(Self {
            engine,
            ast,
            scope: Scope::new(),
            globals: BTreeMap::new(),
            initialized: false,
            released: false,
        })
    }

    /// Functions cannot see the caller's scope, so globals are served by a variable resolver
    fn install_globals(&mut self) {
        let globals = self.globals.clone();
        self.engine
            .on_var(move |name, _index, _context| Ok(globals.get(name).cloned()));
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.released {
            return Err(StackError::Script(
                "render script runtime has already been released".to_string(),
            ));
        }
        Ok(())
    }
}

impl ScriptRuntime for RhaiScript {
    fn register_global(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_usable()?;
        self.globals
            .insert(name.to_string(), Dynamic::from(value.to_string()));
        self.install_globals();
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.initialized {
            return Ok(());
        }
        self.engine
            .run_ast_with_scope(&mut self.scope, &self.ast)
            .map_err(|e| StackError::Script(format!("failed to evaluate render script: {e}")))?;
        self.initialized = true;
        Ok(())
    }

    fn resolve_width(&mut self, line_length: f64, agg_count: u64) -> Result<u32> {
        self.initialize()?;

        let count = INT::try_from(agg_count).unwrap_or(INT::MAX);
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let result: Dynamic = self
            .engine
            .call_fn_with_options(
                options,
                &mut self.scope,
                &self.ast,
                WIDTH_FUNCTION_NAME,
                (line_length as FLOAT, count),
            )
            .map_err(|e| {
                StackError::Script(format!(
                    "{WIDTH_FUNCTION_NAME}({line_length}, {agg_count}) failed: {e}"
                ))
            })?;

        width_from_dynamic(&result).ok_or_else(|| {
            StackError::Script(format!(
                "{WIDTH_FUNCTION_NAME}({line_length}, {agg_count}) returned {result} ({}), expected a non-negative number",
                result.type_name()
            ))
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.scope.clear();
        self.globals.clear();
        self.ast = AST::empty();
        tracing::debug!("Render script runtime released");
    }
}

fn width_from_dynamic(value: &Dynamic) -> Option<u32> {
    if let Ok(i) = value.as_int() {
        return u32::try_from(i).ok();
    }
    let f = value.as_float().ok()?;
    if f.is_finite() && f >= 0.0 && f <= u32::MAX as FLOAT {
        Some(f.round() as u32)
    } else {
        None
    }
}
