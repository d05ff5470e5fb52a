//! The persistent execution context.
//!
//! [`ExecutionContext`] wraps a [`rhai::Engine`] configured for
//! interactive use: a persistent [`Scope`] carries variable bindings
//! from one fragment to the next, and an accumulated function-library
//! [`AST`] carries `fn` definitions, so evaluation behaves like a
//! read-eval-print-loop step rather than a one-shot expression
//! evaluator. Everything a fragment prints is captured into an
//! [`OutputSink`] and returned as text.

use std::path::Path;

use rhai::{AST, Dynamic, Engine, FnPtr, ParseErrorType, Scope};
use tracing::debug;

use crate::error::ContextError;
use crate::model::register_model_api;
use crate::sink::OutputSink;

/// Fragment compiled into every fresh context before any user
/// extension loads, so the model factory is always present.
const SEED_FRAGMENT: &str = "fn init() { new_model() }";

/// Outcome of one [`ExecutionContext::evaluate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalReport {
    /// Everything the fragment printed, plus the echoed value of a
    /// final non-unit expression, plus any fault text.
    pub output: String,
    /// Whether the fragment raised or failed to parse.
    pub faulted: bool,
    /// Whether the fragment was an incomplete block and is being held
    /// in the continuation buffer awaiting more input.
    pub incomplete: bool,
}

impl EvalReport {
    fn incomplete() -> Self {
        Self {
            output: String::new(),
            faulted: false,
            incomplete: true,
        }
    }
}

/// A persistent scripting namespace with incremental evaluation.
///
/// Exactly one context is current at any time; the
/// [`ReloadController`](crate::reload::ReloadController) may discard it
/// and swap in a fresh one, losing all namespace state.
pub struct ExecutionContext {
    engine: Engine,
    scope: Scope<'static>,
    /// Accumulated `fn` definitions from evaluated fragments and
    /// loaded scripts.
    lib: AST,
    sink: OutputSink,
    /// Continuation buffer for incomplete multi-line fragments.
    pending: String,
    /// Exception flag for the most recent completed evaluation only.
    faulted: bool,
}

impl ExecutionContext {
    /// Build a fresh context: empty namespace, model API registered,
    /// `init()` factory seeded, and the optional extension script
    /// loaded on top.
    pub fn new(extension: Option<&Path>) -> Result<Self, ContextError> {
        let sink = OutputSink::new();
        let mut engine = Engine::new();

        // Route all script output into the explicit sink. `print`
        // emits one line per call, like the stream it replaces.
        let print_sink = sink.clone();
        engine.on_print(move |text| print_sink.push_line(text));
        let debug_sink = sink.clone();
        engine.on_debug(move |text, _source, _pos| debug_sink.push_line(text));

        register_model_api(&mut engine);

        let lib = engine
            .compile(SEED_FRAGMENT)
            .map_err(|e| ContextError::Seed(e.to_string()))?;

        let mut context = Self {
            engine,
            scope: Scope::new(),
            lib,
            sink,
            pending: String::new(),
            faulted: false,
        };

        if let Some(path) = extension {
            context.load_script(path, None)?;
        }

        Ok(context)
    }

    /// Whether the most recent completed evaluation faulted.
    pub const fn faulted(&self) -> bool {
        self.faulted
    }

    /// Evaluate one source fragment against the namespace.
    ///
    /// Assignments, imports, and `fn` definitions persist into
    /// subsequent calls. The returned report carries everything the
    /// fragment printed; the value of a final non-unit expression is
    /// echoed into the output followed by a newline.
    ///
    /// A fragment that ends mid-block is held in a continuation buffer
    /// and reported as incomplete; the next fragment is appended to it
    /// and the combined text re-tried. Parse and runtime faults set the
    /// exception flag for this call only and append the fault text to
    /// whatever output was already captured.
    pub fn evaluate(&mut self, fragment: &str) -> EvalReport {
        self.faulted = false;
        self.sink.clear();

        let source = if self.pending.is_empty() {
            fragment.to_owned()
        } else {
            format!("{}\n{fragment}", self.pending)
        };

        let ast = match self.engine.compile(&source) {
            Ok(ast) => ast,
            Err(err) if is_incomplete(&err, &source) => {
                debug!(buffered = source.len(), "fragment incomplete, buffering");
                self.pending = source;
                return EvalReport::incomplete();
            }
            Err(err) => {
                self.pending.clear();
                self.faulted = true;
                self.sink.push_line(&err.to_string());
                return EvalReport {
                    output: self.sink.contents(),
                    faulted: true,
                    incomplete: false,
                };
            }
        };
        self.pending.clear();

        // Run the new fragment with every previously defined function
        // in reach. `lib` never carries statements, so only the new
        // fragment's statements execute.
        let combined = self.lib.merge(&ast);
        match self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &combined)
        {
            Ok(value) => {
                if !value.is_unit() {
                    self.sink.push_line(&value.to_string());
                }
                self.lib = self.lib.merge(&ast.clone_functions_only());
                EvalReport {
                    output: self.sink.contents(),
                    faulted: false,
                    incomplete: false,
                }
            }
            Err(err) => {
                self.faulted = true;
                self.sink.push_line(&err.to_string());
                EvalReport {
                    output: self.sink.contents(),
                    faulted: true,
                    incomplete: false,
                }
            }
        }
    }

    /// Invoke a named routine with keyword arguments.
    ///
    /// Routines are script functions defined by evaluated fragments or
    /// loaded scripts, including the seeded `init()`; a name that is
    /// not in the function library but is bound in scope to a function
    /// pointer (a closure) is called through that pointer instead. A
    /// non-empty keyword mapping is delivered as a single object-map
    /// argument; an empty one calls the routine with no arguments.
    ///
    /// # Errors
    ///
    /// [`ContextError::NoSuchRoutine`] when the name is neither a
    /// function nor a callable binding;
    /// [`ContextError::Invocation`] when the routine itself raises.
    /// Neither is captured as text -- both propagate to the caller.
    pub fn invoke(
        &mut self,
        routine: &str,
        kwargs: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Dynamic, ContextError> {
        let mut payload = None;
        if !kwargs.is_empty() {
            let mut map = rhai::Map::new();
            for (key, value) in kwargs {
                map.insert(key.as_str().into(), crate::convert::json_to_dynamic(value)?);
            }
            payload = Some(map);
        }

        let result = if self.lib.iter_functions().any(|f| f.name == routine) {
            match payload {
                Some(map) => {
                    self.engine
                        .call_fn::<Dynamic>(&mut self.scope, &self.lib, routine, (map,))
                }
                None => self
                    .engine
                    .call_fn::<Dynamic>(&mut self.scope, &self.lib, routine, ()),
            }
        } else if let Some(pointer) = self.scope.get_value::<FnPtr>(routine) {
            match payload {
                Some(map) => pointer.call::<Dynamic>(&self.engine, &self.lib, (map,)),
                None => pointer.call::<Dynamic>(&self.engine, &self.lib, ()),
            }
        } else {
            return Err(ContextError::NoSuchRoutine(routine.to_owned()));
        };

        result.map_err(|source| ContextError::Invocation {
            routine: routine.to_owned(),
            source,
        })
    }

    /// Read a variable from the namespace.
    ///
    /// # Errors
    ///
    /// [`ContextError::NoSuchVariable`] when the name is not bound.
    pub fn read(&self, name: &str) -> Result<Dynamic, ContextError> {
        self.scope
            .get_value::<Dynamic>(name)
            .ok_or_else(|| ContextError::NoSuchVariable(name.to_owned()))
    }

    /// Look up a variable without failing; used by the change detector.
    pub fn peek(&self, name: &str) -> Option<Dynamic> {
        self.scope.get_value::<Dynamic>(name)
    }

    /// Bind or rebind a variable unconditionally.
    pub fn write(&mut self, name: &str, value: Dynamic) {
        self.scope.set_value(name.to_owned(), value);
    }

    /// Load a script file into the namespace.
    ///
    /// The file is read from disk every time -- there is no module
    /// cache, so a reload always observes fresh content. The script
    /// runs in a throwaway scope; its top-level bindings (all of them,
    /// or only the listed `symbols`) are then copied into the
    /// namespace, and its `fn` definitions are merged into the function
    /// library. The symbol filter applies to variable bindings;
    /// function libraries are global and merge wholesale.
    pub fn load_script(
        &mut self,
        path: &Path,
        symbols: Option<&[String]>,
    ) -> Result<(), ContextError> {
        let script_load = |message: String| ContextError::ScriptLoad {
            path: path.to_path_buf(),
            message,
        };

        let source = std::fs::read_to_string(path).map_err(|e| script_load(e.to_string()))?;
        let ast = self
            .engine
            .compile(&source)
            .map_err(|e| script_load(e.to_string()))?;

        let mut script_scope = Scope::new();
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut script_scope, &ast)
            .map_err(|e| script_load(e.to_string()))?;

        for (name, _constant, value) in script_scope.iter() {
            let wanted = symbols.is_none_or(|list| list.iter().any(|s| s == name));
            if wanted {
                self.scope.set_value(name.to_owned(), value);
            }
        }
        self.lib = self.lib.merge(&ast.clone_functions_only());

        debug!(path = %path.display(), "script loaded into namespace");
        Ok(())
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("bindings", &self.scope.len())
            .field("faulted", &self.faulted)
            .field("pending", &!self.pending.is_empty())
            .finish_non_exhaustive()
    }
}

/// Whether a parse error means "the fragment just is not finished yet"
/// rather than "the fragment is wrong".
///
/// An unexpected end-of-file is always a continuation; a missing token
/// or symbol counts only when it is reported at the very end of the
/// source, so a genuinely malformed fragment still faults immediately.
fn is_incomplete(err: &rhai::ParseError, source: &str) -> bool {
    match &*err.0 {
        ParseErrorType::UnexpectedEOF => true,
        ParseErrorType::MissingToken(..) | ParseErrorType::MissingSymbol(_) => {
            position_at_end(err.1, source)
        }
        _ => false,
    }
}

fn position_at_end(pos: rhai::Position, source: &str) -> bool {
    let Some(line) = pos.line() else {
        return true;
    };
    let total_lines = source.lines().count().max(1);
    if line > total_lines {
        return true;
    }
    if line < total_lines {
        return false;
    }
    let last_len = source.lines().last().map_or(0, str::len);
    pos.position().is_none_or(|column| column > last_len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fresh() -> ExecutionContext {
        ExecutionContext::new(None).unwrap()
    }

    #[test]
    fn bindings_persist_across_evaluations() {
        let mut ctx = fresh();
        let first = ctx.evaluate("let x = 40;");
        assert!(!first.faulted);

        let second = ctx.evaluate("x + 2");
        assert!(!second.faulted);
        assert_eq!(second.output, "42\n");
    }

    #[test]
    fn final_expression_value_is_echoed() {
        let mut ctx = fresh();
        let report = ctx.evaluate("1+1");
        assert!(!report.faulted);
        assert_eq!(report.output, "2\n");
    }

    #[test]
    fn print_output_is_captured_not_printed() {
        let mut ctx = fresh();
        let report = ctx.evaluate(r#"print("hello"); print("world");"#);
        assert!(!report.faulted);
        assert_eq!(report.output, "hello\nworld\n");
    }

    #[test]
    fn fault_is_per_call_not_sticky() {
        let mut ctx = fresh();
        let bad = ctx.evaluate("1/0");
        assert!(bad.faulted);
        assert!(ctx.faulted());
        assert!(!bad.output.is_empty());

        let good = ctx.evaluate("1+1");
        assert!(!good.faulted);
        assert!(!ctx.faulted());
        assert_eq!(good.output, "2\n");
    }

    #[test]
    fn syntax_error_faults_with_text() {
        let mut ctx = fresh();
        let report = ctx.evaluate("let = ;");
        assert!(report.faulted);
        assert!(!report.output.is_empty());
    }

    #[test]
    fn partial_output_survives_a_fault() {
        let mut ctx = fresh();
        let report = ctx.evaluate(r#"print("before"); 1/0"#);
        assert!(report.faulted);
        assert!(report.output.starts_with("before\n"));
    }

    #[test]
    fn functions_defined_in_one_fragment_are_callable_later() {
        let mut ctx = fresh();
        let def = ctx.evaluate("fn double(n) { n * 2 }");
        assert!(!def.faulted);

        let usage = ctx.evaluate("double(21)");
        assert_eq!(usage.output, "42\n");
    }

    #[test]
    fn incomplete_block_is_buffered_until_finished() {
        let mut ctx = fresh();
        let open = ctx.evaluate("fn add(a, b) {");
        assert!(open.incomplete);
        assert!(!open.faulted);

        let body = ctx.evaluate("a + b");
        assert!(body.incomplete);

        let close = ctx.evaluate("}");
        assert!(!close.incomplete);
        assert!(!close.faulted);

        let usage = ctx.evaluate("add(20, 22)");
        assert_eq!(usage.output, "42\n");
    }

    #[test]
    fn invoke_runs_a_script_function() {
        let mut ctx = fresh();
        ctx.evaluate("fn double(n) { n * 2 }");
        // Keyword arguments arrive as a single object map.
        ctx.evaluate("fn scale(opts) { opts.value * opts.by }");

        let mut kwargs = serde_json::Map::new();
        kwargs.insert(String::from("value"), serde_json::json!(6));
        kwargs.insert(String::from("by"), serde_json::json!(7));
        let result = ctx.invoke("scale", &kwargs).unwrap();
        assert_eq!(result.as_int().unwrap(), 42);
    }

    #[test]
    fn invoke_on_absent_routine_is_a_lookup_fault() {
        let mut ctx = fresh();
        let err = ctx.invoke("missing", &serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, ContextError::NoSuchRoutine(_)));
    }

    #[test]
    fn invoke_reaches_a_scope_bound_closure() {
        let mut ctx = fresh();
        let report = ctx.evaluate("let twice = |opts| opts.n * 2;");
        assert!(!report.faulted, "{}", report.output);

        let mut kwargs = serde_json::Map::new();
        kwargs.insert(String::from("n"), serde_json::json!(21));
        let result = ctx.invoke("twice", &kwargs).unwrap();
        assert_eq!(result.as_int().unwrap(), 42);
    }

    #[test]
    fn invoke_rejects_a_non_callable_binding() {
        let mut ctx = fresh();
        ctx.evaluate("let answer = 42;");
        let err = ctx.invoke("answer", &serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, ContextError::NoSuchRoutine(_)));
    }

    #[test]
    fn invoke_propagates_routine_faults() {
        let mut ctx = fresh();
        ctx.evaluate("fn boom() { throw \"kaput\" }");
        let err = ctx.invoke("boom", &serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, ContextError::Invocation { .. }));
    }

    #[test]
    fn seeded_init_constructs_a_model() {
        let mut ctx = fresh();
        let report = ctx.evaluate("let model = init();");
        assert!(!report.faulted, "init() should be seeded: {}", report.output);
        let value = ctx.peek("model").unwrap();
        assert!(value.clone().try_cast::<crate::model::Model>().is_some());
    }

    #[test]
    fn read_and_write_round_trip() {
        let mut ctx = fresh();
        ctx.write("x", Dynamic::from(5_i64));
        let value = ctx.read("x").unwrap();
        assert_eq!(value.as_int().unwrap(), 5);
    }

    #[test]
    fn read_of_unbound_name_fails() {
        let ctx = fresh();
        let err = ctx.read("ghost").unwrap_err();
        assert!(matches!(err, ContextError::NoSuchVariable(_)));
    }

    #[test]
    fn write_rebinds_unconditionally() {
        let mut ctx = fresh();
        ctx.write("x", Dynamic::from(1_i64));
        ctx.write("x", Dynamic::from(2_i64));
        assert_eq!(ctx.read("x").unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn load_script_binds_variables_and_functions() {
        use std::io::Write as _;

        let mut file = tempfile::Builder::new()
            .suffix(".rhai")
            .tempfile()
            .unwrap();
        writeln!(file, "let greeting = \"hi\";\nfn shout(s) {{ s + \"!\" }}").unwrap();

        let mut ctx = fresh();
        ctx.load_script(file.path(), None).unwrap();

        assert_eq!(ctx.read("greeting").unwrap().to_string(), "hi");
        let report = ctx.evaluate("shout(greeting)");
        assert_eq!(report.output, "hi!\n");
    }

    #[test]
    fn load_script_symbol_filter_limits_variable_bindings() {
        use std::io::Write as _;

        let mut file = tempfile::Builder::new()
            .suffix(".rhai")
            .tempfile()
            .unwrap();
        writeln!(file, "let wanted = 1;\nlet unwanted = 2;").unwrap();

        let mut ctx = fresh();
        ctx.load_script(file.path(), Some(&[String::from("wanted")]))
            .unwrap();

        assert!(ctx.read("wanted").is_ok());
        assert!(ctx.read("unwanted").is_err());
    }

    #[test]
    fn load_script_missing_file_errors() {
        let mut ctx = fresh();
        let err = ctx
            .load_script(Path::new("/nonexistent/ext.rhai"), None)
            .unwrap_err();
        assert!(matches!(err, ContextError::ScriptLoad { .. }));
    }
}
