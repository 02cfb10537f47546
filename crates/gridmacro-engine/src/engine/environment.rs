//! The session-wide evaluation environment shared by formulas and macros.
//!
//! Holds the Rhai [`Scope`] (top-level variables plus `R`, `X` and `Y`) and
//! every script function defined so far. Nothing is ever removed: each
//! successful compile adds its `fn` definitions, and top-level `let`
//! bindings stay in the scope for the rest of the session.

use rhai::{AST, Dynamic, Engine, EvalAltResult, Scope};

use super::preprocess::preprocess_script;
use super::selector::RangeAddressor;

/// Variable rebound to the evaluated cell's row before every formula.
pub const ROW_VAR: &str = "X";
/// Variable rebound to the evaluated cell's column before every formula.
pub const COL_VAR: &str = "Y";
/// Name the [`RangeAddressor`] is bound under.
pub const ADDRESSOR_VAR: &str = "R";

pub struct Environment {
    scope: Scope<'static>,
    functions: AST,
}

impl Environment {
    pub fn new() -> Self {
        let mut scope = Scope::new();
        scope.push(ADDRESSOR_VAR, RangeAddressor);
        Environment {
            scope,
            functions: AST::empty(),
        }
    }

    /// Rebind `X` and `Y`.
    pub fn bind_position(&mut self, row: usize, col: usize) {
        self.bind(ROW_VAR, row as i64);
        self.bind(COL_VAR, col as i64);
    }

    fn bind(&mut self, name: &'static str, value: i64) {
        // A script may have declared the name as a constant; shadow it.
        if self.scope.is_constant(name).unwrap_or(false) {
            self.scope.push(name, value);
        } else {
            self.scope.set_value(name, value);
        }
    }

    /// Evaluate formula source (without the leading `=`) for cell (row, col).
    pub fn eval_formula(
        &mut self,
        engine: &Engine,
        source: &str,
        row: usize,
        col: usize,
    ) -> Result<Dynamic, Box<EvalAltResult>> {
        self.bind_position(row, col);
        let ast = self.compile(engine, source)?;
        engine.eval_ast_with_scope::<Dynamic>(&mut self.scope, &ast)
    }

    /// Run a whole macro script.
    pub fn run_script(&mut self, engine: &Engine, script: &str) -> Result<(), Box<EvalAltResult>> {
        let ast = self.compile(engine, script)?;
        engine.run_ast_with_scope(&mut self.scope, &ast)
    }

    /// Compile `source`, keep its function definitions, and return it merged
    /// with every function known so far.
    fn compile(&mut self, engine: &Engine, source: &str) -> Result<AST, Box<EvalAltResult>> {
        let processed = preprocess_script(source);
        let ast = engine.compile(&processed).map_err(|e| {
            let parse_type = *e.0;
            let pos = e.1;
            Box::new(EvalAltResult::ErrorParsing(parse_type, pos))
        })?;
        self.functions.combine(ast.clone_functions_only());
        Ok(self.functions.merge(&ast))
    }

    /// Current value of a top-level variable.
    pub fn get(&self, name: &str) -> Option<Dynamic> {
        self.scope.get_value::<Dynamic>(name)
    }

    /// Whether a script function with this name has been defined.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter_functions().any(|f| f.name == name)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
