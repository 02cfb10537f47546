//! Macro execution.
//!
//! A macro is an arbitrary script run against the shared environment with
//! the write built-ins and the `process` module available. Mutations made
//! before an error are kept.

use super::{Document, ErrorReport};

impl Document {
    /// Run a macro script. Returns `false` (and emits one report) when it
    /// stopped at an error.
    pub fn apply_macro(&mut self, script: &str) -> bool {
        log::info!("running macro ({} bytes)", script.len());
        let result = self.env.run_script(&self.script_engine, script);
        self.modified = true;

        let ok = match result {
            Ok(()) => true,
            Err(e) => {
                self.report(ErrorReport::Macro {
                    message: e.to_string(),
                });
                false
            }
        };

        // Formulas the macro wrote are evaluated even if it failed later on.
        self.run_pending(1);
        ok
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, ErrorReport};
    use gridmacro_engine::engine::{CellPos, Rgb};

    #[test]
    fn test_partial_effects_survive_failure() {
        let mut doc = Document::new();
        let ok = doc.apply_macro("set_cell_color(0, 0, 255, 0, 0); throw \"boom\";");
        assert!(!ok);
        assert_eq!(
            doc.store.get(CellPos::new(0, 0)).unwrap().background,
            Rgb(255, 0, 0)
        );
        let reports = doc.take_reports();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], ErrorReport::Macro { .. }));
        assert!(reports[0].to_string().starts_with("Error running macro: "));
    }

    #[test]
    fn test_definitions_visible_to_later_formulas() {
        let mut doc = Document::new();
        assert!(doc.apply_macro("fn square(x) { x * x }\nlet offset = 1;"));
        doc.commit(2, 2, "=square(4) + offset").unwrap();
        assert_eq!(doc.store.get_value(CellPos::new(2, 2)), "17");
        assert!(doc.take_reports().is_empty());
    }

    #[test]
    fn test_macro_writes_and_clears() {
        let mut doc = Document::new();
        doc.commit(1, 1, "old").unwrap();
        assert!(doc.apply_macro(
            "for r in 0..3 { set_cell_value(r, 0, `row ${r}`); }\nclear_cell(1, 1);"
        ));
        assert_eq!(doc.store.get_value(CellPos::new(2, 0)), "row 2");
        assert_eq!(doc.store.get_value(CellPos::new(1, 1)), "");
    }

    #[test]
    fn test_written_formula_is_evaluated() {
        let mut doc = Document::new();
        assert!(doc.apply_macro(r#"set_cell_value(4, 4, "=X + Y");"#));
        assert_eq!(doc.store.get_value(CellPos::new(4, 4)), "8");
    }

    #[test]
    fn test_out_of_grid_write_is_reported() {
        let mut doc = Document::new();
        assert!(!doc.apply_macro("set_cell_value(50, 0, \"x\");"));
        assert_eq!(doc.take_reports().len(), 1);
    }

    #[test]
    fn test_parse_error_changes_nothing() {
        let mut doc = Document::new();
        assert!(!doc.apply_macro("set_cell_value(0, 0, \"x\"); let = ;"));
        assert_eq!(doc.store.get_value(CellPos::new(0, 0)), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_macro_runs_external_program() {
        let mut doc = Document::new();
        assert!(doc.apply_macro(
            r#"let out = process::shell("echo 7").stdout; out.trim(); set_cell_value(0, 0, out);"#
        ));
        assert_eq!(doc.store.get_value(CellPos::new(0, 0)), "7");
    }

    #[test]
    fn test_formulas_cannot_launch_programs() {
        let mut doc = Document::new();
        doc.commit(0, 0, r#"=process::shell("echo 1")"#).unwrap();
        assert_eq!(doc.store.get_value(CellPos::new(0, 0)), crate::document::ERROR_MARKER);
    }
}
