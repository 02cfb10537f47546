//! Built-in functions exposed to formulas and macros.
//!
//! Conventions:
//! - Cell accessors take `(row, col)` as integers, zero-based.
//! - Aggregates take a row selector and a column selector, each either an
//!   integer or a range (`R[0:3]`, `slice(0, 3)`, `0..3`).
//! - Writes outside the grid fail; reads outside it yield `""`.

use std::collections::VecDeque;
use std::ops::{Range, RangeInclusive};
use std::sync::{Arc, Mutex, PoisonError};

use rhai::{Array, Dynamic, Engine, EvalAltResult, Position};

use crate::engine::{CellPos, CellStore, RangeAddressor, Rgb, Selector, Slice, format_result};
use crate::numeric;

/// Cells whose text was set to a formula from inside a script, waiting to be
/// evaluated once the current evaluation finishes.
pub type PendingCommits = Arc<Mutex<VecDeque<CellPos>>>;

/// Take everything queued so far.
pub fn take_pending(pending: &PendingCommits) -> Vec<CellPos> {
    let mut queue = pending.lock().unwrap_or_else(PoisonError::into_inner);
    queue.drain(..).collect()
}

fn invalid_arg(message: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
}

/// Interpret a script value as an axis selector.
pub fn selector_from_dynamic(value: &Dynamic) -> Result<Selector, Box<EvalAltResult>> {
    if let Ok(index) = value.as_int() {
        return Ok(Selector::Scalar(index));
    }
    if let Some(selector) = value.clone().try_cast::<Selector>() {
        return Ok(selector);
    }
    if let Some(range) = value.clone().try_cast::<Range<i64>>() {
        return Ok(Selector::Range(Slice::unit(range.start, range.end)));
    }
    if let Some(range) = value.clone().try_cast::<RangeInclusive<i64>>() {
        return Ok(Selector::Range(Slice::unit(
            *range.start(),
            range.end().saturating_add(1),
        )));
    }
    Err(invalid_arg(&format!(
        "expected an integer index or a range, got {}",
        value.type_name()
    )))
}

fn new_slice(start: i64, stop: i64, step: i64) -> Result<Selector, Box<EvalAltResult>> {
    Slice::new(start, stop, step)
        .map(Selector::Range)
        .map_err(|e| invalid_arg(&e.to_string()))
}

fn color(r: i64, g: i64, b: i64) -> Result<Rgb, Box<EvalAltResult>> {
    Rgb::from_components(r, g, b).ok_or_else(|| {
        invalid_arg(&format!(
            "color components must be in 0..=255, got ({}, {}, {})",
            r, g, b
        ))
    })
}

fn position(store: &CellStore, row: i64, col: i64) -> Result<CellPos, Box<EvalAltResult>> {
    store
        .position(row, col)
        .map_err(|e| invalid_arg(&e.to_string()))
}

/// Gather the texts addressed by two selectors and convert them to floats.
fn gather_floats(
    store: &CellStore,
    rows: &Dynamic,
    cols: &Dynamic,
) -> Result<Vec<f64>, Box<EvalAltResult>> {
    let rows = selector_from_dynamic(rows)?;
    let cols = selector_from_dynamic(cols)?;
    let values = store
        .get_values(&rows, &cols)
        .map_err(|e| invalid_arg(&e.to_string()))?;
    values.iter().map(|v| numeric::parse_float(v)).collect()
}

/// Register the `Selector` and `RangeAddressor` script types.
pub fn register_selector_type(engine: &mut Engine) {
    engine.register_type_with_name::<Selector>("range");
    engine.register_iterator::<Selector>();
    engine.register_fn("len", |s: Selector| s.len() as i64);
    engine.register_fn("is_empty", |s: Selector| s.is_empty());
    engine.register_fn(
        "to_array",
        |s: Selector| -> Result<Array, Box<EvalAltResult>> {
            numeric::check_expanded_len(s.len() as u128)?;
            Ok(s.iter().map(Dynamic::from).collect())
        },
    );
    engine.register_fn("contains", |s: Selector, index: i64| match s {
        Selector::Scalar(k) => k == index,
        Selector::Range(slice) => slice.contains(index),
    });
    engine.register_fn("to_string", |s: Selector| s.to_string());
    engine.register_fn("to_debug", |s: Selector| s.to_string());
    engine.register_fn("==", |a: Selector, b: Selector| a == b);
    engine.register_fn("!=", |a: Selector, b: Selector| a != b);
    engine.register_indexer_get(
        |s: &mut Selector, position: i64| -> Result<i64, Box<EvalAltResult>> {
            s.nth(position)
                .ok_or_else(|| invalid_arg("range object index out of range"))
        },
    );

    // slice(start, stop[, step])
    engine.register_fn("slice", |start: i64, stop: i64| {
        Selector::Range(Slice::unit(start, stop))
    });
    engine.register_fn("slice", new_slice);

    // R[k] -> k, R[a:b:s] -> range
    engine.register_type_with_name::<RangeAddressor>("RangeAddressor");
    engine.register_indexer_get(|_: &mut RangeAddressor, index: i64| index);
    engine.register_indexer_get(|_: &mut RangeAddressor, selector: Selector| selector);
    engine.register_indexer_get(|_: &mut RangeAddressor, range: Range<i64>| {
        Selector::Range(Slice::unit(range.start, range.end))
    });
    engine.register_indexer_get(|_: &mut RangeAddressor, range: RangeInclusive<i64>| {
        Selector::Range(Slice::unit(*range.start(), range.end().saturating_add(1)))
    });
}

/// Register the built-ins available to both formulas and macros.
pub fn register_builtins(engine: &mut Engine, store: CellStore, pending: PendingCommits) {
    register_selector_type(engine);

    // get_cell_value(row, col)
    let store_get = store.clone();
    engine.register_fn("get_cell_value", move |row: i64, col: i64| -> String {
        match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) => store_get.get_value(CellPos::new(r, c)),
            _ => String::new(),
        }
    });

    // set_cell_value(row, col, value)
    let store_set = store.clone();
    engine.register_fn(
        "set_cell_value",
        move |row: i64, col: i64, value: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let pos = position(&store_set, row, col)?;
            let text = format_result(&value);
            let is_formula = text.starts_with(crate::engine::FORMULA_MARKER);
            store_set
                .set_value(pos, text)
                .map_err(|e| invalid_arg(&e.to_string()))?;
            if is_formula {
                pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(pos);
            }
            Ok(())
        },
    );

    // set_cell_color(row, col, r, g, b)
    let store_bg = store.clone();
    engine.register_fn(
        "set_cell_color",
        move |row: i64, col: i64, r: i64, g: i64, b: i64| -> Result<(), Box<EvalAltResult>> {
            let pos = position(&store_bg, row, col)?;
            store_bg
                .set_background(pos, color(r, g, b)?)
                .map_err(|e| invalid_arg(&e.to_string()))
        },
    );

    // set_cell_text_color(row, col, r, g, b)
    let store_fg = store.clone();
    engine.register_fn(
        "set_cell_text_color",
        move |row: i64, col: i64, r: i64, g: i64, b: i64| -> Result<(), Box<EvalAltResult>> {
            let pos = position(&store_fg, row, col)?;
            store_fg
                .set_foreground(pos, color(r, g, b)?)
                .map_err(|e| invalid_arg(&e.to_string()))
        },
    );

    // get_values(rows, cols)
    let store_values = store.clone();
    engine.register_fn(
        "get_values",
        move |rows: Dynamic, cols: Dynamic| -> Result<Array, Box<EvalAltResult>> {
            let rows = selector_from_dynamic(&rows)?;
            let cols = selector_from_dynamic(&cols)?;
            let values = store_values
                .get_values(&rows, &cols)
                .map_err(|e| invalid_arg(&e.to_string()))?;
            Ok(values.into_iter().map(Dynamic::from).collect())
        },
    );

    // sum / mean / std over (rows, cols)
    let store_sum = store.clone();
    engine.register_fn(
        "sum",
        move |rows: Dynamic, cols: Dynamic| -> Result<f64, Box<EvalAltResult>> {
            Ok(numeric::sum(&gather_floats(&store_sum, &rows, &cols)?))
        },
    );

    let store_mean = store.clone();
    engine.register_fn(
        "mean",
        move |rows: Dynamic, cols: Dynamic| -> Result<f64, Box<EvalAltResult>> {
            Ok(numeric::mean(&gather_floats(&store_mean, &rows, &cols)?))
        },
    );

    let store_std = store;
    engine.register_fn(
        "std",
        move |rows: Dynamic, cols: Dynamic| -> Result<f64, Box<EvalAltResult>> {
            Ok(numeric::std(&gather_floats(&store_std, &rows, &cols)?))
        },
    );
}

/// Register macro-only write built-ins. Not available in cell formulas.
pub fn register_script_builtins(engine: &mut Engine, store: CellStore) {
    // clear_cell(row, col)
    engine.register_fn(
        "clear_cell",
        move |row: i64, col: i64| -> Result<(), Box<EvalAltResult>> {
            let pos = position(&store, row, col)?;
            store.clear(pos).map_err(|e| invalid_arg(&e.to_string()))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Cell, preprocess_script};

    fn setup(rows: usize, cols: usize) -> (CellStore, PendingCommits, Engine) {
        let store = CellStore::new(rows, cols);
        let pending = PendingCommits::default();
        let mut engine = Engine::new();
        register_builtins(&mut engine, store.clone(), pending.clone());
        (store, pending, engine)
    }

    fn with_addressor(engine: &Engine, script: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let mut scope = rhai::Scope::new();
        scope.push("R", RangeAddressor);
        engine.eval_with_scope::<Dynamic>(&mut scope, &preprocess_script(script))
    }

    #[test]
    fn test_get_cell_value() {
        let (store, _, engine) = setup(3, 3);
        store.set_value(CellPos::new(1, 2), "hello").unwrap();
        assert_eq!(engine.eval::<String>("get_cell_value(1, 2)").unwrap(), "hello");
        assert_eq!(engine.eval::<String>("get_cell_value(0, 0)").unwrap(), "");
        assert_eq!(engine.eval::<String>("get_cell_value(-1, 99)").unwrap(), "");
    }

    #[test]
    fn test_set_cell_color_and_text_color() {
        let (store, _, engine) = setup(2, 2);
        engine.run("set_cell_color(0, 1, 255, 0, 0)").unwrap();
        engine.run("set_cell_text_color(0, 1, 0, 128, 0)").unwrap();
        let cell = store.get(CellPos::new(0, 1)).unwrap();
        assert_eq!(cell.background, Rgb(255, 0, 0));
        assert_eq!(cell.foreground, Rgb(0, 128, 0));
    }

    #[test]
    fn test_set_color_rejects_bad_input() {
        let (_, _, engine) = setup(2, 2);
        assert!(engine.run("set_cell_color(0, 0, 300, 0, 0)").is_err());
        assert!(engine.run("set_cell_color(5, 0, 1, 1, 1)").is_err());
    }

    #[test]
    fn test_set_cell_value_queues_formulas() {
        let (store, pending, engine) = setup(2, 2);
        engine.run(r#"set_cell_value(0, 0, 42); set_cell_value(1, 1, "=1+1")"#).unwrap();
        assert_eq!(store.get_value(CellPos::new(0, 0)), "42");
        assert_eq!(store.get_value(CellPos::new(1, 1)), "=1+1");
        assert_eq!(take_pending(&pending), vec![CellPos::new(1, 1)]);
        assert!(take_pending(&pending).is_empty());
    }

    #[test]
    fn test_aggregates_over_selectors() {
        let (store, _, engine) = setup(3, 2);
        for (row, value) in ["1", "2", "3"].iter().enumerate() {
            store.set_value(CellPos::new(row, 0), *value).unwrap();
        }
        let total = with_addressor(&engine, "sum(R[0:3], 0)").unwrap();
        assert_eq!(total.cast::<f64>(), 6.0);
        let avg = with_addressor(&engine, "mean(0..3, R[0])").unwrap();
        assert_eq!(avg.cast::<f64>(), 2.0);
        let spread = with_addressor(&engine, "std(slice(0, 3), 0)").unwrap();
        assert!((spread.cast::<f64>() - 0.816496580927726).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_non_numeric_fails() {
        let (store, _, engine) = setup(2, 1);
        store.set_value(CellPos::new(0, 0), "1").unwrap();
        store.set_value(CellPos::new(1, 0), "abc").unwrap();
        let err = with_addressor(&engine, "sum(R[0:2], 0)").unwrap_err();
        assert!(err.to_string().contains("could not convert string to float: 'abc'"));
    }

    #[test]
    fn test_aggregate_outside_grid_fails() {
        let (store, _, engine) = setup(2, 1);
        store.set_value(CellPos::new(0, 0), "1").unwrap();
        store.set_value(CellPos::new(1, 0), "2").unwrap();
        let err = with_addressor(&engine, "sum(R[0:5], 0)").unwrap_err();
        assert!(err.to_string().contains("no cell at (2, 0)"));
    }

    #[test]
    fn test_get_values_returns_strings() {
        let (store, _, engine) = setup(1, 3);
        store.set_value(CellPos::new(0, 2), "z").unwrap();
        let values: Array = engine.eval("get_values(0, 0..3)").unwrap();
        let values: Vec<String> = values.into_iter().map(|v| v.cast::<String>()).collect();
        assert_eq!(values, vec!["", "", "z"]);
    }

    #[test]
    fn test_addressor_indexing() {
        let (_, _, engine) = setup(1, 1);
        assert_eq!(with_addressor(&engine, "R[4]").unwrap().cast::<i64>(), 4);
        let selector = with_addressor(&engine, "R[2:8:3]").unwrap().cast::<Selector>();
        assert_eq!(selector, Selector::Range(Slice::new(2, 8, 3).unwrap()));
        let total = with_addressor(&engine, "let t = 0; for i in R[0:4] { t += i; } t").unwrap();
        assert_eq!(total.cast::<i64>(), 6);
        assert_eq!(with_addressor(&engine, "R[0:4].len()").unwrap().cast::<i64>(), 4);
        assert_eq!(with_addressor(&engine, "R[0:10:2][-1]").unwrap().cast::<i64>(), 8);
        assert!(with_addressor(&engine, "3 in R[0:10:3]").unwrap().cast::<bool>());
        assert!(with_addressor(&engine, "R[0:3:0]").is_err());

        let small = with_addressor(&engine, "R[0:3].to_array()").unwrap();
        assert_eq!(small.into_array().unwrap().len(), 3);
        assert!(with_addressor(&engine, "R[0:4000000000].to_array()").is_err());
    }

    #[test]
    fn test_clear_cell_is_script_only() {
        let (store, _, mut engine) = setup(1, 1);
        assert!(engine.run("clear_cell(0, 0)").is_err());

        store.set_value(CellPos::new(0, 0), "x").unwrap();
        store.set_background(CellPos::new(0, 0), Rgb(1, 2, 3)).unwrap();
        register_script_builtins(&mut engine, store.clone());
        engine.run("clear_cell(0, 0)").unwrap();
        assert_eq!(store.get(CellPos::new(0, 0)), Some(Cell::default()));
    }
}
