//! The `np` module: numeric helpers over arrays and selectors.
//!
//! Formulas and macros call these as `np::mean(xs)` (or `np.mean(xs)`, which
//! preprocessing rewrites).

use rand::Rng;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Module, Position};

use crate::engine::Selector;

/// Longest sequence a selector, range or `np` constructor may expand into.
pub const MAX_EXPANDED_LEN: usize = 1 << 24;

fn invalid_arg(message: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
}

/// Refuse to build a sequence longer than [`MAX_EXPANDED_LEN`].
pub fn check_expanded_len(len: u128) -> Result<(), Box<EvalAltResult>> {
    if len > MAX_EXPANDED_LEN as u128 {
        return Err(invalid_arg(&format!(
            "sequence of {} items exceeds the limit of {}",
            len, MAX_EXPANDED_LEN
        )));
    }
    Ok(())
}

fn span(start: i64, end_exclusive: i128) -> u128 {
    (end_exclusive - start as i128).max(0) as u128
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean; `NaN` for no values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum(values) / values.len() as f64
}

/// Population standard deviation; `NaN` for no values.
pub fn std(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return m;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Parse cell text the way a float conversion would: surrounding whitespace
/// is ignored, anything else non-numeric fails.
pub fn parse_float(text: &str) -> Result<f64, Box<EvalAltResult>> {
    text.trim().parse::<f64>().map_err(|_| {
        invalid_arg(&format!("could not convert string to float: '{}'", text))
    })
}

fn number(value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(n) = value.as_float() {
        return Ok(n);
    }
    if let Ok(n) = value.as_int() {
        return Ok(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(if b { 1.0 } else { 0.0 });
    }
    if value.is_string() {
        return parse_float(&value.to_string());
    }
    Err(invalid_arg(&format!(
        "expected a number, got {}",
        value.type_name()
    )))
}

/// Flatten an array, selector or range into floats.
fn numbers(value: &Dynamic) -> Result<Vec<f64>, Box<EvalAltResult>> {
    if let Some(selector) = value.clone().try_cast::<Selector>() {
        check_expanded_len(selector.len() as u128)?;
        return Ok(selector.iter().map(|i| i as f64).collect());
    }
    if let Some(range) = value.clone().try_cast::<std::ops::Range<i64>>() {
        check_expanded_len(span(range.start, range.end as i128))?;
        return Ok(range.map(|i| i as f64).collect());
    }
    if let Some(range) = value.clone().try_cast::<std::ops::RangeInclusive<i64>>() {
        check_expanded_len(span(*range.start(), *range.end() as i128 + 1))?;
        return Ok(range.map(|i| i as f64).collect());
    }
    if value.is_array() {
        let items = value.clone().into_array().unwrap_or_default();
        return items.iter().map(number).collect();
    }
    Ok(vec![number(value)?])
}

fn floats(values: Vec<f64>) -> Array {
    values.into_iter().map(Dynamic::from).collect()
}

fn reduce_or_nan(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}

pub fn numeric_module() -> Module {
    let mut module = Module::new();

    module.set_var("pi", std::f64::consts::PI);
    module.set_var("e", std::f64::consts::E);
    module.set_var("nan", f64::NAN);
    module.set_var("inf", f64::INFINITY);

    module.set_native_fn("sum", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(sum(&numbers(&v)?))
    });
    module.set_native_fn("mean", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(mean(&numbers(&v)?))
    });
    module.set_native_fn("std", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(std(&numbers(&v)?))
    });
    module.set_native_fn("min", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(reduce_or_nan(&numbers(&v)?, f64::min))
    });
    module.set_native_fn("max", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(reduce_or_nan(&numbers(&v)?, f64::max))
    });
    module.set_native_fn("prod", |v: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(numbers(&v)?.iter().product())
    });
    module.set_native_fn("cumsum", |v: Dynamic| -> Result<Array, Box<EvalAltResult>> {
        let mut total = 0.0;
        let running = numbers(&v)?
            .into_iter()
            .map(|x| {
                total += x;
                total
            })
            .collect();
        Ok(floats(running))
    });
    module.set_native_fn("array", |v: Dynamic| -> Result<Array, Box<EvalAltResult>> {
        Ok(floats(numbers(&v)?))
    });

    module.set_native_fn("sqrt", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.sqrt())
    });
    module.set_native_fn("abs", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.abs())
    });
    module.set_native_fn("floor", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.floor())
    });
    module.set_native_fn("ceil", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.ceil())
    });
    module.set_native_fn("round", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.round_ties_even())
    });
    module.set_native_fn(
        "round",
        |x: Dynamic, decimals: i64| -> Result<f64, Box<EvalAltResult>> {
            let scale = 10f64.powi(decimals.clamp(-300, 300) as i32);
            Ok((number(&x)? * scale).round_ties_even() / scale)
        },
    );
    module.set_native_fn("exp", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.exp())
    });
    module.set_native_fn("log", |x: Dynamic| -> Result<f64, Box<EvalAltResult>> {
        Ok(number(&x)?.ln())
    });

    module.set_native_fn(
        "arange",
        |stop: i64| -> Result<Array, Box<EvalAltResult>> {
            check_expanded_len(span(0, stop as i128))?;
            Ok((0..stop).map(Dynamic::from).collect())
        },
    );
    module.set_native_fn(
        "arange",
        |start: i64, stop: i64| -> Result<Array, Box<EvalAltResult>> {
            check_expanded_len(span(start, stop as i128))?;
            Ok((start..stop).map(Dynamic::from).collect())
        },
    );
    module.set_native_fn(
        "arange",
        |start: i64, stop: i64, step: i64| -> Result<Array, Box<EvalAltResult>> {
            let slice = crate::engine::Slice::new(start, stop, step)
                .map_err(|e| invalid_arg(&e.to_string()))?;
            check_expanded_len(slice.len() as u128)?;
            Ok(slice.iter().map(Dynamic::from).collect())
        },
    );
    module.set_native_fn(
        "linspace",
        |start: Dynamic, stop: Dynamic, num: i64| -> Result<Array, Box<EvalAltResult>> {
            let (start, stop) = (number(&start)?, number(&stop)?);
            let values = match num {
                n if n < 0 => return Err(invalid_arg("number of samples must be non-negative")),
                0 => Vec::new(),
                1 => vec![start],
                n => {
                    check_expanded_len(n as u128)?;
                    let step = (stop - start) / (n - 1) as f64;
                    (0..n).map(|i| start + step * i as f64).collect()
                }
            };
            Ok(floats(values))
        },
    );

    module.set_native_fn("random", || -> Result<f64, Box<EvalAltResult>> {
        Ok(rand::thread_rng().r#gen())
    });
    module.set_native_fn(
        "randint",
        |low: i64, high: i64| -> Result<i64, Box<EvalAltResult>> {
            if low >= high {
                return Err(invalid_arg("randint: low must be less than high"));
            }
            Ok(rand::thread_rng().gen_range(low..high))
        },
    );

    module
}

/// Register the `np` module on an engine.
pub fn register_numeric(engine: &mut Engine) {
    engine.register_static_module("np", numeric_module().into());
}
