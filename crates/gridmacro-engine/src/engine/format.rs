use rhai::Dynamic;

use super::selector::Selector;

/// Format a formula result as the cell's new text.
pub fn format_result(value: &Dynamic) -> String {
    if value.is_unit() {
        String::new()
    } else if let Ok(n) = value.as_float() {
        format_float(n)
    } else if let Ok(n) = value.as_int() {
        n.to_string()
    } else if let Ok(b) = value.as_bool() {
        b.to_string()
    } else if value.is_string() || value.is_char() {
        value.to_string()
    } else if let Some(selector) = value.clone().try_cast::<Selector>() {
        selector.to_string()
    } else if value.is_array() {
        let items = value.clone().into_array().unwrap_or_default();
        let parts: Vec<String> = items.iter().map(format_item).collect();
        format!("[{}]", parts.join(", "))
    } else {
        value.to_string()
    }
}

fn format_item(value: &Dynamic) -> String {
    if value.is_string() {
        format!("{:?}", value.to_string())
    } else {
        format_result(value)
    }
}

/// Shortest round-trip form that always shows it is a float: `6.0`, `0.1`,
/// `1e+16`, `1.5e-05`, `nan`, `inf`.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = n.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", n);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => match exp.parse::<i32>() {
                Ok(exp) => format!(
                    "{}e{}{:02}",
                    mantissa,
                    if exp < 0 { '-' } else { '+' },
                    exp.abs()
                ),
                Err(_) => sci,
            },
            None => sci,
        };
    }

    let plain = n.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}
