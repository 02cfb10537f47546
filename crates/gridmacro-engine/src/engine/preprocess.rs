//! Source rewriting applied to formulas and macros before compilation.
//!
//! - **Slices**: `R[0:3]` → `R[slice(0, 3)]`, `R[0:9:2]` → `R[slice(0, 9, 2)]`
//! - **Module paths**: `np.mean(x)` → `np::mean(x)` for the registered modules
//!
//! String literals are left untouched.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn slice_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\[\s*([^\[\]{}:]+?)\s*:\s*([^\[\]{}:]+?)\s*(?::\s*([^\[\]{}:]+?)\s*)?\]",
        )
        .expect("slice regex must compile")
    })
}

fn module_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^.\w])(np|process)\.([A-Za-z_]\w*)")
            .expect("module path regex must compile")
    })
}

/// Rewrite slice subscripts and module paths outside string literals.
pub fn preprocess_script(script: &str) -> String {
    map_outside_strings(script, |segment| {
        let sliced = slice_re().replace_all(segment, |caps: &Captures| match caps.get(3) {
            Some(step) => format!("[slice({}, {}, {})]", &caps[1], &caps[2], step.as_str()),
            None => format!("[slice({}, {})]", &caps[1], &caps[2]),
        });
        module_path_re()
            .replace_all(&sliced, "${1}${2}::${3}")
            .into_owned()
    })
}

/// Apply `rewrite` to every stretch of `script` that is not inside a `"..."`
/// or `` `...` `` literal.
fn map_outside_strings(script: &str, rewrite: impl Fn(&str) -> String) -> String {
    let bytes = script.as_bytes();
    let mut out = String::with_capacity(script.len());
    let mut seg_start = 0;
    let mut quote: Option<u8> = None;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == q && backslashes % 2 == 0 {
                out.push_str(&script[seg_start..=i]);
                quote = None;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' || b == b'`' {
            out.push_str(&rewrite(&script[seg_start..i]));
            quote = Some(b);
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < script.len() {
        if quote.is_some() {
            out.push_str(&script[seg_start..]);
        } else {
            out.push_str(&rewrite(&script[seg_start..]));
        }
    }

    out
}
