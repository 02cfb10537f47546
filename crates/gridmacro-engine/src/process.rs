//! The `process` module: launch external programs from macros.
//!
//! Only the macro engine gets this module. Programs run unsandboxed with the
//! session's privileges, and the call blocks until the child exits; there is
//! no timeout.

use std::process::{Command, Output};

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Module, Position};

fn spawn_error(program: &str, err: std::io::Error) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(
        format!("failed to run '{}': {}", program, err).into(),
        Position::NONE,
    )
    .into()
}

fn output_map(output: Output) -> Map {
    let mut map = Map::new();
    map.insert(
        "code".into(),
        Dynamic::from(output.status.code().map(i64::from).unwrap_or(-1)),
    );
    map.insert("success".into(), Dynamic::from(output.status.success()));
    map.insert(
        "stdout".into(),
        Dynamic::from(String::from_utf8_lossy(&output.stdout).into_owned()),
    );
    map.insert(
        "stderr".into(),
        Dynamic::from(String::from_utf8_lossy(&output.stderr).into_owned()),
    );
    map
}

/// Run `program` with `args`, capturing its output.
pub fn run(program: &str, args: &[String]) -> Result<Map, Box<EvalAltResult>> {
    log::info!("running external program {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| spawn_error(program, e))?;
    Ok(output_map(output))
}

/// Run a command line through the platform shell.
pub fn shell(command_line: &str) -> Result<Map, Box<EvalAltResult>> {
    let (shell, flag) = if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };
    run(shell, &[flag.to_string(), command_line.to_string()])
}

pub fn process_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("run", |program: &str| run(program, &[]));
    module.set_native_fn("run", |program: &str, args: Array| {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        run(program, &args)
    });
    module.set_native_fn("shell", |command_line: &str| shell(command_line));
    module
}

/// Register the `process` module on an engine.
pub fn register_process(engine: &mut Engine) {
    engine.register_static_module("process", process_module().into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_an_error() {
        let err = run("gridmacro-no-such-program", &[]).unwrap_err();
        assert!(err.to_string().contains("failed to run 'gridmacro-no-such-program'"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_captures_output() {
        let mut engine = Engine::new();
        register_process(&mut engine);
        let result: Map = engine.eval(r#"process::shell("echo hi")"#).unwrap();
        assert_eq!(result["stdout"].clone().cast::<String>(), "hi\n");
        assert_eq!(result["code"].clone().cast::<i64>(), 0);
        assert!(result["success"].clone().cast::<bool>());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_args_reports_exit_code() {
        let mut engine = Engine::new();
        register_process(&mut engine);
        let result: Map = engine.eval(r#"process::run("sh", ["-c", "exit 3"])"#).unwrap();
        assert_eq!(result["code"].clone().cast::<i64>(), 3);
        assert!(!result["success"].clone().cast::<bool>());
    }
}
