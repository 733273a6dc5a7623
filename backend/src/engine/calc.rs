use rhai::{Dynamic, Engine, EvalAltResult};
use serde_json::Value;

use crate::error::AppError;

/// Builds a scripting engine with the runtime limits switched off and host
/// access wired in.
///
/// The admin calculator hands the caller the full language (statements,
/// loops, closures, function definitions) plus the process environment and
/// filesystem. Expression nesting and call-stack depth keep rhai's defaults:
/// the parser and evaluator recurse on the native stack, and those bounds
/// turn pathological nesting into an error instead of a process abort.
fn unrestricted_engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .set_max_operations(0)
        .set_max_string_size(0)
        .set_max_array_size(0)
        .set_max_map_size(0);

    engine
        .register_fn("env", read_env)
        .register_fn("read_file", read_file)
        .register_fn("write_file", write_file);
    engine
}

fn read_env(name: &str) -> Result<String, Box<EvalAltResult>> {
    std::env::var(name).map_err(|err| format!("{name}: {err}").into())
}

fn read_file(path: &str) -> Result<String, Box<EvalAltResult>> {
    std::fs::read_to_string(path).map_err(|err| format!("{path}: {err}").into())
}

fn write_file(path: &str, contents: &str) -> Result<(), Box<EvalAltResult>> {
    std::fs::write(path, contents).map_err(|err| format!("{path}: {err}").into())
}

/// Runs `expr` as a script and renders its final value as JSON.
pub fn evaluate(expr: &str) -> Result<Value, AppError> {
    let result = unrestricted_engine()
        .eval::<Dynamic>(expr)
        .map_err(|err| AppError::Evaluation(err.to_string()))?;

    Ok(serde_json::to_value(&result)?)
}
