//! Compiles and runs one script under the execution budget.
//!
//! The deadline is cooperative: the engine checks it between operations, so a script stuck
//! inside a single long native call (sorting a huge array, say) is only noticed once that call
//! returns. The async wrapper adds a watchdog that reports the timeout to the caller after
//! `timeout + watchdog_grace` even then; the worker thread is left to finish on its own.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::sandbox::{to_json, Sandbox};
use rhai::{Dynamic, EvalAltResult};
use serde_json::Value;
use std::time::Duration;

fn is_terminated(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => is_terminated(inner),
        _ => false,
    }
}

fn classify(err: Box<EvalAltResult>, budget: Duration) -> EngineError {
    if is_terminated(&err) {
        EngineError::TimeoutExceeded { budget }
    } else {
        EngineError::script(err.to_string())
    }
}

/// Runs `code` synchronously and returns its final value; `None` when the script ends in `()`.
pub fn execute(code: &str, input: &Value, config: &EngineConfig) -> Result<Option<Value>> {
    let Sandbox { engine, mut scope } = Sandbox::new(input, config)
        .map_err(|err| EngineError::script(format!("cannot bind input: {err}")))?;

    let ast = engine
        .compile(code)
        .map_err(|err| EngineError::script(format!("parse error: {err}")))?;

    let result = engine
        .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
        .map_err(|err| classify(err, config.timeout))?;

    if result.is_unit() {
        return Ok(None);
    }
    match to_json(&result) {
        Ok(value) => Ok(Some(value)),
        // Function pointers and other engine-only values have no JSON form.
        Err(_) => Ok(Some(Value::String(result.to_string()))),
    }
}

/// Runs `code` on a blocking worker, bounded by the configured budget.
pub async fn run(code: &str, input: Value, config: &EngineConfig) -> Result<Option<Value>> {
    let code = code.to_string();
    let limits = config.clone();
    let worker = tokio::task::spawn_blocking(move || execute(&code, &input, &limits));

    match tokio::time::timeout(config.timeout + config.watchdog_grace, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(EngineError::script(format!("script worker failed: {join}"))),
        Err(_) => {
            log::warn!(
                "script did not yield within {:?}; abandoning its worker",
                config.timeout + config.watchdog_grace
            );
            Err(EngineError::TimeoutExceeded {
                budget: config.timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Instant;

    fn quick() -> EngineConfig {
        EngineConfig::default().with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn returns_final_expression() {
        let out = execute("data.n = data.n * 2; data", &json!({"n": 21}), &quick()).unwrap();
        assert_eq!(out, Some(json!({"n": 42})));
    }

    #[test]
    fn unit_result_is_none() {
        assert_eq!(execute("let x = 1;", &json!({}), &quick()).unwrap(), None);
    }

    #[test]
    fn explicit_return_is_accepted() {
        let out = execute("return 5;", &json!({}), &quick()).unwrap();
        assert_eq!(out, Some(json!(5)));
    }

    #[test]
    fn function_pointer_result_is_rendered_as_text() {
        let out = execute(r#"Fn("foo")"#, &json!({}), &quick()).unwrap();
        assert!(matches!(out, Some(Value::String(_))));
    }

    #[test]
    fn thrown_value_is_script_error() {
        let err = execute(r#"throw "boom";"#, &json!({}), &quick()).unwrap_err();
        assert_eq!(err.code(), "script_error");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn syntax_error_is_script_error() {
        let err = execute("let = ;", &json!({}), &quick()).unwrap_err();
        assert_eq!(err.code(), "script_error");
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn denied_capabilities_are_undefined() {
        let out = execute(
            r#"[is_def_var("process"), is_def_var("fs"), is_def_var("require"), is_def_var("data")]"#,
            &json!({}),
            &quick(),
        )
        .unwrap();
        assert_eq!(out, Some(json!([false, false, false, true])));
        assert!(execute("process", &json!({}), &quick()).is_err());
    }

    #[test]
    fn endless_loop_times_out() {
        let started = Instant::now();
        let err = execute("let x = 0; loop { x += 1; }", &json!({}), &quick()).unwrap_err();
        assert!(matches!(err, EngineError::TimeoutExceeded { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn endless_loop_inside_function_times_out() {
        let code = "fn spin(n) { let i = 0; while true { i += 1; } } spin(1)";
        let err = execute(code, &json!({}), &quick()).unwrap_err();
        assert!(matches!(err, EngineError::TimeoutExceeded { .. }), "{err:?}");
    }

    #[test]
    fn sleep_cannot_outlast_the_budget() {
        let started = Instant::now();
        let err = execute("sleep(2); 7", &json!({}), &quick()).unwrap_err();
        assert_eq!(err.code(), "script_error");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn huge_allocations_are_script_errors() {
        for code in [
            "let a = []; a.pad(99999999999999, 0); 1",
            r#"util::set(data, "a[99999999999999]", 1)"#,
            r#"util::set(data, "a[18446744073709551615]", 1)"#,
            r#"let s = "x"; s.pad(99999999999999, "y"); 1"#,
        ] {
            let err = execute(code, &json!({"a": []}), &quick()).unwrap_err();
            assert_eq!(err.code(), "script_error", "{code}: {err:?}");
        }
    }

    #[tokio::test]
    async fn async_run_reports_timeout() {
        let err = run("let x = 0; loop { x += 1; }", json!({}), &quick())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "timeout_exceeded");
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let config = quick();
        run("let leaked = 1; leaked", json!({}), &config).await.unwrap();
        let err = run("leaked", json!({}), &config).await.unwrap_err();
        assert_eq!(err.code(), "script_error");
    }
}
