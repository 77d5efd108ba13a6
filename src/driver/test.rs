use super::*;
use crate::diagnostics::{Severity, render};

use std::collections::HashMap;
use std::path::Path;

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn run_demo(name: &str) -> Outcome {
    let config = Config {
        run: true,
        ..Config::new(demo(name))
    };
    run(&config).expect("demo should run")
}

fn in_memory(source: &str) -> HashMap<PathBuf, String> {
    HashMap::from([(PathBuf::from("prog.shaka"), source.to_string())])
}

#[test]
fn test_fib_demo() {
    let outcome = run_demo("fib.shaka");
    assert!(outcome.diagnostics.is_empty());
    let execution = outcome.execution.unwrap();
    assert_eq!(execution.output, "0 1 1 2 3 5 8 13 21 34 \n");
    assert_eq!(execution.exit_code, 0);
}

#[test]
fn test_loops_demo() {
    let outcome = run_demo("loops.shaka");
    let execution = outcome.execution.unwrap();
    assert_eq!(execution.output, "odd sum: 25\nx = 244.14\n");
    assert_eq!(execution.exit_code, 25);
}

#[test]
fn test_imports_demo() {
    let outcome = run_demo("imports/main.shaka");
    assert!(!outcome.has_errors());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Note);
    assert_eq!(outcome.execution.unwrap().output, "49 27\n5.000\n");
}

#[test]
fn test_errors_demo_stops_before_execution() {
    let outcome = run_demo("errors.shaka");
    assert!(outcome.has_errors());
    assert!(outcome.execution.is_none());

    let messages: Vec<&str> = outcome
        .diagnostics
        .iter()
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        messages,
        [
            "type mismatch: expected `int`, found `str`",
            "call to undefined function `undefined_fn`",
            "`continue` outside of a loop",
            "`positive` can reach its end without returning a `int`",
        ]
    );

    let rendered = render(&outcome.diagnostics, &FileSystem);
    assert!(rendered.contains("Type Error"));
    assert!(rendered.contains("call to undefined function `undefined_fn`"));
}

#[test]
fn test_dumps() {
    let provider = in_memory("var x: int = 1 + 2;");
    let config = Config {
        dump_tokens: true,
        dump_ast: true,
        dump_ir: true,
        ..Config::new("prog.shaka")
    };
    let outcome = run_with(&config, &provider).unwrap();

    let tokens = outcome.tokens.unwrap();
    assert!(tokens.starts_with("1:1 `var`\n1:5 identifier `x`\n1:6 `:`\n"));
    assert!(outcome.ast.unwrap().contains("\"VarDecl\""));
    assert!(outcome.ir.unwrap().contains("@x = global i32 0"));
    assert!(outcome.execution.is_none());
}

#[test]
fn test_missing_input() {
    let provider = in_memory("");
    let result = run_with(&Config::new("other.shaka"), &provider);
    assert!(matches!(result, Err(DriverError::Read { path, .. }) if path == "other.shaka"));
}

#[test]
fn test_fuel_limit_surfaces_as_runtime_error() {
    let provider = in_memory("while true { }");
    let config = Config {
        run: true,
        fuel: 1_000,
        ..Config::new("prog.shaka")
    };
    let result = run_with(&config, &provider);
    assert!(matches!(result, Err(DriverError::Exec(ExecError::OutOfFuel))));
}

#[cfg(not(feature = "llvm"))]
#[test]
fn test_llvm_backend_needs_feature() {
    let provider = in_memory("return 1;");
    let config = Config {
        run: true,
        backend: Backend::Llvm,
        ..Config::new("prog.shaka")
    };
    let result = run_with(&config, &provider);
    assert!(matches!(result, Err(DriverError::LlvmUnavailable)));
}

#[cfg(feature = "llvm")]
#[test]
fn test_llvm_ir_dump() {
    let provider = in_memory("def twice(x: int) -> int { return x * 2; } return twice(21);");
    let config = Config {
        dump_llvm: true,
        ..Config::new("prog.shaka")
    };
    let ir = run_with(&config, &provider).unwrap().llvm_ir.unwrap();
    assert!(ir.contains("define i32 @twice(i32 %x)"));
    assert!(ir.contains("declare i32 @printf(ptr, ...)"));
}
