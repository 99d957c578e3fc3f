use runbox::{ExecutionStatus, Isolation};

use super::{fixture_source, leftover_files, remove_root, run, test_runner};

#[tokio::test]
async fn test_java_hello() {
    let runner = test_runner(Isolation::PerRequest).await;
    let result = run(&runner, &fixture_source("Main.java"), "java").await;

    assert!(result.is_success(), "output: {}", result.output);
    assert!(result.output.contains("Hello from Java"));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_java_class_name_from_source() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, &fixture_source("Greeter.java"), "java").await;

    assert!(result.is_success(), "output: {}", result.output);
    assert!(result.output.contains("Hello from Greeter"));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_java_compile_error_leaves_no_class_file() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, &fixture_source("compile_error.java"), "java").await;

    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::CompileError);
    assert!(result.output.starts_with("Compilation error:"));

    let leftovers = leftover_files(runner.workspace().path());
    assert!(
        !leftovers.iter().any(|f| f.ends_with(".class")),
        "leftover class files: {leftovers:?}"
    );
    assert!(leftovers.is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_cpp_hello() {
    let runner = test_runner(Isolation::PerRequest).await;
    let result = run(&runner, &fixture_source("hello.cpp"), "cpp").await;

    assert!(result.is_success(), "output: {}", result.output);
    assert!(result.output.contains("Hello from C++"));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_cpp_alias() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, &fixture_source("hello.cpp"), "C++").await;

    assert!(result.is_success(), "output: {}", result.output);
    remove_root(&runner);
}

#[tokio::test]
async fn test_cpp_compile_error() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, &fixture_source("compile_error.cpp"), "cpp").await;

    assert_eq!(result.status, ExecutionStatus::CompileError);
    assert!(result.output.starts_with("Compilation error:"));
    assert!(result.output.contains("error"));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_cpp_nonzero_exit() {
    let runner = test_runner(Isolation::Shared).await;
    let code = "#include <cstdio>\nint main() { std::puts(\"partial\"); return 4; }\n";
    let result = run(&runner, code, "cpp").await;

    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::RuntimeError);
    assert_eq!(result.exit_code, Some(4));
    assert_eq!(result.output, "partial\n");
    remove_root(&runner);
}
