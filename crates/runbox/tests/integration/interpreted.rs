use runbox::{ExecutionStatus, Isolation};

use super::{fixture_source, leftover_files, remove_root, run, test_runner};

#[tokio::test]
async fn test_python_hello() {
    let runner = test_runner(Isolation::PerRequest).await;
    let result = run(&runner, &fixture_source("hello.py"), "python").await;

    assert!(result.is_success(), "output: {}", result.output);
    assert!(result.output.contains("Hello from Python"));
    assert_eq!(result.exit_code, Some(0));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_javascript_hello() {
    let runner = test_runner(Isolation::PerRequest).await;
    let result = run(&runner, &fixture_source("hello.js"), "javascript").await;

    assert!(result.is_success(), "output: {}", result.output);
    assert!(result.output.contains("Hello from JavaScript"));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_language_tag_is_case_insensitive() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, "print('upper')", "PYTHON").await;

    assert!(result.is_success());
    assert_eq!(result.output, "upper\n");
    remove_root(&runner);
}

#[tokio::test]
async fn test_python_runtime_error() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, &fixture_source("runtime_error.py"), "python").await;

    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::RuntimeError);
    assert!(result.output.contains("ZeroDivisionError"));
    assert_eq!(result.exit_code, Some(1));
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_stderr_fails_even_with_zero_exit() {
    let runner = test_runner(Isolation::Shared).await;
    let code = "import sys\nprint('out')\nprint('warn', file=sys.stderr)\n";
    let result = run(&runner, code, "python").await;

    assert!(!result.is_success());
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.output, "warn\n");
    remove_root(&runner);
}

#[tokio::test]
async fn test_silent_program_reports_placeholder() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, "pass", "python").await;

    assert!(result.is_success());
    assert_eq!(result.output, runbox::types::NO_OUTPUT);
    remove_root(&runner);
}

#[tokio::test]
async fn test_typescript_unavailable() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, "const x: number = 1;", "typescript").await;

    assert_eq!(result.status, ExecutionStatus::Unavailable);
    assert_eq!(
        result.output,
        "TypeScript not available. Try JavaScript instead."
    );
    remove_root(&runner);
}

#[tokio::test]
async fn test_ruby_unsupported() {
    let runner = test_runner(Isolation::Shared).await;
    let result = run(&runner, "puts 'hi'", "ruby").await;

    assert_eq!(result.status, ExecutionStatus::Unsupported);
    assert!(result.output.contains("Language 'ruby' is not supported"));
    remove_root(&runner);
}
