use std::time::{Duration, Instant};

use runbox::{ExecutionStatus, Isolation, ResourceLimits};

use super::{fixture_source, leftover_files, remove_root, run, test_config};

#[tokio::test]
async fn test_infinite_loop_is_killed() {
    let mut config = test_config(Isolation::PerRequest);
    config.default_limits = ResourceLimits::unset().with_timeout(1.0);
    let runner = runbox::Runner::new(config).await.unwrap();

    let started = Instant::now();
    let result = run(&runner, &fixture_source("spin.py"), "python").await;
    let elapsed = started.elapsed();

    assert!(!result.is_success());
    assert_eq!(result.status, ExecutionStatus::TimeLimitExceeded);
    assert_eq!(result.output, "Execution timed out after 1s");
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_output_flood_is_capped() {
    let mut config = test_config(Isolation::Shared);
    config.default_limits = ResourceLimits::unset().with_timeout(5.0).with_max_output(4);
    let runner = runbox::Runner::new(config).await.unwrap();

    let code = "import sys\nfor _ in range(100000):\n    sys.stdout.write('x' * 100)\n";
    let result = run(&runner, code, "python").await;

    assert!(result.output.ends_with(runbox::process::TRUNCATED_MARKER));
    assert!(result.output.len() <= 4 * 1024 + runbox::process::TRUNCATED_MARKER.len());
    remove_root(&runner);
}

#[tokio::test]
#[ignore = "takes more than ten seconds"]
async fn test_default_timeout_boundary() {
    let runner = runbox::Runner::new(test_config(Isolation::PerRequest))
        .await
        .unwrap();

    let started = Instant::now();
    let result = run(&runner, &fixture_source("spin.py"), "python").await;
    let elapsed = started.elapsed();

    assert_eq!(result.status, ExecutionStatus::TimeLimitExceeded);
    assert_eq!(result.output, "Execution timed out after 10s");
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(13), "took {elapsed:?}");
    remove_root(&runner);
}
