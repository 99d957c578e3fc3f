use runbox::Isolation;

use super::{fixture_source, leftover_files, remove_root, run, test_runner};

#[tokio::test]
async fn test_concurrent_identical_python() {
    let runner = test_runner(Isolation::Shared).await;
    let code = fixture_source("hello.py");

    let (a, b) = tokio::join!(run(&runner, &code, "python"), run(&runner, &code, "python"));

    for result in [a, b] {
        assert!(result.is_success(), "output: {}", result.output);
        assert!(result.output.contains("Hello from Python"));
    }
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_concurrent_java_main_classes_are_independent() {
    let runner = test_runner(Isolation::PerRequest).await;
    let first = "public class Main { public static void main(String[] a) { System.out.println(\"first\"); } }";
    let second = "public class Main { public static void main(String[] a) { System.out.println(\"second\"); } }";

    let (a, b) = tokio::join!(run(&runner, first, "java"), run(&runner, second, "java"));

    assert!(a.is_success(), "output: {}", a.output);
    assert!(b.is_success(), "output: {}", b.output);
    assert_eq!(a.output, "first\n");
    assert_eq!(b.output, "second\n");
    assert!(leftover_files(runner.workspace().path()).is_empty());
    remove_root(&runner);
}

#[tokio::test]
async fn test_many_concurrent_requests_queue() {
    let mut config = super::test_config(Isolation::PerRequest);
    config.max_concurrent = 2;
    let runner = runbox::Runner::new(config).await.unwrap();

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move { run(&runner, &format!("print({i})"), "python").await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let result = task.await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, format!("{i}\n"));
    }
    assert_eq!(runner.available_slots(), 2);
    remove_root(&runner);
}
