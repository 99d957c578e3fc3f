use runbox::{Config, EXAMPLE_CONFIG};

#[test]
fn test_example_config_parses() {
    let config = Config::parse_toml(EXAMPLE_CONFIG).expect("example config should parse");
    let mut ids: Vec<_> = config.languages.keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, ["cpp", "java", "javascript", "python", "typescript"]);
}

#[test]
fn test_config_file_roundtrip() {
    let path = std::env::temp_dir().join(format!(
        "runbox-config-{}.toml",
        runbox::workspace::random_id()
    ));
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).expect("config file should load");
    assert_eq!(config.max_concurrent, 8);
    assert!(config.resolve("c++").is_some());

    std::fs::remove_file(&path).unwrap();
}
