use std::process::Command;

fn interval_sampler(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_interval_sampler"))
        .args(args)
        .output()
        .unwrap()
}

fn parse_list(stdout: &[u8]) -> Vec<u64> {
    let text = String::from_utf8(stdout.to_vec()).unwrap();
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap();
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(", ").map(|v| v.parse().unwrap()).collect()
}

#[test]
fn test_default_prints_24_bounded_intervals() {
    let output = interval_sampler(&[]);
    assert!(output.status.success(), "{output:?}");

    let samples = parse_list(&output.stdout);
    assert_eq!(samples.len(), 24);
    assert!(samples.iter().all(|v| *v <= 60));
}

#[test]
fn test_zero_count_prints_empty_list() {
    let output = interval_sampler(&["--count", "0"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "[]\n");
}

#[test]
fn test_seed_is_reproducible() {
    let a = interval_sampler(&["--count", "50", "--seed", "11"]);
    let b = interval_sampler(&["--count", "50", "--seed", "11"]);
    assert_eq!(a.stdout, b.stdout);
    assert_eq!(parse_list(&a.stdout).len(), 50);
}

#[test]
fn test_config_file_with_flag_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sampler.json");
    std::fs::write(&config, r#"{"count": 3, "min": 10, "max": 12}"#).unwrap();

    let output = interval_sampler(&["--config", config.to_str().unwrap(), "--count", "40"]);
    assert!(output.status.success(), "{output:?}");

    let samples = parse_list(&output.stdout);
    assert_eq!(samples.len(), 40);
    assert!(samples.iter().all(|v| (10..=12).contains(v)));
}

#[test]
fn test_invalid_rate_fails() {
    let output = interval_sampler(&["--rate", "0"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
