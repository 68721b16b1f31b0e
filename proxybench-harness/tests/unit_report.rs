use proxybench_common::{
    BenchError, LatencySample, Source, CHART_FILE, DIRECT_LOG_FILE, PROXY_LOG_FILE,
};
use proxybench_harness::report::{
    clip_to_window, decode_value, finish_run, generate_cdf_chart, load_latencies, load_samples,
    render_comparison_chart,
};
use proxybench_harness::runner::RunOutcome;
use proxybench_harness::sample_log::RunLogs;
use proxybench_harness::stats::compute_empirical_cdf;
use std::fs;
use tempfile::TempDir;

// --- decode_value ---

#[test]
fn test_decode_value() {
    assert_eq!(decode_value(r#"{"fetchTime": 12.5}"#, "fetchTime"), Some(12.5));
    assert_eq!(decode_value(r#"{"fetchTime": 12}"#, "fetchTime"), Some(12.0));
    assert_eq!(decode_value("NOT_JSON", "fetchTime"), None);
    assert_eq!(decode_value(r#"{"other": 1}"#, "fetchTime"), None);
    assert_eq!(decode_value(r#"{"fetchTime": "slow"}"#, "fetchTime"), None);
    assert_eq!(decode_value("", "fetchTime"), None);
}

// --- load_samples ---

#[test]
fn test_load_samples_skips_malformed_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(DIRECT_LOG_FILE);
    fs::write(&path, "{\"fetchTime\": 12.5}\nNOT_JSON\n").unwrap();

    assert_eq!(load_samples(&path, "fetchTime").unwrap(), vec![12.5]);
}

#[test]
fn test_load_samples_skips_line_without_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(DIRECT_LOG_FILE);
    fs::write(&path, "{\"other\": 1}\n").unwrap();

    assert!(load_samples(&path, "fetchTime").unwrap().is_empty());
}

#[test]
fn test_load_samples_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does_not_exist.json");

    assert_eq!(load_samples(&path, "fetchTime").unwrap(), Vec::<f64>::new());
}

#[test]
fn test_load_samples_preserves_file_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(PROXY_LOG_FILE);
    fs::write(&path, "{\"time_taken\": 3}\n{\"time_taken\": 1}\n{\"time_taken\": 2}\n").unwrap();

    assert_eq!(load_samples(&path, "time_taken").unwrap(), vec![3.0, 1.0, 2.0]);
}

// --- load_latencies: per-source field names ---

#[test]
fn test_load_latencies_uses_each_sources_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(DIRECT_LOG_FILE),
        concat!(
            r#"{"timestamp":"t","message":"makeRequest completed","fetchTime":150.0,"prompt":"a"}"#, "\n",
            r#"{"timestamp":"t","message":"makeRequest error","error":"boom","time_taken":9.0,"prompt":"b"}"#, "\n",
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join(PROXY_LOG_FILE),
        concat!(
            r#"{"timestamp":"t","message":"request race finished","time_taken":100.0,"prompt":"a"}"#, "\n",
            r#"{"timestamp":"t","message":"request race error","error":"boom","time_taken":7.0,"prompt":"b"}"#, "\n",
        ),
    )
    .unwrap();

    let latencies = load_latencies(dir.path()).unwrap();

    // Direct failures carry no fetchTime; proxied failures still carry time_taken.
    assert_eq!(latencies.direct, vec![150.0]);
    assert_eq!(latencies.proxy, vec![100.0, 7.0]);
}

// --- clip_to_window ---

#[test]
fn test_clip_keeps_points_inside_window() {
    let cdf = compute_empirical_cdf(&[100.0, 200.0]);
    assert_eq!(clip_to_window(&cdf, 5000.0), vec![(100.0, 0.5), (200.0, 1.0)]);
}

#[test]
fn test_clip_interpolates_boundary_crossing() {
    let cdf = compute_empirical_cdf(&[4000.0, 6000.0, 8000.0, 9000.0]);
    // Segment (4000, 0.25) -> (6000, 0.5) crosses x = 5000 halfway.
    assert_eq!(clip_to_window(&cdf, 5000.0), vec![(4000.0, 0.25), (5000.0, 0.375)]);
}

#[test]
fn test_clip_everything_outside_window() {
    let cdf = compute_empirical_cdf(&[6000.0, 7000.0]);
    assert!(clip_to_window(&cdf, 5000.0).is_empty());
}

// --- insufficient data ---

#[test]
fn test_render_skips_when_direct_is_empty() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join(CHART_FILE);
    let proxy: Vec<f64> = (1..=10).map(|i| i as f64 * 100.0).collect();

    let report = render_comparison_chart(&[], &proxy, &out).unwrap();

    assert!(report.is_none());
    assert!(!out.exists());
}

#[test]
fn test_render_skips_when_proxy_is_empty() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join(CHART_FILE);

    assert!(render_comparison_chart(&[100.0], &[], &out).unwrap().is_none());
    assert!(!out.exists());
}

#[test]
fn test_generate_chart_with_no_logs_is_a_no_op() {
    let dir = TempDir::new().unwrap();

    assert!(generate_cdf_chart(dir.path()).unwrap().is_none());
    assert!(!dir.path().join(CHART_FILE).exists());
}

// --- chart output ---

fn sample(source: Source, elapsed: f64) -> LatencySample {
    LatencySample {
        source,
        elapsed_millis: elapsed,
        timestamp: "2024-05-01T12:00:00.000000Z".to_string(),
        prompt_preview: "p".to_string(),
        error: None,
    }
}

/// Write the given latencies to both per-source logs in `dir` and return the
/// matching in-memory outcome.
fn write_logs(dir: &std::path::Path, direct: &[f64], proxy: &[f64]) -> RunOutcome {
    let logs = RunLogs::in_dir(dir);
    logs.truncate_all().unwrap();
    let outcome = RunOutcome {
        proxied: proxy.iter().map(|&ms| sample(Source::Proxied, ms)).collect(),
        direct: direct.iter().map(|&ms| sample(Source::Direct, ms)).collect(),
    };
    for s in outcome.proxied.iter().chain(&outcome.direct) {
        logs.append(s).unwrap();
    }
    outcome
}

#[test]
fn test_generate_chart_writes_png() {
    let dir = TempDir::new().unwrap();
    // 6000 ms lies past the display window and exercises clipping.
    write_logs(dir.path(), &[100.0, 900.0, 6000.0], &[80.0, 700.0]);

    let report = generate_cdf_chart(dir.path()).unwrap().expect("both sources have data");

    assert_eq!(report.direct.median, 900.0);
    assert_eq!(report.proxy.median, 390.0);
    assert_eq!(report.direct.max, 6000.0);

    let chart = dir.path().join(CHART_FILE);
    assert!(chart.exists());
    assert!(fs::metadata(&chart).unwrap().len() > 0);
}

#[test]
fn test_finish_run_renders_chart_when_both_sources_succeeded() {
    let dir = TempDir::new().unwrap();
    let outcome = write_logs(dir.path(), &[150.0, 250.0], &[100.0, 200.0]);

    let report = finish_run(dir.path(), &outcome).unwrap().expect("chart rendered");

    assert_eq!(report.direct.median, 200.0);
    assert_eq!(report.proxy.median, 150.0);
    assert!(fs::metadata(dir.path().join(CHART_FILE)).unwrap().len() > 0);
}

#[test]
fn test_finish_run_without_data_renders_nothing() {
    let dir = TempDir::new().unwrap();
    let outcome = write_logs(dir.path(), &[], &[100.0]);

    assert!(finish_run(dir.path(), &outcome).unwrap().is_none());
    assert!(!dir.path().join(CHART_FILE).exists());
}

#[test]
fn test_finish_run_reports_chart_failure_after_summary() {
    let dir = TempDir::new().unwrap();
    let outcome = write_logs(dir.path(), &[150.0, 250.0], &[100.0, 200.0]);
    // A directory at the chart path makes saving the image fail.
    fs::create_dir(dir.path().join(CHART_FILE)).unwrap();

    // The summary is still available from the outcome; only the chart fails.
    assert!(outcome.summary().is_some());
    assert!(matches!(finish_run(dir.path(), &outcome), Err(BenchError::Chart(_))));
}
