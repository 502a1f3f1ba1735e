mod common;

use std::fs;
use std::path::Path;

use perf_report::artifact::ArtifactKind;
use perf_report::reporter::{self, Options, REPORT_FILE};
use perf_report::{Config, Error};
use pretty_assertions::assert_eq;

use common::{recorded_root, reports, write_artifact, write_config, CONFIG, STAMP};

fn options(data: &Path, dst: &Path, version: &str) -> Options {
    Options {
        data_root: data.to_path_buf(),
        dst_root: dst.to_path_buf(),
        version: version.to_string(),
        report_name: None,
    }
}

fn config(dir: &Path) -> Config {
    Config::from_file(write_config(dir, CONFIG)).unwrap()
}

#[test]
fn report_for_newest_recording() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let config = config(tool.path());

    let report = reporter::generate(&config, &options(tool.path(), dst.path(), "v1.0")).unwrap();
    assert_eq!(report, dst.path().join("rpt").join("v1.0").join(REPORT_FILE));
    assert!(report.is_absolute());

    let html = fs::read_to_string(&report).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"), "{}", &html[..40]);
    assert!(html.contains("<title>Performance Report - hot-loop v1.0</title>"));
    assert!(html.contains("Top Sampled Functions"));
    assert!(html.contains("cache-references"));
    assert!(html.contains("48,213,907"));
    assert!(html.contains("longest_match"));
    // `checksum` is hottest: 41 + 12 samples
    let checksum = html.find("<td class=\"name\">checksum</td>").unwrap();
    let longest = html.find("<td class=\"name\">longest_match</td>").unwrap();
    assert!(checksum < longest);
    // no benchmark file next to the project
    assert!(!html.contains("Google Benchmark Results"));
}

#[test]
fn flamegraph_link_is_relative_to_report() {
    let root = tempfile::tempdir().unwrap();
    recorded_root(root.path());
    let config = config(root.path());

    // data root and destination share a directory: rpt/v1 -> ../../gen/flamegraph
    let report = reporter::generate(&config, &options(root.path(), root.path(), "v1")).unwrap();
    let html = fs::read_to_string(report).unwrap();
    let href = format!(
        "href=\"../../gen/flamegraph/flamegraph-{}.svg\"",
        STAMP
    );
    assert!(html.contains(&href), "no {} in report", href);
    assert!(html.contains("target=\"_blank\""));
}

#[test]
fn newest_artifact_by_embedded_timestamp() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    // a newer recording whose hottest function is something else entirely
    write_artifact(
        tool.path(),
        ArtifactKind::Collapsed,
        "20261020-080000",
        "main;brand_new_hotspot 500\n",
    );
    let config = config(tool.path());

    let report = reporter::generate(&config, &options(tool.path(), dst.path(), "v2")).unwrap();
    let html = fs::read_to_string(report).unwrap();
    assert!(html.contains("brand_new_hotspot"));
    assert!(!html.contains("longest_match"));
}

#[test]
fn existing_report_is_never_overwritten() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let config = config(tool.path());
    let opt = options(tool.path(), dst.path(), "v1.0");

    let first = reporter::generate(&config, &opt).unwrap();
    fs::write(&first, "hand-edited").unwrap();

    let second = reporter::generate(&config, &opt).unwrap();
    assert_ne!(first, second);
    assert_eq!(fs::read_to_string(&first).unwrap(), "hand-edited");

    let folder = second.parent().unwrap().file_name().unwrap().to_str().unwrap();
    assert!(folder.starts_with("v1.0_"), "{}", folder);
    assert_eq!(reports(dst.path()).len(), 2);
}

#[test]
fn report_name_overrides_folder() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let config = config(tool.path());
    let mut opt = options(tool.path(), dst.path(), "v1.0");
    opt.report_name = Some("nightly".to_string());

    let report = reporter::generate(&config, &opt).unwrap();
    assert_eq!(report, dst.path().join("rpt").join("nightly").join(REPORT_FILE));
    let html = fs::read_to_string(report).unwrap();
    assert!(html.contains("v1.0"));

    opt.report_name = Some("../escape".to_string());
    assert!(matches!(
        reporter::generate(&config, &opt),
        Err(Error::InvalidReportName { .. })
    ));
}

#[test]
fn missing_flamegraph_writes_nothing() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let flamegraphs = tool.path().join("gen").join("flamegraph");
    fs::remove_dir_all(&flamegraphs).unwrap();
    fs::create_dir_all(&flamegraphs).unwrap();
    let config = config(tool.path());

    match reporter::generate(&config, &options(tool.path(), dst.path(), "v1")) {
        Err(Error::MissingArtifact { kind, dir }) => {
            assert_eq!(kind, ArtifactKind::Flamegraph);
            assert_eq!(dir, flamegraphs);
        }
        other => panic!("expected MissingArtifact, got {:?}", other),
    }
    assert!(reports(dst.path()).is_empty());
    assert!(!dst.path().join("rpt").exists());
}

#[test]
fn stat_without_counters_is_malformed() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    write_artifact(
        tool.path(),
        ArtifactKind::Stat,
        "20261020-000000",
        &common::fixture("stat/perf-stat-empty.txt"),
    );
    let config = config(tool.path());

    assert!(matches!(
        reporter::generate(&config, &options(tool.path(), dst.path(), "v1")),
        Err(Error::MalformedStat { .. })
    ));
    assert!(reports(dst.path()).is_empty());
}

#[test]
fn malformed_stacks_are_reported_not_fatal() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    write_artifact(
        tool.path(),
        ArtifactKind::Collapsed,
        "20261020-000000",
        &common::fixture("collapsed/collapsed-malformed.txt"),
    );
    let config = config(tool.path());

    let report = reporter::generate(&config, &options(tool.path(), dst.path(), "v1")).unwrap();
    let html = fs::read_to_string(report).unwrap();
    assert!(html.contains("Skipped 3 malformed line(s)"), "{}", html);
    assert!(html.contains("<td class=\"name\">bar</td>"));
}

#[test]
fn benchmark_results_are_charted() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let benchmarks = dst.path().join("benchmarks");
    fs::create_dir_all(&benchmarks).unwrap();
    fs::write(
        benchmarks.join("benchmark.json"),
        common::fixture("benchmark/benchmark.json"),
    )
    .unwrap();
    let config = config(tool.path());

    let report = reporter::generate(&config, &options(tool.path(), dst.path(), "v1")).unwrap();
    let html = fs::read_to_string(report).unwrap();
    assert!(html.contains("Google Benchmark Results"));
    assert!(html.contains("BM_Compress/65536"));
}

#[test]
fn reports_are_deterministic_apart_from_generation_time() {
    let tool = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    recorded_root(tool.path());
    let config = config(tool.path());

    let first = reporter::generate(&config, &options(tool.path(), dst.path(), "a")).unwrap();
    let second = reporter::generate(&config, &options(tool.path(), dst.path(), "b")).unwrap();
    let strip = |path: &Path| -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| {
                !(l.contains("<title>") || l.contains("Release:") || l.contains("Generated:"))
            })
            .map(str::to_string)
            .collect()
    };
    assert_eq!(strip(&first), strip(&second));
}
