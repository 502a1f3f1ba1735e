#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use perf_report::artifact::{self, ArtifactKind};

pub const STAMP: &str = "20261019-101500";

pub const CONFIG: &str = r#"{
  "project_name": "hot-loop",
  "top_n": 5,
  "paths": {
    "perf_stat": "gen/stat",
    "collapsed": "gen/collapsed",
    "flamegraph": "gen/flamegraph",
    "report_output": "rpt"
  }
}"#;

pub const FLAMEGRAPH: &str = r#"<?xml version="1.0" standalone="no"?><svg version="1.1" xmlns="http://www.w3.org/2000/svg"></svg>
"#;

/// A tool root holding one complete recording made from the fixtures in `tests/data`.
pub fn recorded_root(root: &Path) {
    write_artifact(
        root,
        ArtifactKind::Stat,
        STAMP,
        &fixture("stat/perf-stat-20261019-101500.txt"),
    );
    write_artifact(
        root,
        ArtifactKind::Collapsed,
        STAMP,
        &fixture("collapsed/collapsed-20261019-101500.txt"),
    );
    write_artifact(root, ArtifactKind::Flamegraph, STAMP, FLAMEGRAPH);
}

pub fn write_artifact(root: &Path, kind: ArtifactKind, stamp: &str, contents: &str) -> PathBuf {
    let dir = artifact::artifact_dir(root, kind);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(kind.file_name(stamp));
    fs::write(&path, contents).unwrap();
    path
}

pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, contents).unwrap();
    path
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(Path::new("./tests/data").join(name)).unwrap()
}

/// Every `report.html` below `dir`.
pub fn reports(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                found.extend(reports(&path));
            } else if path.file_name().map_or(false, |n| n == "report.html") {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}
