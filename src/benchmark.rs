use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

/// One entry of a Google Benchmark JSON report.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    /// Benchmark name, including any arguments (`BM_Insert/1024`).
    pub name: String,
    /// CPU time per iteration, in nanoseconds.
    pub cpu_time_ns: f64,
}

#[derive(Deserialize)]
struct Report {
    #[serde(default)]
    benchmarks: Vec<Value>,
}

/// Parse the output of a benchmark binary run with `--benchmark_format=json`.
///
/// Entries without a `name` or a numeric `cpu_time` are skipped. Times are converted to
/// nanoseconds using each entry's `time_unit`.
pub fn from_reader<R>(reader: R) -> serde_json::Result<Vec<BenchmarkResult>>
where
    R: Read,
{
    let report: Report = serde_json::from_reader(reader)?;
    Ok(report
        .benchmarks
        .iter()
        .filter_map(|bench| {
            let name = bench.get("name")?.as_str()?;
            let cpu_time = bench.get("cpu_time")?.as_f64()?;
            let scale = match bench.get("time_unit").and_then(Value::as_str) {
                Some("us") => 1e3,
                Some("ms") => 1e6,
                Some("s") => 1e9,
                _ => 1.0,
            };
            Some(BenchmarkResult {
                name: name.to_string(),
                cpu_time_ns: cpu_time * scale,
            })
        })
        .collect())
}

/// Load benchmark results from `path`.
///
/// Benchmark results are optional decoration of a report, so a missing or unreadable file
/// yields no results rather than an error.
pub fn load(path: &Path) -> Vec<BenchmarkResult> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No benchmark results at {}", path.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Cannot open benchmark results {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match from_reader(io::BufReader::new(file)) {
        Ok(results) => {
            info!("Loaded {} benchmark results", results.len());
            results
        }
        Err(e) => {
            warn!("Ignoring invalid benchmark results {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_time_units() {
        let json = r#"{
            "context": {"num_cpus": 8},
            "benchmarks": [
                {"name": "BM_Get", "cpu_time": 12.5, "time_unit": "ns"},
                {"name": "BM_Put/64", "cpu_time": 2.0, "time_unit": "us"},
                {"name": "BM_Broken"},
                {"cpu_time": 1.0}
            ]
        }"#;
        let results = from_reader(json.as_bytes()).unwrap();
        assert_eq!(
            results,
            vec![
                BenchmarkResult {
                    name: "BM_Get".to_string(),
                    cpu_time_ns: 12.5,
                },
                BenchmarkResult {
                    name: "BM_Put/64".to_string(),
                    cpu_time_ns: 2000.0,
                },
            ]
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("benchmark.json")).is_empty());
    }

    #[test]
    fn invalid_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchmark.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path).is_empty());
    }
}
