#![no_main]

use libfuzzer_sys::fuzz_target;
use perf_report::stat;

fuzz_target!(|data: &[u8]| {
    if let Ok(samples) = stat::from_reader(data) {
        for sample in samples {
            if let Some(pct) = sample.percentage {
                assert!(pct.is_finite());
            }
        }
    }
});
