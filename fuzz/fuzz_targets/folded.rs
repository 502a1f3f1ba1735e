#![no_main]

use libfuzzer_sys::fuzz_target;
use perf_report::folded::{self, Options, RankBy};

fuzz_target!(|data: &[u8]| {
    for rank_by in [RankBy::Leaf, RankBy::Stack, RankBy::Inclusive] {
        let opt = Options { rank_by, top_n: 5 };
        if let Ok(ranking) = folded::from_reader(&opt, data) {
            assert!(ranking.functions.len() <= 5);
            assert!(ranking
                .functions
                .windows(2)
                .all(|w| w[0].samples >= w[1].samples));
        }
    }
});
