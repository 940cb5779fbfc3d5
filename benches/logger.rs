#![feature(test)]
extern crate test;

#[cfg(test)]
mod tests {
    use obskit::logger::{CallerAligner, CoreOptions, Encoding, Level, Logger};
    use test::Bencher;

    fn file_logger(encoding: Encoding) -> (tempfile::TempDir, Logger) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bench.log");
        let logger = Logger::new([CoreOptions::new(path.to_string_lossy(), Level::Info, encoding)])
            .unwrap();
        (temp, logger)
    }

    #[bench]
    fn bench_json_record(b: &mut Bencher) {
        let (_temp, logger) = file_logger(Encoding::Json);
        logger.in_scope(|| {
            b.iter(|| tracing::info!(user = "smileEveryday", attempt = 3, "request served"));
        });
    }

    #[bench]
    fn bench_console_record(b: &mut Bencher) {
        let (_temp, logger) = file_logger(Encoding::Console);
        logger.in_scope(|| {
            b.iter(|| tracing::info!(user = "smileEveryday", attempt = 3, "request served"));
        });
    }

    #[bench]
    fn bench_filtered_record(b: &mut Bencher) {
        let (_temp, logger) = file_logger(Encoding::Json);
        logger.in_scope(|| {
            b.iter(|| tracing::debug!(user = "smileEveryday", "dropped by level"));
        });
    }

    #[bench]
    fn bench_caller_padding(b: &mut Bencher) {
        let aligner = CallerAligner::new();
        b.iter(|| std::hint::black_box(aligner.pad("handlers/checkout.rs:128")));
    }
}
