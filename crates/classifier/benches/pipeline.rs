use classifier::{DecisionEngine, LabelCatalog, Normalization, PreProcessor};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Write a synthetic camera-sized photo for the preprocessing bench
fn write_test_image(dir: &tempfile::TempDir, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.path().join(format!("frame_{width}x{height}.png"));
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    img.save(&path).unwrap();
    path
}

fn bench_preprocessing(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();

    let mut group = c.benchmark_group("preprocess");
    for (width, height) in [(640, 480), (1280, 720), (1920, 1080)] {
        let path = write_test_image(&dir, width, height);
        let preprocessor = PreProcessor::new((224, 224), Normalization::Imagenet);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &path,
            |b, path| b.iter(|| preprocessor.preprocess(black_box(path)).unwrap()),
        );
    }
    group.finish();
}

fn bench_threshold_decision(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    for num_classes in [16usize, 64, 256] {
        let catalog = LabelCatalog::from_labels(
            (0..num_classes).map(|i| format!("class_{i}")).collect(),
        )
        .unwrap();
        let scores: Vec<f32> = (0..num_classes)
            .map(|i| ((i * 37) % 100) as f32 / 100.0)
            .collect();
        let engine = DecisionEngine::new(0.2);

        group.bench_with_input(
            BenchmarkId::from_parameter(num_classes),
            &scores,
            |b, scores| b.iter(|| engine.decide(black_box(scores), &catalog)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_threshold_decision);
criterion_main!(benches);
