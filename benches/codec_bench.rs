use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hdf5::File;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use tempfile::TempDir;

use pipeline_datasets::application::builder::DatasetBuilder;
use pipeline_datasets::application::codecs::{
    BinaryContainerCodec, ChartArtifactBuilder, ChartSpec, ContainerLoadArgs, ContainerSaveArgs,
};
use pipeline_datasets::application::Dataset;
use pipeline_datasets::config::DatasetConfig;
use pipeline_datasets::domain::entities::TabularData;
use pipeline_datasets::infrastructure::storage::LocalFileSystem;

fn container(codec: &BinaryContainerCodec, elements: usize) -> File {
    let file = codec.create_memory_file().unwrap();
    let group = file.create_group("measurements").unwrap();
    group
        .new_dataset::<i64>()
        .shape(elements)
        .create("values")
        .unwrap()
        .write_raw(&(0..elements as i64).collect::<Vec<_>>())
        .unwrap();
    group
        .new_dataset::<f64>()
        .shape(elements)
        .create("weights")
        .unwrap()
        .write_raw(&vec![0.5f64; elements])
        .unwrap();
    file
}

fn codec_benchmarks(c: &mut Criterion) {
    let codec = BinaryContainerCodec::new();
    let mut group = c.benchmark_group("container_codec");

    for elements in [1_000usize, 100_000] {
        let file = container(&codec, elements);
        let bytes = codec.encode(&file, &ContainerSaveArgs::default()).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", elements), &file, |b, file| {
            b.iter(|| codec.encode(black_box(file), &ContainerSaveArgs::default()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", elements), &bytes, |b, bytes| {
            b.iter(|| codec.decode(black_box(bytes), &ContainerLoadArgs::default()).unwrap())
        });
    }
    group.finish();
}

fn dataset_benchmarks(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.h5");
    let dataset = DatasetBuilder::new(DatasetConfig::new(path.to_str().unwrap()))
        .with_filesystem(Arc::new(LocalFileSystem::default()))
        .build_container()
        .unwrap();
    let file = container(&BinaryContainerCodec::shared(), 10_000);

    c.bench_function("container_dataset_save_load", |b| {
        b.iter(|| {
            dataset.save(black_box(&file)).unwrap();
            dataset.load().unwrap()
        })
    });
}

fn chart_benchmarks(c: &mut Criterion) {
    let rows = 10_000;
    let table = TabularData::from_columns([
        ("x", (0..rows).map(|i| json!(i)).collect::<Vec<_>>()),
        ("y", (0..rows).map(|i| json!((i as f64).sin())).collect()),
        ("group", (0..rows).map(|i| json!(format!("g{}", i % 8))).collect()),
    ])
    .unwrap();
    let spec: ChartSpec = serde_json::from_value(json!({
        "type": "scatter",
        "fig": {"x": "x", "y": "y", "color": "group"}
    }))
    .unwrap();
    let builder = ChartArtifactBuilder::new();

    c.bench_function("chart_build_scatter_10k", |b| {
        b.iter(|| builder.build(black_box(&table), &spec).unwrap())
    });
}

criterion_group!(benches, codec_benchmarks, dataset_benchmarks, chart_benchmarks);
criterion_main!(benches);
