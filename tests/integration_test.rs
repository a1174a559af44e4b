use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use pipeline_datasets::{
    application::{
        builder::DatasetBuilder, codecs::BinaryContainerCodec, ports::FileSystem, Dataset,
    },
    config::{CatalogEntry, DatasetConfig, FsArgs},
    domain::{entities::Figure, value_objects::Version},
    infrastructure::storage::{LocalFileSystem, MemoryFileSystem},
    DatasetError,
};

use test_fixtures::{
    assertions, memory_path, numbered_container, sample_container, sample_table, TestEnvironment,
};

/// Versions are millisecond timestamps
fn next_version_tick() {
    sleep(Duration::from_millis(5));
}

#[test]
fn test_container_round_trip_local() {
    let env = TestEnvironment::new();
    let dataset = env.container_dataset(DatasetConfig::new(env.path("raw/sample.h5")));

    assert!(!dataset.exists().unwrap());
    dataset.save(&sample_container(&env.codec)).unwrap();
    assert!(dataset.exists().unwrap());

    let loaded = dataset.load().unwrap();
    assert_eq!(loaded.member_names().unwrap(), vec!["b", "foo"]);
    assertions::assert_int_dataset(&loaded, "/foo/a", &[0, 1, 2, 3]);
    assert_eq!(loaded.dataset("foo/a").unwrap().shape(), vec![2, 2]);
    assert_eq!(env.codec.stats().images_created, 1);
    assert_eq!(env.codec.stats().images_opened, 1);
}

#[test]
fn test_container_round_trip_memory() {
    let dataset = DatasetBuilder::new(DatasetConfig::new(memory_path("sample.h5")))
        .build_container()
        .unwrap();

    let codec = BinaryContainerCodec::shared();
    dataset.save(&sample_container(&codec)).unwrap();
    let loaded = dataset.load().unwrap();
    assert_eq!(
        loaded.dataset("b").unwrap().read_raw::<f64>().unwrap(),
        vec![1.5, 2.5, 3.5]
    );
    assert_eq!(dataset.describe()["protocol"], "memory");
}

#[test]
fn test_versioned_load_picks_latest() {
    let env = TestEnvironment::new();
    let config = DatasetConfig::new(env.path("model/weights.h5")).with_version(Version::default());
    let dataset = env.container_dataset(config);

    assert!(!dataset.exists().unwrap());
    assert!(matches!(
        dataset.load(),
        Err(DatasetError::PathResolution(_))
    ));

    dataset.save(&numbered_container(&env.codec, 1)).unwrap();
    next_version_tick();
    dataset.save(&numbered_container(&env.codec, 2)).unwrap();

    assert!(dataset.exists().unwrap());
    assertions::assert_int_dataset(&dataset.load().unwrap(), "/n", &[2; 8]);

    let versions = LocalFileSystem::default()
        .glob(&env.path("model/weights.h5/*/weights.h5"))
        .unwrap();
    assert_eq!(versions.len(), 2);
}

#[test]
fn test_pinned_load_version() {
    let env = TestEnvironment::new();
    let writer = env.container_dataset(
        DatasetConfig::new(env.path("a.h5")).with_version(Version::pinned("2020-01-01T00.00.00.000Z")),
    );
    writer.save(&numbered_container(&env.codec, 7)).unwrap();

    let latest = env.container_dataset(DatasetConfig::new(env.path("a.h5")).with_version(Version::default()));
    latest.save(&numbered_container(&env.codec, 8)).unwrap();

    let pinned = env.container_dataset(
        DatasetConfig::new(env.path("a.h5"))
            .with_version(Version::new(Some("2020-01-01T00.00.00.000Z".to_string()), None)),
    );
    assertions::assert_int_dataset(&pinned.load().unwrap(), "/n", &[7; 8]);
    assertions::assert_int_dataset(&latest.load().unwrap(), "/n", &[8; 8]);
}

#[test]
fn test_saving_same_version_twice_fails() {
    let env = TestEnvironment::new();
    let config = DatasetConfig::new(env.path("a.h5")).with_version(Version::pinned("v1"));
    let dataset = env.container_dataset(config);

    dataset.save(&numbered_container(&env.codec, 1)).unwrap();
    assert!(matches!(
        dataset.save(&numbered_container(&env.codec, 2)),
        Err(DatasetError::Versioning(_))
    ));
    assertions::assert_int_dataset(&dataset.load().unwrap(), "/n", &[1; 8]);
}

#[test]
fn test_release_drops_cached_load_version() {
    let env = TestEnvironment::new();
    let path = env.path("shared.h5");
    let reader = env.container_dataset(DatasetConfig::new(&path).with_version(Version::default()));
    let writer = env.container_dataset(DatasetConfig::new(&path).with_version(Version::default()));

    writer.save(&numbered_container(&env.codec, 1)).unwrap();
    assertions::assert_int_dataset(&reader.load().unwrap(), "/n", &[1; 8]);

    next_version_tick();
    writer.save(&numbered_container(&env.codec, 2)).unwrap();
    // Resolved version stays cached until release
    assertions::assert_int_dataset(&reader.load().unwrap(), "/n", &[1; 8]);

    reader.release().unwrap();
    assertions::assert_int_dataset(&reader.load().unwrap(), "/n", &[2; 8]);
}

#[test]
fn test_user_open_args_are_honoured() {
    let env = TestEnvironment::new();
    let fs_args: FsArgs = serde_json::from_value(json!({"open_args_save": {"mode": "xb"}})).unwrap();
    let dataset = env.container_dataset(DatasetConfig::new(env.path("once.h5")).with_fs_args(fs_args));

    dataset.save(&numbered_container(&env.codec, 1)).unwrap();
    assert!(matches!(
        dataset.save(&numbered_container(&env.codec, 2)),
        Err(DatasetError::Storage(_))
    ));
    assertions::assert_int_dataset(&dataset.load().unwrap(), "/n", &[1; 8]);
}

#[test]
fn test_without_auto_mkdir_missing_directory_fails() {
    let env = TestEnvironment::new();
    let fs_args: FsArgs = serde_json::from_value(json!({"auto_mkdir": false})).unwrap();
    let dataset = DatasetBuilder::new(
        DatasetConfig::new(env.path("missing/dir/a.h5")).with_fs_args(fs_args),
    )
    .build_container()
    .unwrap();

    assert!(matches!(
        dataset.save(&sample_container(&env.codec)),
        Err(DatasetError::Storage(_))
    ));
}

#[test]
fn test_corrupted_file_fails_to_decode() {
    let env = TestEnvironment::new();
    let path = env.path("corrupt.h5");
    let dataset = env.container_dataset(DatasetConfig::new(&path));
    dataset.save(&sample_container(&env.codec)).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(dataset.load(), Err(DatasetError::Decode(_))));

    let mut unsigned = bytes.clone();
    unsigned[..8].copy_from_slice(b"NOTHDF5!");
    std::fs::write(&path, &unsigned).unwrap();
    assert!(matches!(dataset.load(), Err(DatasetError::Decode(_))));
    assert_eq!(env.codec.stats().open_failures, 2);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Metrics {
    accuracy: f64,
    labels: Vec<String>,
}

#[test]
fn test_json_dataset_round_trip() {
    let env = TestEnvironment::new();
    let config = DatasetConfig::new(env.path("metrics.json"))
        .with_save_args(json!({"pretty": true}).as_object().unwrap().clone());
    let dataset = DatasetBuilder::new(config).build_json::<Metrics>().unwrap();
    let metrics = Metrics {
        accuracy: 0.93,
        labels: vec!["cat".to_string(), "dog".to_string()],
    };

    dataset.save(&metrics).unwrap();
    assert_eq!(dataset.load().unwrap(), metrics);

    let text = std::fs::read_to_string(env.path("metrics.json")).unwrap();
    assert!(text.contains("\n  \"accuracy\""));
}

#[test]
fn test_chart_dataset_from_catalog() {
    let env = TestEnvironment::new();
    let yaml = format!(
        r#"
type: chart
filepath: {}
versioned: true
plotly_args:
  type: bar
  theme: plotly_dark
  fig:
    x: features
    y: importance
    color: kind
    orientation: h
  layout:
    xaxis_title: x
    yaxis_title: y
    title: Test
"#,
        env.path("reports/importance.json")
    );
    let CatalogEntry::Chart {
        config,
        plotly_args,
    } = CatalogEntry::parse(&yaml, "yaml").unwrap()
    else {
        panic!("expected a chart entry");
    };
    let dataset = DatasetBuilder::new(config).build_chart(plotly_args).unwrap();

    assert!(!dataset.exists().unwrap());
    dataset.save(&sample_table()).unwrap();
    assert!(dataset.exists().unwrap());

    let figure: Figure = dataset.load().unwrap();
    assert_eq!(figure.data.len(), 2);
    assert_eq!(figure.data[0].kind, "bar");
    assert_eq!(figure.data[0].get("name"), Some(&json!("raw")));
    assert_eq!(figure.data[0].get("x"), Some(&json!(["age", "income"])));
    assert_eq!(figure.data[0].get("orientation"), Some(&json!("h")));
    assert_eq!(figure.data[1].get("y"), Some(&json!([0.3])));
    assert_eq!(figure.layout_value("title.text"), Some(&json!("Test")));
    assert_eq!(figure.layout_value("yaxis.title.text"), Some(&json!("y")));
    assert_eq!(
        figure.layout_value("template.layout.paper_bgcolor"),
        Some(&json!("rgb(17,17,17)"))
    );
}

#[test]
fn test_chart_unknown_theme_fails_before_writing() {
    let fs = Arc::new(MemoryFileSystem::new());
    let plotly_args = serde_json::from_value(json!({
        "type": "line",
        "theme": "solarized",
        "fig": {"x": "features", "y": "importance"}
    }))
    .unwrap();
    let dataset = DatasetBuilder::new(DatasetConfig::new("memory://charts/line.json"))
        .with_filesystem(fs.clone())
        .build_chart(plotly_args)
        .unwrap();

    assert!(matches!(
        dataset.save(&sample_table()),
        Err(DatasetError::InvalidArguments(_))
    ));
    assert!(fs.is_empty());
}

#[test]
fn test_concurrent_saves_share_the_codec_lock() {
    let env = TestEnvironment::new();
    let datasets: Vec<_> = (0..4)
        .map(|i| env.container_dataset(DatasetConfig::new(env.path(&format!("c{}.h5", i)))))
        .collect();

    let codec = &env.codec;
    std::thread::scope(|scope| {
        for (i, dataset) in datasets.iter().enumerate() {
            scope.spawn(move || {
                dataset.save(&numbered_container(codec, i as i64)).unwrap();
            });
        }
    });

    assert_eq!(env.codec.stats().images_created, 4);
    for (i, dataset) in datasets.iter().enumerate() {
        assertions::assert_int_dataset(&dataset.load().unwrap(), "/n", &[i as i64; 8]);
    }
}
