//! Lifecycle tests against a mock algorithm
//!
//! `MeanAlgorithm` predicts the (scaled) mean of the target seen during
//! training, which keeps the assertions about loading, persisting and scope
//! handling independent of any real learning code.

use futures::TryStreamExt;
use modelkit_core::{Error, Feature, Features, MemorySource, Record, Result, Sources};
use modelkit_models::prelude::*;
use modelkit_models::LifecycleStats;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeanConfig {
    location: PathBuf,
    features: Features,
    predict: Feature,
    #[serde(default = "default_scale")]
    scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl ModelConfig for MeanConfig {
    fn location(&self) -> Option<&Path> {
        Some(&self.location)
    }

    fn set_location(&mut self, location: PathBuf) {
        self.location = location;
    }

    fn features(&self) -> Option<&Features> {
        Some(&self.features)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MeanState {
    mean: Option<f64>,
    trained_on: usize,
}

struct MeanAlgorithm;

type MeanModel = SimpleModel<MeanAlgorithm>;

impl Algorithm for MeanAlgorithm {
    const NAME: &'static str = "mean";
    const CAPABILITIES: Capabilities = Capabilities::NUMERIC;

    type Config = MeanConfig;
    type State = MeanState;

    fn train(
        ctx: &AlgorithmContext<'_, MeanConfig>,
        state: &MeanState,
        records: &[Record],
    ) -> Result<MeanState> {
        if records.is_empty() {
            return Err(Error::invalid_data("no records"));
        }

        let target = ctx.config.predict.name();
        let mut sum = 0.0;
        for record in records {
            sum += record.feature_f64(target)?;
        }

        Ok(MeanState {
            mean: Some(sum / records.len() as f64),
            trained_on: state.trained_on + records.len(),
        })
    }

    fn is_trained(state: &MeanState) -> bool {
        state.mean.is_some()
    }

    fn predict(
        ctx: &AlgorithmContext<'_, MeanConfig>,
        state: &MeanState,
        record: Record,
    ) -> Result<Prediction> {
        let mean = state.mean.ok_or_else(|| Error::not_trained("mean"))?;
        Ok(Prediction::new(
            record,
            ctx.config.predict.name(),
            mean * ctx.config.scale,
            0.5,
        ))
    }
}

fn mean_config(location: &Path) -> MeanConfig {
    MeanConfig {
        location: location.to_path_buf(),
        features: Features::parse(["x:float:1"]).unwrap(),
        predict: "y:float:1".parse().unwrap(),
        scale: 1.0,
    }
}

fn sources(ys: &[f64]) -> Sources {
    let records = ys
        .iter()
        .enumerate()
        .map(|(i, y)| {
            Record::new(i.to_string())
                .with_feature("x", i as f64)
                .with_feature("y", *y)
        })
        .collect();
    MemorySource::new("test", records).into()
}

#[tokio::test]
async fn test_nested_scopes_load_and_persist_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut model = MeanModel::new(mean_config(dir.path()))?;

    {
        let mut outer = model.scope()?;
        outer.train(&sources(&[1.0, 3.0])).await?;
        {
            let mut middle = outer.nested()?;
            {
                let inner = middle.nested()?;
                assert_eq!(inner.depth(), 3);
            }
            assert_eq!(middle.depth(), 2);
        }
        assert_eq!(outer.depth(), 1);
        outer.close()?;
    }

    assert_eq!(model.depth(), 0);
    assert_eq!(model.stats(), LifecycleStats { loads: 1, persists: 1 });
    Ok(())
}

#[tokio::test]
async fn test_fresh_location_is_created_and_persisted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let location = dir.path().join("not").join("yet").join("there");
    let mut model = MeanModel::new(mean_config(&location))?;
    let path = model.disk_path()?;

    assert!(!location.exists());
    let scope = model.scope()?;
    assert!(location.is_dir());
    scope.close()?;

    assert!(path.is_file());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_created_location_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("private");
    let mut model = MeanModel::new(mean_config(&location)).unwrap();

    model.scope().unwrap().close().unwrap();

    let mode = std::fs::metadata(&location).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o700);
}

#[tokio::test]
async fn test_trained_state_survives_new_instance() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let mut first = MeanModel::new(mean_config(dir.path()))?;
    let mut scope = first.scope()?;
    scope.train(&sources(&[2.0, 4.0, 6.0])).await?;
    scope.close()?;

    let mut second = MeanModel::new(mean_config(dir.path()))?;
    let scope = second.scope()?;
    let predictions: Vec<_> = scope.predict(&sources(&[0.0]))?.try_collect().await?;
    assert_eq!(predictions[0].value_f64(), Some(4.0));
    assert_eq!(scope.state().trained_on, 3);
    scope.close()?;
    Ok(())
}

#[tokio::test]
async fn test_predict_before_training_is_not_trained() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MeanModel::new(mean_config(dir.path())).unwrap();

    let scope = model.scope().unwrap();
    let err = scope.predict(&sources(&[1.0])).err().unwrap();
    assert!(matches!(err, Error::ModelNotTrained(_)));
}

#[tokio::test]
async fn test_outside_scope_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MeanModel::new(mean_config(dir.path())).unwrap();
    let data = sources(&[1.0]);

    let err = model.train(&data).await.unwrap_err();
    assert!(matches!(err, Error::ContextNotOpen(_)));

    let err = model.predict(&data).err().unwrap();
    assert!(matches!(err, Error::ContextNotOpen(_)));
}

#[tokio::test]
async fn test_failed_training_keeps_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MeanModel::new(mean_config(dir.path())).unwrap();

    let mut scope = model.scope().unwrap();
    scope.train(&sources(&[5.0])).await.unwrap();
    assert!(scope.train(&sources(&[])).await.is_err());

    assert_eq!(scope.state().mean, Some(5.0));
    assert_eq!(scope.state().trained_on, 1);
}

async fn train_then_fail(model: &mut MeanModel) -> Result<()> {
    let mut scope = model.scope()?;
    scope.train(&sources(&[7.0])).await?;
    Err(Error::data_source("upstream went away"))
}

#[tokio::test]
async fn test_early_return_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MeanModel::new(mean_config(dir.path())).unwrap();

    assert!(train_then_fail(&mut model).await.is_err());
    assert_eq!(model.depth(), 0);
    assert_eq!(model.stats().persists, 1);

    let mut reopened = MeanModel::new(mean_config(dir.path())).unwrap();
    let scope = reopened.scope().unwrap();
    assert_eq!(scope.state().mean, Some(7.0));
}

#[test]
fn test_panic_inside_scope_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MeanModel::new(mean_config(dir.path())).unwrap();
    let path = model.disk_path().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _scope = model.scope().unwrap();
        panic!("boom");
    }));

    assert!(outcome.is_err());
    assert_eq!(model.depth(), 0);
    assert_eq!(model.stats().persists, 1);
    assert!(path.is_file());
}

#[test]
fn test_close_reports_persist_failure() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("models");
    let mut model = MeanModel::new(mean_config(&location)).unwrap();

    let scope = model.scope().unwrap();
    std::fs::remove_dir_all(&location).unwrap();

    assert!(matches!(scope.close(), Err(Error::Storage { .. })));
    assert_eq!(model.depth(), 0);
}

#[test]
fn test_storage_path_follows_config_not_location() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let here = MeanModel::new(mean_config(a.path())).unwrap();
    let there = MeanModel::new(mean_config(b.path())).unwrap();
    assert_eq!(
        here.disk_path().unwrap().file_name(),
        there.disk_path().unwrap().file_name()
    );

    let mut scaled_config = mean_config(a.path());
    scaled_config.scale = 2.0;
    let scaled = MeanModel::new(scaled_config).unwrap();
    assert_ne!(here.disk_path().unwrap(), scaled.disk_path().unwrap());
}

#[test]
fn test_location_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let messy = dir.path().join("a").join("..").join(".").join("b");

    let model = MeanModel::new(mean_config(&messy)).unwrap();
    assert_eq!(model.config().location, dir.path().join("b"));
}

#[test]
fn test_string_feature_rejected_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = mean_config(dir.path());
    config.features = Features::parse(["x:float:1", "name:str:1"]).unwrap();

    let err = MeanModel::new(config).err().unwrap();
    assert!(err.is_validation());
    assert!(err.to_string().contains("name"));
}

#[test]
fn test_repeated_feature_rejected_in_any_order() {
    let dir = tempfile::tempdir().unwrap();

    for decls in [["x:int:1", "x:float:1"], ["x:float:1", "x:int:1"]] {
        let mut config = mean_config(dir.path());
        config.features = Features::parse(decls).unwrap();

        let err = MeanModel::new(config).err().unwrap();
        assert!(matches!(err, Error::DuplicateFeature { ref feature, .. } if feature == "x"));
    }
}

#[tokio::test]
async fn test_registry_model_behind_trait_object() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut registry = ModelRegistry::new();
    registry.register::<MeanAlgorithm>();

    let mut model: Box<dyn Model> = registry.instantiate(
        "mean",
        json!({
            "location": dir.path(),
            "features": ["x:float:1", {"name": "w", "dtype": "int", "length": 1}],
            "predict": "y:float:1",
            "scale": 10.0,
        }),
    )?;
    assert_eq!(model.features(), ["w".to_string(), "x".to_string()]);

    let mut scope = model.scope()?;
    scope.train(&sources(&[1.0, 2.0, 3.0])).await?;
    {
        let nested = scope.nested()?;
        let predictions: Vec<_> = nested.predict(&sources(&[0.0, 0.0]))?.try_collect().await?;
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].key(), "1");
        assert_eq!(predictions[1].value_f64(), Some(20.0));
    }
    scope.close()?;

    assert!(model.disk_path()?.is_file());
    Ok(())
}

#[tokio::test]
async fn test_model_from_yaml_spec() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let spec_path = dir.path().join("model.yaml");
    std::fs::write(
        &spec_path,
        format!(
            "model: slr\nconfig:\n  location: {}\n  features:\n    - f1:float:1\n  predict: ans:float:1\n",
            dir.path().join("state").display()
        ),
    )?;

    let registry = ModelRegistry::with_builtins();
    let mut model = registry.instantiate_file(&spec_path)?;
    assert_eq!(model.name(), "slr");

    let records: Vec<Record> = (0..10)
        .map(|i| {
            let f1 = i as f64 * 0.1;
            Record::new(format!("r{}", i))
                .with_feature("f1", f1)
                .with_feature("ans", 3.0 * f1 - 1.0)
        })
        .collect();
    let data: Sources = MemorySource::new("train", records).into();

    let mut scope = model.scope()?;
    scope.train(&data).await?;
    let predictions: Vec<_> = scope.predict(&data)?.try_collect().await?;
    scope.close()?;

    assert_eq!(predictions.len(), 10);
    for prediction in predictions {
        let expected = prediction.record.feature_f64("ans")?;
        let value = prediction.value_f64().unwrap_or(f64::NAN);
        assert!((value - expected).abs() < 1e-9, "{} != {}", value, expected);
    }
    Ok(())
}

#[test]
fn test_unknown_spec_model() {
    let spec = ModelSpec::from_yaml("model: nope\n").unwrap();
    let err = ModelRegistry::with_builtins().instantiate_spec(&spec).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}
