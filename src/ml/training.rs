//! モデル学習機能
//!
//! データセット読み込み → 層化分割 → オーグメンテーション付き学習 →
//! tar.gz成果物の保存までを実行します。

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::Module,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Int, Tensor,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};

use crate::ml::augment::{self, AugmentConfig};
use crate::ml::dataset::{FaceDataset, FaceItem};
use crate::ml::{GenderNet, ModelConfig};
use crate::model::{save_model_with_metadata, ModelMetadata, TrainingSettings};
use crate::CLASS_NAMES;

/// バッチャー
///
/// 正規化済みサンプルをまとめて1つのテンソルにします。学習用は
/// サンプルごとにランダムなオーグメンテーションをその場で適用します。
#[derive(Clone)]
pub struct FaceBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
    augment: Option<AugmentConfig>,
}

impl<B: Backend> FaceBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self {
            device,
            image_size,
            augment: None,
        }
    }

    /// 学習用バッチャー（オーグメンテーション有効）
    pub fn with_augment(mut self, config: AugmentConfig) -> Self {
        self.augment = Some(config);
        self
    }
}

impl<B: Backend> Batcher<B, FaceItem, FaceBatch<B>> for FaceBatcher<B> {
    fn batch(&self, items: Vec<FaceItem>, _device: &B::Device) -> FaceBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;
        let mut all_pixels = Vec::with_capacity(batch_size * 3 * size * size);
        let mut targets_vec = Vec::with_capacity(batch_size);
        let mut rng = rand::thread_rng();

        for item in items {
            match &self.augment {
                Some(config) => {
                    let params = config.sample(&mut rng);
                    all_pixels.extend_from_slice(&augment::apply(&item.pixels, size, &params));
                }
                None => all_pixels.extend_from_slice(&item.pixels),
            }
            targets_vec.push(item.label as i64);
        }

        // 1回の転送でバッチ全体をテンソル化する
        let images = Tensor::<B, 1>::from_floats(all_pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, size, size]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_vec.as_slice(), &self.device);

        FaceBatch { images, targets }
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct FaceBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

/// 学習時の順伝播 + 逆伝播
impl<B: AutodiffBackend> TrainStep<FaceBatch<B>, ClassificationOutput<B>> for GenderNet<B> {
    fn step(&self, batch: FaceBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);
        let grads = item.loss.backward();
        TrainOutput::new(self, grads, item)
    }
}

/// 検証時の順伝播のみ
impl<B: Backend> ValidStep<FaceBatch<B>, ClassificationOutput<B>> for GenderNet<B> {
    fn step(&self, batch: FaceBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

/// 学習結果の概要
#[derive(Debug)]
pub struct TrainReport {
    pub train_samples: usize,
    pub val_samples: usize,
    pub artifact_path: PathBuf,
}

/// モデル学習を実行して成果物を保存する
///
/// 固定エポック数を最後まで実行します（早期終了なし）。成果物は
/// `output_path` のtar.gzへ無条件に上書き保存されます。
pub fn train_model(
    data_dir: &Path,
    output_path: &Path,
    settings: &TrainingSettings,
) -> Result<TrainReport> {
    use burn::{
        data::dataloader::DataLoaderBuilder,
        optim::AdamConfig,
        record::{BinFileRecorder, DefaultFileRecorder, FullPrecisionSettings, Recorder},
        train::{
            metric::{AccuracyMetric, LossMetric},
            LearnerBuilder, LearningStrategy,
        },
    };

    let image_size = settings.image_size;

    // --- データセット読み込み ---
    println!("[INFO] データセットを読み込みます: {}", data_dir.display());
    let dataset = FaceDataset::from_directory(data_dir, image_size)?;

    let [male, female] = dataset.label_counts();
    println!(
        "[INFO] 有効サンプル: {} (男性: {}, 女性: {}) / スキップ: {}",
        dataset.len(),
        male,
        female,
        dataset.skipped().len()
    );

    // --- 層化分割 ---
    let (dataset_train, dataset_val) =
        dataset.stratified_split(settings.train_ratio, settings.seed);
    let train_samples = dataset_train.len();
    let val_samples = dataset_val.len();
    println!(
        "[INFO] 学習データ: {} / 検証データ: {}",
        train_samples, val_samples
    );

    let device = NdArrayDevice::default();

    // --- モデル構築（凍結バックボーン + 学習ヘッド） ---
    let freeze = settings.freeze_backbone && settings.backbone_weights.is_some();
    if settings.freeze_backbone && settings.backbone_weights.is_none() {
        println!("[WARN] 事前学習済みバックボーンが未指定のため、全層を学習します");
    }

    let model_config = ModelConfig::new()
        .with_dropout(settings.dropout)
        .with_freeze_backbone(freeze);
    let mut model = model_config.init::<Autodiff<NdArray>>(&device);

    if let Some(weights) = &settings.backbone_weights {
        let recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(PathBuf::from(weights), &device)
            .map_err(|e| anyhow!("バックボーン重みの読み込みエラー: {:?}", e))?;
        model = model.with_backbone_record(record);
        println!("[INFO] 事前学習済みバックボーンを読み込みました: {weights}");
    }

    // --- データローダー ---
    // オーグメンテーションは学習側のみ。分割時にシャッフル済みなので
    // ここでのシャッフルは不要
    let batcher_train = FaceBatcher::<Autodiff<NdArray>>::new(device.clone(), image_size)
        .with_augment(AugmentConfig::default());
    let batcher_val = FaceBatcher::<NdArray>::new(device.clone(), image_size);

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(settings.batch_size)
        .num_workers(0)
        .build(dataset_train);
    let dataloader_val = DataLoaderBuilder::new(batcher_val)
        .batch_size(settings.batch_size)
        .num_workers(0)
        .build(dataset_val);

    // --- 学習 ---
    let artifact_dir = std::env::temp_dir().join("gender_classifier_training");
    std::fs::create_dir_all(&artifact_dir)?;
    let artifact_dir_str = artifact_dir.to_string_lossy().to_string();

    println!(
        "[INFO] 学習を開始します (エポック: {}, バッチ: {}, 学習率: {})",
        settings.num_epochs, settings.batch_size, settings.learning_rate
    );

    let learner = LearnerBuilder::new(&artifact_dir_str)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .learning_strategy(LearningStrategy::SingleDevice(device.clone()))
        .num_epochs(settings.num_epochs)
        .summary()
        .build(model, AdamConfig::new().init(), settings.learning_rate);

    let model_trained = learner.fit(dataloader_train, dataloader_val);

    // --- 保存（f32精度の重みレコードをメタデータと共にtar.gzへ） ---
    // 推論側はBinBytesRecorderで復元するため、同形式のBinFileRecorderで保存する
    let temp_model_path = artifact_dir.join("model");
    model_trained
        .model
        .save_file(
            &temp_model_path,
            &BinFileRecorder::<FullPrecisionSettings>::new(),
        )
        .map_err(|e| anyhow!("モデルレコードの保存エラー: {:?}", e))?;

    let model_binary = std::fs::read(format!("{}.bin", temp_model_path.display()))
        .context("保存したモデルレコードを読み込めません")?;

    let metadata = ModelMetadata::new(
        CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        image_size as u32,
        settings.num_epochs as u32,
        settings.batch_size as u32,
        settings.learning_rate,
        train_samples as u32,
        val_samples as u32,
    );
    save_model_with_metadata(output_path, &metadata, &model_binary)?;

    std::fs::remove_dir_all(&artifact_dir).ok();

    Ok(TrainReport {
        train_samples,
        val_samples,
        artifact_path: output_path.to_path_buf(),
    })
}
