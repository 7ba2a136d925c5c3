//! モデル推論機能
//!
//! 成果物（tar.gz）からモデルを復元し、画像1枚を2クラスの確率へ
//! 変換します。モデルの読み込み成否は `ModelState` で明示的に扱い、
//! 未読み込み時の予測は例外ではなくエラーとして返します。

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};
use image::DynamicImage;

use crate::ml::{GenderNet, ModelConfig};
use crate::model::{load_model_with_metadata, ModelMetadata};
use crate::preprocess;

/// 推論結果（softmaxによる2クラスの確率、合計は約1）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenderPrediction {
    /// 男性の確率（0〜1）
    pub male: f32,
    /// 女性の確率（0〜1）
    pub female: f32,
}

/// 推論エンジン
pub struct InferenceEngine {
    model: GenderNet<NdArray>,
    metadata: ModelMetadata,
    device: NdArrayDevice,
}

impl InferenceEngine {
    /// モデル成果物を読み込んで推論エンジンを初期化する
    ///
    /// ファイルが存在しない、または復元に失敗した場合はエラーを返します。
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            bail!("モデルファイルが見つかりません: {}", path.display());
        }

        let (metadata, model_binary) = load_model_with_metadata(path)?;

        let device = NdArrayDevice::default();

        // 推論時はドロップアウトなし
        let model = ModelConfig::new()
            .with_dropout(0.0)
            .init::<NdArray>(&device);

        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = recorder
            .load(model_binary, &device)
            .map_err(|e| anyhow!("モデル重みの読み込みエラー: {:?}", e))?;

        Ok(Self {
            model: model.load_record(record),
            metadata,
            device,
        })
    }

    /// 画像1枚を推論して2クラスの確率を返す
    ///
    /// インデックス0 = 男性、1 = 女性。呼び出し側が100倍して
    /// パーセント表示にします。
    pub fn predict_image(&self, img: &DynamicImage) -> Result<GenderPrediction> {
        let size = self.metadata.image_size as usize;
        let data = preprocess::image_to_normalized_chw(img, size);
        let tensor = preprocess::to_batch_tensor::<NdArray>(&data, size, &self.device);

        let probs = self.model.predict(tensor);
        let values = probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("推論結果の取得エラー: {:?}", e))?;

        if values.len() != 2 {
            bail!("推論出力の形状が不正です: {} クラス", values.len());
        }

        Ok(GenderPrediction {
            male: values[0],
            female: values[1],
        })
    }

    /// 画像ファイルを読み込んで推論する
    pub fn predict_path<P: AsRef<Path>>(&self, path: P) -> Result<GenderPrediction> {
        let img = preprocess::load_image(path)?;
        self.predict_image(&img)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// 読み込み済み/読み込み失敗を明示するモデルハンドル
///
/// 読み込みに失敗した場合は失敗理由を保持し、以後の予測要求は
/// すべて明示的なエラーで短絡します（クラッシュしない縮退状態）。
pub enum ModelState {
    Loaded(InferenceEngine),
    Unavailable(String),
}

impl ModelState {
    /// 成果物の読み込みを試みる（失敗してもパニックしない）
    pub fn load<P: AsRef<Path>>(model_path: P) -> Self {
        match InferenceEngine::load(&model_path) {
            Ok(engine) => ModelState::Loaded(engine),
            Err(e) => ModelState::Unavailable(format!("{e:#}")),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    /// 推論を実行する。モデル未読み込み時は明示的なエラーを返す
    pub fn predict_image(&self, img: &DynamicImage) -> Result<GenderPrediction> {
        match self {
            ModelState::Loaded(engine) => engine.predict_image(img),
            ModelState::Unavailable(reason) => {
                Err(anyhow!("モデルが読み込まれていません: {reason}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::save_model_with_metadata;
    use burn::record::BinFileRecorder;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gc_infer_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// 未学習の重みで成果物を作る（推論経路の検証用）
    fn save_test_artifact(dir: &Path) -> PathBuf {
        let device = NdArrayDevice::default();
        let model = ModelConfig::new().with_dropout(0.0).init::<NdArray>(&device);

        let record_path = dir.join("model");
        model
            .save_file(
                &record_path,
                &BinFileRecorder::<FullPrecisionSettings>::new(),
            )
            .unwrap();
        let model_binary = std::fs::read(format!("{}.bin", record_path.display())).unwrap();

        let metadata = ModelMetadata::new(
            vec!["male".to_string(), "female".to_string()],
            96,
            1,
            2,
            1e-4,
            4,
            1,
        );
        let artifact_path = dir.join("gender_model.tar.gz");
        save_model_with_metadata(&artifact_path, &metadata, &model_binary).unwrap();
        artifact_path
    }

    #[test]
    fn test_missing_artifact_is_load_error() {
        assert!(InferenceEngine::load("/no/such/model.tar.gz").is_err());
    }

    #[test]
    fn test_unavailable_state_short_circuits_predictions() {
        let state = ModelState::load("/no/such/model.tar.gz");
        assert!(!state.is_loaded());

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(96, 96, Rgb([100, 100, 100])));
        let err = state.predict_image(&img).unwrap_err();
        assert!(err.to_string().contains("モデルが読み込まれていません"));
    }

    #[test]
    fn test_artifact_roundtrip_predicts_valid_probabilities() {
        let dir = temp_dir("roundtrip");
        let artifact_path = save_test_artifact(&dir);

        let engine = InferenceEngine::load(&artifact_path).unwrap();
        assert_eq!(engine.metadata().image_size, 96);

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, Rgb([180, 120, 60])));
        let prediction = engine.predict_image(&img).unwrap();

        // 2クラスのパーセントは合計で約100になる
        let male_pct = prediction.male * 100.0;
        let female_pct = prediction.female * 100.0;
        assert!((male_pct + female_pct - 100.0).abs() < 1e-3);

        // 同一入力・同一重みなら結果は毎回同一
        let again = engine.predict_image(&img).unwrap();
        assert_eq!(prediction, again);

        std::fs::remove_dir_all(&dir).ok();
    }
}
