//! アプリケーション設定管理モジュール
//!
//! モデルパス・データディレクトリ・学習条件・読み上げ設定を
//! JSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// トレーニング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// モデル入力の画像サイズ（正方形）
    pub image_size: usize,
    /// エポック数
    pub num_epochs: usize,
    /// バッチサイズ
    pub batch_size: usize,
    /// 学習率
    pub learning_rate: f64,
    /// 分割用のランダムシード
    pub seed: u64,
    /// 学習データの割合
    pub train_ratio: f32,
    /// ヘッドのドロップアウト率
    pub dropout: f64,
    /// バックボーンを凍結するか
    pub freeze_backbone: bool,
    /// 事前学習済みバックボーンのレコードファイル（.mpk）
    #[serde(default)]
    pub backbone_weights: Option<String>,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            image_size: crate::IMAGE_SIZE,
            num_epochs: 10,
            batch_size: 32,
            learning_rate: 1e-4,
            seed: 42,
            train_ratio: 0.8,
            dropout: 0.3,
            freeze_backbone: true,
            backbone_weights: None,
        }
    }
}

/// 音声読み上げ設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// 読み上げを行うか
    pub enabled: bool,
    /// 読み上げ速度（1.0 = エンジンの標準速度）
    pub rate_scale: f32,
    /// 音量（0.0〜1.0）
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_scale: 1.0,
            volume: 1.0,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// モデル成果物のパス
    pub model_path: String,
    /// 学習データのディレクトリ
    pub data_dir: String,
    /// CLI推論用のテスト画像ディレクトリ
    pub test_image_dir: String,
    /// トレーニング設定
    pub training: TrainingSettings,
    /// 読み上げ設定
    pub speech: SpeechSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: crate::DEFAULT_MODEL_PATH.to_string(),
            data_dir: "data/UTKFace".to_string(),
            test_image_dir: "data/dataToTest".to_string(),
            training: TrainingSettings::default(),
            speech: SpeechSettings::default(),
        }
    }
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む。存在しない場合はデフォルト設定を返す
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "警告: 設定ファイルの読み込みに失敗しました ({}): {}",
                        path.display(),
                        e
                    );
                    eprintln!("デフォルト設定を使用します");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定情報を表示する
    pub fn display(&self) {
        println!("=== アプリケーション設定 ===");
        println!("モデルパス: {}", self.model_path);
        println!("データディレクトリ: {}", self.data_dir);
        println!("テスト画像ディレクトリ: {}", self.test_image_dir);
        println!("--- トレーニング設定 ---");
        println!(
            "入力サイズ: {}x{}",
            self.training.image_size, self.training.image_size
        );
        println!("エポック数: {}", self.training.num_epochs);
        println!("バッチサイズ: {}", self.training.batch_size);
        println!("学習率: {}", self.training.learning_rate);
        println!("シード: {}", self.training.seed);
        println!("学習データ割合: {}", self.training.train_ratio);
        println!("バックボーン凍結: {}", self.training.freeze_backbone);
        if let Some(ref weights) = self.training.backbone_weights {
            println!("バックボーン重み: {}", weights);
        }
        println!("========================");
    }
}
