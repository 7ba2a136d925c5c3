//! モデルメタデータの定義
//!
//! tar.gz成果物の`metadata.json`として保存される情報です。
//! 推論側はここから入力サイズとクラス順を復元します。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// クラスラベル（インデックス順。例: ["male", "female"]）
    pub class_labels: Vec<String>,

    /// モデル入力の画像サイズ（正方形、ピクセル）
    pub image_size: u32,

    /// 学習エポック数
    pub num_epochs: u32,

    /// 学習時のバッチサイズ
    pub batch_size: u32,

    /// 学習率
    pub learning_rate: f64,

    /// 学習サンプル数
    pub train_samples: u32,

    /// 検証サンプル数
    pub val_samples: u32,

    /// モデルの学習時刻（ISO8601形式）
    pub trained_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成（学習時刻は現在時刻）
    pub fn new(
        class_labels: Vec<String>,
        image_size: u32,
        num_epochs: u32,
        batch_size: u32,
        learning_rate: f64,
        train_samples: u32,
        val_samples: u32,
    ) -> Self {
        Self {
            class_labels,
            image_size,
            num_epochs,
            batch_size,
            learning_rate,
            train_samples,
            val_samples,
            trained_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("メタデータのJSON変換に失敗しました")
    }

    /// JSON文字列からメタデータを復元
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("メタデータのJSON解析に失敗しました")
    }
}
