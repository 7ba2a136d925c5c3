//! 顔画像の性別分類アプリのコアライブラリ
//!
//! 前処理・推論・学習の各パイプラインと、モデル成果物（tar.gz）の
//! 永続化を提供します。GUI本体は `main.rs` 側にあります。

pub mod camera;
pub mod ml;
pub mod model;
pub mod preprocess;
pub mod presentation;
pub mod speech;

/// モデル入力の画像サイズ（正方形、ピクセル）
pub const IMAGE_SIZE: usize = 96;

/// 分類クラス数
pub const NUM_CLASSES: usize = 2;

/// クラス名（インデックス0 = 男性、1 = 女性）
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["male", "female"];

/// モデル成果物のデフォルトパス
pub const DEFAULT_MODEL_PATH: &str = "gender_model.tar.gz";
