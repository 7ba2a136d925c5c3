//! モデル学習スクリプト
//!
//! 使い方: `train_model [データディレクトリ] [出力パス]`
//! 引数を省略した場合は設定ファイル（config.json）の値を使用します。

use std::path::PathBuf;

use gender_classifier_lib::ml::train_model;
use gender_classifier_lib::model::{load_metadata, print_metadata_info, AppConfig};

fn main() -> anyhow::Result<()> {
    println!("=== 性別分類モデルの学習 ===\n");

    let config = AppConfig::load_or_default();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from(&config.data_dir)
    };
    let output_path = if args.len() > 2 {
        PathBuf::from(&args[2])
    } else {
        PathBuf::from(&config.model_path)
    };

    config.display();

    let report = train_model(&data_dir, &output_path, &config.training)?;

    println!(
        "\n[INFO] 学習完了: {} に保存しました (学習 {} / 検証 {})",
        report.artifact_path.display(),
        report.train_samples,
        report.val_samples
    );

    // 保存した成果物からメタデータを読み戻して表示する
    let metadata = load_metadata(&report.artifact_path)?;
    print_metadata_info(&metadata);

    Ok(())
}
