//! スタンドアロン推論スクリプト
//!
//! 画像名を入力すると `data/dataToTest/<name>.jpg` を推論して
//! 2クラスのパーセントを表示します。失敗時は `[ERROR]` 行を出力します。

use std::io::{self, Write};
use std::path::PathBuf;

use gender_classifier_lib::ml::InferenceEngine;
use gender_classifier_lib::model::AppConfig;
use gender_classifier_lib::presentation;

fn main() {
    let config = AppConfig::load_or_default();

    print!("Image name: ");
    io::stdout().flush().ok();

    let mut name = String::new();
    if io::stdin().read_line(&mut name).is_err() {
        println!("[ERROR] 入力の読み取りに失敗しました");
        return;
    }
    let name = name.trim();
    if name.is_empty() {
        println!("[ERROR] 画像名が空です");
        return;
    }

    let image_path = PathBuf::from(&config.test_image_dir).join(format!("{name}.jpg"));

    // モデルはこのスクリプトでは呼び出しごとに読み込む
    let engine = match InferenceEngine::load(&config.model_path) {
        Ok(engine) => engine,
        Err(e) => {
            println!("[ERROR] モデルを読み込めません: {e:#}");
            return;
        }
    };

    match engine.predict_path(&image_path) {
        Ok(prediction) => {
            let text = presentation::format_prediction(&prediction);
            println!("{}", text.male_line);
            println!("{}", text.female_line);
        }
        Err(e) => println!("[ERROR] 推論に失敗しました: {e:#}"),
    }
}
