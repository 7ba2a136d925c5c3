//! 性別分類デスクトップアプリのエントリポイント

mod app;
mod ui;

use app::GenderClassifierApp;
use eframe::egui;
use gender_classifier_lib::model::AppConfig;
use gender_classifier_lib::speech::Speaker;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::load_or_default();

    // 音声エンジンの初期化失敗はそのままアプリのエラーとして終了する
    let speaker = Speaker::new(&config.speech)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([400.0, 550.0])
            .with_min_inner_size([320.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gender Classifier (M/F)",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(GenderClassifierApp::new(config, speaker)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUIの起動に失敗しました: {e}"))
}
