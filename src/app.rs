//! eframeアプリ本体
//!
//! 状態はすべて `AppState` に集約し、描画は `ui::panels` に委譲します。
//! ユーザー操作は1件ずつ順番に処理されます（UIスレッドのみ）。

use eframe::egui;

use gender_classifier_lib::ml::ModelState;
use gender_classifier_lib::model::AppConfig;
use gender_classifier_lib::presentation::PredictionText;
use gender_classifier_lib::speech::Speaker;

use crate::ui::panels;

/// GUI全体の状態
pub struct AppState {
    pub config: AppConfig,

    /// 明示的な読み込み済み/読み込み失敗のモデルハンドル
    pub model: ModelState,

    pub speaker: Speaker,

    /// プレビュー用テクスチャ（画像未選択時はNone）
    pub preview: Option<egui::TextureHandle>,

    /// 結果表示（結果とエラーのどちらか一方のみ）
    pub display: ResultDisplay,
}

/// 下部パネルの表示内容
///
/// 推論結果とエラーは同時に表示しません。エラーは直前の結果を
/// 置き換えます（別の画像の結果がエラーの横に残らないように）。
#[derive(Default)]
pub struct ResultDisplay {
    result: Option<PredictionText>,
    status_message: Option<String>,
}

impl ResultDisplay {
    /// 新しい操作の開始時に表示をリセットする
    pub fn clear(&mut self) {
        self.result = None;
        self.status_message = None;
    }

    /// 推論結果を表示する
    pub fn show_result(&mut self, text: PredictionText) {
        self.result = Some(text);
        self.status_message = None;
    }

    /// エラーを表示する（直前の結果は消す）
    pub fn show_error(&mut self, message: String) {
        self.result = None;
        self.status_message = Some(message);
    }

    pub fn result(&self) -> Option<&PredictionText> {
        self.result.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

pub struct GenderClassifierApp {
    pub state: AppState,
}

impl GenderClassifierApp {
    pub fn new(config: AppConfig, speaker: Speaker) -> Self {
        // モデルの読み込みは起動時に1回だけ試みる。失敗時は縮退状態で
        // 起動し、予測要求は明示的なエラーで短絡する
        let model = ModelState::load(&config.model_path);
        if let ModelState::Unavailable(reason) = &model {
            log::error!("モデルを読み込めませんでした: {reason}");
        }

        Self {
            state: AppState {
                config,
                model,
                speaker,
                preview: None,
                display: ResultDisplay::default(),
            },
        }
    }
}

impl eframe::App for GenderClassifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- 下部パネル: 結果表示 ----
        egui::TopBottomPanel::bottom("result_panel")
            .min_height(120.0)
            .show(ctx, |ui| {
                panels::result_panel(ui, &self.state);
            });

        // ---- 中央パネル: プレビューと操作ボタン ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::central_panel(ui, ctx, &mut self.state);
        });
    }
}
