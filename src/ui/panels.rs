//! 画面パネルの描画と操作ハンドラ
//!
//! 「画像を選択」「カメラで撮影」の2操作と、プレビュー1枚 +
//! 整形済み結果1件の表示のみを持ちます。

use eframe::egui::{self, Color32, RichText, Ui};
use image::DynamicImage;

use gender_classifier_lib::ml::ModelState;
use gender_classifier_lib::{camera, preprocess, presentation};

use crate::app::AppState;

const PREVIEW_MAX_SIZE: f32 = 350.0;

const MALE_COLOR: Color32 = Color32::from_rgb(60, 120, 255);
const FEMALE_COLOR: Color32 = Color32::from_rgb(255, 80, 160);

// ---------------------------------------------------------------------------
// 中央パネル – プレビューと操作ボタン
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, ctx: &egui::Context, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(8.0);

        // ---- プレビュー（表示はアスペクト比を保持） ----
        match &state.preview {
            Some(texture) => {
                ui.add(
                    egui::Image::new(texture)
                        .max_size(egui::vec2(PREVIEW_MAX_SIZE, PREVIEW_MAX_SIZE)),
                );
            }
            None => {
                ui.add_space(PREVIEW_MAX_SIZE / 3.0);
                ui.label("No image selected");
                ui.add_space(PREVIEW_MAX_SIZE / 3.0);
            }
        }

        ui.add_space(12.0);

        // ---- 操作ボタン（1操作ずつ順番に処理） ----
        if ui.button("📁 Select image").clicked() {
            pick_image(ctx, state);
        }
        if ui.button("📷 Capture from camera").clicked() {
            capture_image(ctx, state);
        }
    });
}

// ---------------------------------------------------------------------------
// 下部パネル – 結果表示
// ---------------------------------------------------------------------------

pub fn result_panel(ui: &mut Ui, state: &AppState) {
    ui.add_space(6.0);

    if let ModelState::Unavailable(_) = state.model {
        ui.colored_label(
            Color32::RED,
            "Model not loaded — predictions are disabled.",
        );
    }

    if let Some(msg) = state.display.status_message() {
        ui.colored_label(Color32::RED, msg);
    }

    if let Some(result) = state.display.result() {
        ui.heading("Result");
        ui.label(RichText::new(format!("👨 {}", result.male_line)).color(MALE_COLOR));
        ui.label(RichText::new(format!("👩 {}", result.female_line)).color(FEMALE_COLOR));
    }

    ui.add_space(6.0);
}

// ---------------------------------------------------------------------------
// 操作ハンドラ
// ---------------------------------------------------------------------------

/// ファイルダイアログで画像を選び、プレビューと推論を行う
fn pick_image(ctx: &egui::Context, state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Choose an image")
        .add_filter("Images", &["png", "jpg", "jpeg"])
        .pick_file();

    if let Some(path) = file {
        match preprocess::load_image(&path) {
            Ok(img) => classify(ctx, state, img),
            Err(e) => {
                log::error!("画像を読み込めません: {e:#}");
                state.display.show_error(format!("Cannot read image: {e:#}"));
            }
        }
    }
}

/// Webカメラから1枚撮影し、プレビューと推論を行う
fn capture_image(ctx: &egui::Context, state: &mut AppState) {
    match camera::capture_frame() {
        Ok(img) => classify(ctx, state, img),
        Err(e) => {
            log::error!("カメラキャプチャに失敗しました: {e:#}");
            state.display.show_error(format!("Camera error: {e:#}"));
        }
    }
}

/// プレビュー更新 → 推論 → 結果整形・読み上げ
fn classify(ctx: &egui::Context, state: &mut AppState, img: DynamicImage) {
    show_preview(ctx, state, &img);
    state.display.clear();

    match state.model.predict_image(&img) {
        Ok(prediction) => {
            let text = presentation::format_prediction(&prediction);
            log::info!("推論結果: {} / {}", text.male_line, text.female_line);

            // 読み上げは同期実行。終わるまで次の操作は受け付けない
            if state.config.speech.enabled {
                if let Err(e) = state.speaker.say_blocking(&text.speech_text) {
                    log::error!("読み上げに失敗しました: {e:#}");
                }
            }

            state.display.show_result(text);
        }
        Err(e) => {
            log::error!("推論に失敗しました: {e:#}");
            state.display.show_error(format!("Prediction error: {e:#}"));
        }
    }
}

/// 画像をテクスチャに変換してプレビューへ反映する
fn show_preview(ctx: &egui::Context, state: &mut AppState, img: &DynamicImage) {
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

    state.preview = Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));
}
