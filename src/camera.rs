//! Webカメラからの1枚キャプチャ
//!
//! 取得 → 撮影 → 解放を同期的に行います。タイムアウトはないため、
//! ドライバが応答しない場合は呼び出し元がブロックされます。

use anyhow::{Context, Result};
use image::DynamicImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

/// 既定のカメラ（インデックス0）から1フレーム撮影する
pub fn capture_frame() -> Result<DynamicImage> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera =
        Camera::new(CameraIndex::Index(0), requested).context("Webカメラにアクセスできません")?;

    camera
        .open_stream()
        .context("カメラストリームを開けません")?;
    let frame = camera.frame().context("フレームの取得に失敗しました");
    camera.stop_stream().ok();

    let buffer = frame?
        .decode_image::<RgbFormat>()
        .context("フレームのデコードに失敗しました")?;

    Ok(DynamicImage::ImageRgb8(buffer))
}
