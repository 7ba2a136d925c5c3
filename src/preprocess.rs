//! 画像の前処理
//!
//! 画像の読み込み・リサイズ・正規化と、モデル入力テンソルへの変換を
//! 提供します。副作用のない純粋な変換のみです。

use std::path::Path;

use anyhow::{Context, Result};
use burn::tensor::{backend::Backend, Tensor};
use image::{imageops::FilterType, DynamicImage};

/// 画像ファイルを読み込む
///
/// デコードできないファイルは読み込みエラーとして報告します
/// （テンソルは生成されません）。
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    image::open(path).with_context(|| format!("画像を読み込めません: {}", path.display()))
}

/// 画像をリサイズ・正規化してCHW順の平坦化データに変換する
///
/// - リサイズ: size x size（アスペクト比は保持しない。表示用の
///   プレビューとは別経路で、こちらは推論入力専用）
/// - 正規化: 255で割って [0, 1] へ
/// - 並び順: (C, H, W) の順で平坦化
pub fn image_to_normalized_chw(img: &DynamicImage, size: usize) -> Vec<f32> {
    let resized = img
        .resize_exact(size as u32, size as u32, FilterType::Triangle)
        .to_rgb8();

    let mut data = Vec::with_capacity(3 * size * size);
    for channel in 0..3 {
        for y in 0..size as u32 {
            for x in 0..size as u32 {
                let pixel = resized.get_pixel(x, y);
                data.push(pixel[channel] as f32 / 255.0);
            }
        }
    }

    data
}

/// 正規化済みデータをバッチサイズ1のテンソル [1, 3, size, size] に変換する
pub fn to_batch_tensor<B: Backend>(
    data: &[f32],
    size: usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    Tensor::<B, 1>::from_floats(data, device).reshape([1, 3, size, size])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_normalized_chw_shape_and_range() {
        // 入力サイズによらず常に 3 * 96 * 96 要素、全て [0, 1]
        let img = solid_image(130, 70, [200, 10, 90]);
        let data = image_to_normalized_chw(&img, 96);

        assert_eq!(data.len(), 3 * 96 * 96);
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalization_divides_by_255() {
        let img = solid_image(96, 96, [255, 0, 128]);
        let data = image_to_normalized_chw(&img, 96);

        let plane = 96 * 96;
        assert!((data[0] - 1.0).abs() < 1e-6);
        assert!(data[plane].abs() < 1e-6);
        assert!((data[2 * plane] - 128.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_batch_tensor_shape() {
        let img = solid_image(64, 64, [128, 128, 128]);
        let data = image_to_normalized_chw(&img, 96);

        let device = Default::default();
        let tensor = to_batch_tensor::<NdArray>(&data, 96, &device);
        assert_eq!(tensor.dims(), [1, 3, 96, 96]);
    }

    #[test]
    fn test_unreadable_path_is_error() {
        let result = load_image("/definitely/not/here.jpg");
        assert!(result.is_err());
    }

    #[test]
    fn test_undecodable_file_is_error() {
        let dir = std::env::temp_dir().join(format!("gc_preprocess_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        assert!(load_image(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
