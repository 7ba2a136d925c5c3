//! 学習データセットの読み込みと層化分割
//!
//! フラットなディレクトリを走査し、ファイル名の2番目のアンダースコア
//! 区切りトークンをラベルとして解釈します（例: `10045_0_xxx.jpg` →
//! ラベル0 = 男性）。不正なファイルは理由付きで除外し、読み込み自体は
//! 中断しません。有効サンプルが0件の場合のみエラーになります。

use std::path::Path;

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::preprocess;
use crate::NUM_CLASSES;

/// 読み込み時に除外されたファイルとその理由
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// データセットアイテム（正規化済みピクセルとラベル）
#[derive(Debug, Clone)]
pub struct FaceItem {
    /// CHW順の正規化済みピクセル（3 * size * size 要素、[0, 1]）
    pub pixels: Vec<f32>,
    /// ラベル（0 = 男性、1 = 女性）
    pub label: usize,
}

/// 顔画像データセット
pub struct FaceDataset {
    samples: Vec<FaceItem>,
    image_size: usize,
    skipped: Vec<SkippedFile>,
}

/// ファイル名からラベルを解釈する（2番目のアンダースコア区切りトークン）
fn parse_label(file_name: &str) -> Result<usize, String> {
    let token = file_name
        .split('_')
        .nth(1)
        .ok_or_else(|| "ラベルトークンがありません".to_string())?;

    let label: i64 = token
        .parse()
        .map_err(|_| format!("ラベルを整数として解釈できません: {token}"))?;

    if (0..NUM_CLASSES as i64).contains(&label) {
        Ok(label as usize)
    } else {
        Err(format!("ラベルが0/1の範囲外です: {label}"))
    }
}

impl FaceDataset {
    /// ディレクトリから学習データを読み込む
    ///
    /// ディレクトリの列挙順のまま読み込みます（シャッフルは分割時）。
    /// ラベル不正・デコード不能なファイルは `skipped` に理由を残して
    /// スキップします。
    pub fn from_directory<P: AsRef<Path>>(dir: P, image_size: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut samples = Vec::new();
        let mut skipped = Vec::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("データディレクトリを開けません: {}", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();

            let label = match parse_label(&file_name) {
                Ok(label) => label,
                Err(reason) => {
                    skipped.push(SkippedFile { name: file_name, reason });
                    continue;
                }
            };

            let img = match preprocess::load_image(&path) {
                Ok(img) => img,
                Err(e) => {
                    skipped.push(SkippedFile {
                        name: file_name,
                        reason: format!("{e:#}"),
                    });
                    continue;
                }
            };

            samples.push(FaceItem {
                pixels: preprocess::image_to_normalized_chw(&img, image_size),
                label,
            });
        }

        if samples.is_empty() {
            bail!("有効な学習サンプルが1件もありません: {}", dir.display());
        }

        Ok(Self {
            samples,
            image_size,
            skipped,
        })
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// 除外されたファイルの一覧（任意の診断用）
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// クラスごとのサンプル数 [男性, 女性]
    pub fn label_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }

    /// 層化分割（ラベルごとに同じ比率で学習/検証へ振り分ける）
    ///
    /// 固定シードで再現可能です。両サブセットでクラス比率が保たれます。
    /// 学習側はクラス結合後に再シャッフルします。
    pub fn stratified_split(self, train_ratio: f32, seed: u64) -> (Self, Self) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut train_indices = Vec::new();
        let mut val_indices = Vec::new();

        for class in 0..NUM_CLASSES {
            let mut indices: Vec<usize> = self
                .samples
                .iter()
                .enumerate()
                .filter(|(_, s)| s.label == class)
                .map(|(i, _)| i)
                .collect();
            indices.shuffle(&mut rng);

            let train_len = (indices.len() as f32 * train_ratio).round() as usize;
            for (i, idx) in indices.into_iter().enumerate() {
                if i < train_len {
                    train_indices.push(idx);
                } else {
                    val_indices.push(idx);
                }
            }
        }

        train_indices.shuffle(&mut rng);

        let collect = |indices: &[usize]| -> Vec<FaceItem> {
            indices.iter().map(|&i| self.samples[i].clone()).collect()
        };

        let train = Self {
            samples: collect(&train_indices),
            image_size: self.image_size,
            skipped: Vec::new(),
        };
        let val = Self {
            samples: collect(&val_indices),
            image_size: self.image_size,
            skipped: Vec::new(),
        };

        (train, val)
    }
}

impl Dataset<FaceItem> for FaceDataset {
    fn get(&self, index: usize) -> Option<FaceItem> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn temp_data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gc_dataset_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_face(dir: &Path, file_name: &str, color: [u8; 3]) {
        let img = RgbImage::from_pixel(20, 20, Rgb(color));
        img.save(dir.join(file_name)).unwrap();
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("10045_0_1_20170117.jpg"), Ok(0));
        assert_eq!(parse_label("10045_1_1_20170117.jpg"), Ok(1));
        assert!(parse_label("noseparator.jpg").is_err());
        assert!(parse_label("10045_x_1.jpg").is_err());
        assert!(parse_label("10045_3_1.jpg").is_err());
    }

    #[test]
    fn test_load_keeps_only_valid_samples() {
        let dir = temp_data_dir("valid");
        write_face(&dir, "1_0_a.jpg", [10, 20, 30]);
        write_face(&dir, "2_1_b.jpg", [40, 50, 60]);
        write_face(&dir, "3_7_c.jpg", [70, 80, 90]); // ラベル範囲外
        std::fs::write(dir.join("4_0_d.jpg"), b"garbage").unwrap(); // デコード不能

        let dataset = FaceDataset::from_directory(&dir, 96).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped().len(), 2);
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert_eq!(item.pixels.len(), 3 * 96 * 96);
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_dataset_is_error() {
        let dir = temp_data_dir("empty");
        std::fs::write(dir.join("notes.txt"), b"no faces here").unwrap();

        assert!(FaceDataset::from_directory(&dir, 96).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stratified_split_preserves_class_balance() {
        let samples = (0..40)
            .map(|i| FaceItem {
                pixels: vec![0.5; 3 * 4 * 4],
                label: i % 2,
            })
            .collect();
        let dataset = FaceDataset {
            samples,
            image_size: 4,
            skipped: Vec::new(),
        };

        let (train, val) = dataset.stratified_split(0.8, 42);

        assert_eq!(train.len(), 32);
        assert_eq!(val.len(), 8);
        assert_eq!(train.label_counts(), [16, 16]);
        assert_eq!(val.label_counts(), [4, 4]);
    }

    #[test]
    fn test_stratified_split_is_reproducible() {
        let make = || FaceDataset {
            samples: (0..20)
                .map(|i| FaceItem {
                    pixels: vec![i as f32 / 20.0; 3],
                    label: i % 2,
                })
                .collect(),
            image_size: 1,
            skipped: Vec::new(),
        };

        let (train_a, _) = make().stratified_split(0.8, 42);
        let (train_b, _) = make().stratified_split(0.8, 42);

        let order = |ds: &FaceDataset| -> Vec<f32> {
            (0..ds.len()).map(|i| ds.get(i).unwrap().pixels[0]).collect()
        };
        assert_eq!(order(&train_a), order(&train_b));
    }
}
