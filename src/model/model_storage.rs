//! モデル成果物の永続化
//!
//! モデルの重みとメタデータを1つのtar.gzに統合して保存・読み込みします。
//! 保存は常に上書きで、スキーマ移行はありません。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json - メタデータ（クラス順、入力サイズ、学習条件）
//! - model.bin     - モデルの重み（レコードのバイナリ）

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};

use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const MODEL_ENTRY: &str = "model.bin";

/// メタデータと共にモデルをtar.gz形式で保存する
pub fn save_model_with_metadata(
    output_path: &Path,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("出力ディレクトリを作成できません: {}", parent.display()))?;
        }
    }

    let file = File::create(output_path)
        .with_context(|| format!("成果物ファイルを作成できません: {}", output_path.display()))?;

    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    let json = metadata.to_json_string()?;
    append_entry(&mut builder, METADATA_ENTRY, json.as_bytes())?;
    append_entry(&mut builder, MODEL_ENTRY, model_binary)?;

    builder.finish().context("tar.gzの書き込みに失敗しました")?;
    Ok(())
}

fn append_entry<W: std::io::Write>(
    builder: &mut Builder<W>,
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, bytes)
        .with_context(|| format!("tarへの追加に失敗しました: {name}"))
}

/// tar.gzからメタデータのみを読み込む
pub fn load_metadata(tar_gz_path: &Path) -> Result<ModelMetadata> {
    let (metadata, _) = load_model_with_metadata(tar_gz_path)?;
    Ok(metadata)
}

/// tar.gzからモデルバイナリのみを読み込む
pub fn load_model_binary(tar_gz_path: &Path) -> Result<Vec<u8>> {
    let (_, binary) = load_model_with_metadata(tar_gz_path)?;
    Ok(binary)
}

/// tar.gzからメタデータとモデルバイナリを1パスで読み込む
pub fn load_model_with_metadata(tar_gz_path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    let file = File::open(tar_gz_path)
        .with_context(|| format!("成果物ファイルを開けません: {}", tar_gz_path.display()))?;

    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    let mut metadata: Option<ModelMetadata> = None;
    let mut model_binary: Option<Vec<u8>> = None;

    for entry in archive.entries().context("tar.gzを展開できません")? {
        let mut entry = entry?;
        let path = entry.path()?;

        match path.to_str() {
            Some(METADATA_ENTRY) => {
                let mut json = String::new();
                entry.read_to_string(&mut json)?;
                metadata = Some(ModelMetadata::from_json_string(&json)?);
            }
            Some(MODEL_ENTRY) => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                model_binary = Some(buffer);
            }
            _ => {}
        }
    }

    match (metadata, model_binary) {
        (Some(metadata), Some(binary)) => Ok((metadata, binary)),
        (None, _) => bail!("成果物に{}がありません", METADATA_ENTRY),
        (_, None) => bail!("成果物に{}がありません", MODEL_ENTRY),
    }
}

/// メタデータをコンソールに表示する
pub fn print_metadata_info(metadata: &ModelMetadata) {
    println!("=== モデルメタデータ ===");
    println!("クラスラベル: {}", metadata.class_labels.join(", "));
    println!(
        "入力サイズ: {}x{}",
        metadata.image_size, metadata.image_size
    );
    println!(
        "学習条件: エポック {}, バッチ {}, 学習率 {}",
        metadata.num_epochs, metadata.batch_size, metadata.learning_rate
    );
    println!(
        "サンプル数: 学習 {}, 検証 {}",
        metadata.train_samples, metadata.val_samples
    );
    println!("学習日時: {}", metadata.trained_at);
    println!("========================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gc_storage_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_metadata() -> ModelMetadata {
        ModelMetadata::new(
            vec!["male".to_string(), "female".to_string()],
            96,
            10,
            32,
            1e-4,
            160,
            40,
        )
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("gender_model.tar.gz");
        let metadata = sample_metadata();
        let binary = vec![1u8, 2, 3, 4, 5];

        save_model_with_metadata(&path, &metadata, &binary).unwrap();

        let (loaded_metadata, loaded_binary) = load_model_with_metadata(&path).unwrap();
        assert_eq!(loaded_metadata, metadata);
        assert_eq!(loaded_binary, binary);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_overwrites_previous_artifact() {
        let dir = temp_dir("overwrite");
        let path = dir.join("gender_model.tar.gz");
        let metadata = sample_metadata();

        save_model_with_metadata(&path, &metadata, &[1, 1, 1]).unwrap();
        save_model_with_metadata(&path, &metadata, &[9, 9]).unwrap();

        let binary = load_model_binary(&path).unwrap();
        assert_eq!(binary, vec![9, 9]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_metadata(Path::new("/no/such/model.tar.gz")).is_err());
    }

    #[test]
    fn test_load_metadata_for_display() {
        // 学習スクリプトの最後の表示経路（読み戻し → 表示）
        let dir = temp_dir("display");
        let path = dir.join("gender_model.tar.gz");
        save_model_with_metadata(&path, &sample_metadata(), &[0u8; 8]).unwrap();

        let metadata = load_metadata(&path).unwrap();
        assert_eq!(metadata.class_labels, vec!["male", "female"]);
        print_metadata_info(&metadata);

        std::fs::remove_dir_all(&dir).ok();
    }
}
