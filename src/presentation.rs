//! 推論結果の表示用フォーマット
//!
//! 2クラスの確率を小数点以下2桁のパーセント表示に整形し、
//! 画面表示用の行と読み上げ用の文を生成します。

use crate::ml::GenderPrediction;

/// 表示・読み上げ用に整形した推論結果
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionText {
    /// 男性の割合（%）
    pub male_pct: f32,
    /// 女性の割合（%）
    pub female_pct: f32,
    /// 画面表示用の行（男性）
    pub male_line: String,
    /// 画面表示用の行（女性）
    pub female_line: String,
    /// 読み上げ用の文
    pub speech_text: String,
}

/// 確率をパーセント表示に整形する
pub fn format_prediction(prediction: &GenderPrediction) -> PredictionText {
    let male_pct = prediction.male * 100.0;
    let female_pct = prediction.female * 100.0;

    PredictionText {
        male_pct,
        female_pct,
        male_line: format!("Male   : {male_pct:.2}%"),
        female_line: format!("Female : {female_pct:.2}%"),
        speech_text: format!(
            "Detected gender: male {male_pct:.2} percent, female {female_pct:.2} percent."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_decimal_percentages() {
        let text = format_prediction(&GenderPrediction {
            male: 0.972_34,
            female: 0.027_66,
        });

        assert_eq!(text.male_line, "Male   : 97.23%");
        assert_eq!(text.female_line, "Female : 2.77%");
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let text = format_prediction(&GenderPrediction {
            male: 0.4,
            female: 0.6,
        });

        assert!((text.male_pct + text.female_pct - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_speech_text_mentions_both_classes() {
        let text = format_prediction(&GenderPrediction {
            male: 0.5,
            female: 0.5,
        });

        assert!(text.speech_text.contains("male 50.00 percent"));
        assert!(text.speech_text.contains("female 50.00 percent"));
    }
}
