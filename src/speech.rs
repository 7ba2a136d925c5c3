//! 音声読み上げ
//!
//! 合成と再生が終わるまでブロックします。読み上げはUIスレッド上で
//! 同期実行されるため、読み上げ中は次の予測を開始できません。
//! エンジンの初期化失敗はそのままエラーとして呼び出し元へ伝播します。

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tts::Tts;

use crate::model::SpeechSettings;

/// ポーリング間隔（再生完了の監視用）
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 読み上げエンジン（レート・音量は初期化時に固定）
pub struct Speaker {
    tts: Tts,
    can_poll: bool,
}

impl Speaker {
    /// 音声エンジンを初期化する
    pub fn new(settings: &SpeechSettings) -> Result<Self> {
        let mut tts = Tts::default().context("音声エンジンの初期化に失敗しました")?;
        let features = tts.supported_features();

        if features.rate {
            let rate = (tts.normal_rate() * settings.rate_scale)
                .clamp(tts.min_rate(), tts.max_rate());
            tts.set_rate(rate).context("読み上げ速度を設定できません")?;
        }
        if features.volume {
            let volume = settings
                .volume
                .clamp(tts.min_volume(), tts.max_volume());
            tts.set_volume(volume).context("音量を設定できません")?;
        }

        Ok(Self {
            tts,
            can_poll: features.is_speaking,
        })
    }

    /// テキストを読み上げ、再生が終わるまでブロックする
    pub fn say_blocking(&mut self, text: &str) -> Result<()> {
        self.tts
            .speak(text, true)
            .context("読み上げの開始に失敗しました")?;

        // 再生完了をポーリングで待つ（エンジンが対応している場合のみ）
        if self.can_poll {
            while self.tts.is_speaking().unwrap_or(false) {
                thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(())
    }
}
