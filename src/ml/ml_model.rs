//! 性別分類モデルの定義
//!
//! 凍結済みバックボーン（汎用の特徴抽出）と、新規に学習するヘッド
//! （グローバル平均プーリング + ドロップアウト + 全結合2層）の
//! 2段構成です。出力はsoftmaxで2クラスの確率になります。

use burn::{
    config::Config,
    module::{Ignored, Module},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};

/// バックボーンの出力チャネル数
const FEATURE_CHANNELS: usize = 256;

/// ヘッドの隠れ層の次元
const HIDDEN_DIM: usize = 128;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    #[config(default = 2)]
    pub num_classes: usize,
    /// ヘッドのドロップアウト率（推論時は0にする）
    #[config(default = 0.3)]
    pub dropout: f64,
    /// バックボーンを凍結するか（凍結時は勾配を流さない）
    #[config(default = true)]
    pub freeze_backbone: bool,
}

impl ModelConfig {
    /// モデルを初期化する
    pub fn init<B: Backend>(&self, device: &B::Device) -> GenderNet<B> {
        GenderNet {
            backbone: Backbone::init(device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc1: LinearConfig::new(FEATURE_CHANNELS, HIDDEN_DIM).init(device),
            fc2: LinearConfig::new(HIDDEN_DIM, self.num_classes).init(device),
            activation: Relu::new(),
            freeze_backbone: Ignored(self.freeze_backbone),
        }
    }
}

/// 特徴抽出バックボーン
///
/// {Conv 3x3 (same padding) + ReLU + MaxPool 2x2} x 4ブロック。
/// チャネル数は 3 -> 32 -> 64 -> 128 -> 256。
/// 96x96入力では空間サイズが 96 -> 48 -> 24 -> 12 -> 6 と縮小されます。
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    pool: MaxPool2d,
    activation: Relu,
}

impl<B: Backend> Backbone<B> {
    fn init(device: &B::Device) -> Self {
        let conv = |channels: [usize; 2]| {
            Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };

        Self {
            conv1: conv([3, 32]),
            conv2: conv([32, 64]),
            conv3: conv([64, 128]),
            conv4: conv([128, FEATURE_CHANNELS]),
            pool: MaxPool2dConfig::new([2, 2]).init(),
            activation: Relu::new(),
        }
    }

    /// 特徴マップを抽出する [batch, 3, s, s] -> [batch, 256, s/16, s/16]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv3.forward(x)));
        self.pool.forward(self.activation.forward(self.conv4.forward(x)))
    }
}

/// 性別分類モデル（バックボーン + ヘッド）
#[derive(Module, Debug)]
pub struct GenderNet<B: Backend> {
    backbone: Backbone<B>,

    // ヘッド（学習対象）
    pool: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc1: Linear<B>,
    fc2: Linear<B>,

    activation: Relu,
    freeze_backbone: Ignored<bool>,
}

impl<B: Backend> GenderNet<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(images);

        // 凍結時はバックボーンへ勾配を流さない
        let features = if self.freeze_backbone.0 {
            features.detach()
        } else {
            features
        };

        // グローバル平均プーリング [b, c, 1, 1] -> [b, c]
        let x = self.pool.forward(features);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.dropout.forward(x);
        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// 2クラスの確率を返す（softmax適用後、各行の合計は約1）
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// 順伝播と損失計算（学習用）
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }

    /// 事前学習済みバックボーンの重みで置き換える
    pub fn with_backbone_record(self, record: BackboneRecord<B>) -> Self {
        Self {
            backbone: self.backbone.load_record(record),
            ..self
        }
    }
}
