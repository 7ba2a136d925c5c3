//! 学習データの幾何学的オーグメンテーション
//!
//! 小角度の回転・ズーム・平行移動・水平反転を1つの逆アフィン変換に
//! まとめ、バイリニア補間で適用します。学習バッチにのみ、バッチ生成時に
//! オンザフライで適用されます（検証データには適用しません）。

use rand::Rng;

/// オーグメンテーションのパラメータ範囲
#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// 回転角の上限（度、±）
    pub rotation_deg: f32,
    /// ズーム率の振れ幅（0.1 = ±10%）
    pub zoom_range: f32,
    /// 平行移動の振れ幅（辺の長さに対する比率、±）
    pub shift_range: f32,
    /// 水平反転を行うか（確率50%）
    pub horizontal_flip: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            rotation_deg: 10.0,
            zoom_range: 0.1,
            shift_range: 0.1,
            horizontal_flip: true,
        }
    }
}

/// 1サンプル分のランダム変換パラメータ
#[derive(Debug, Clone)]
pub struct AugmentParams {
    pub angle_rad: f32,
    pub zoom: f32,
    pub shift_x: f32,
    pub shift_y: f32,
    pub flip: bool,
}

impl AugmentParams {
    /// 恒等変換（テストの基準用）
    pub fn identity() -> Self {
        Self {
            angle_rad: 0.0,
            zoom: 1.0,
            shift_x: 0.0,
            shift_y: 0.0,
            flip: false,
        }
    }
}

impl AugmentConfig {
    /// ランダムな変換パラメータを1つ生成する
    pub fn sample<R: Rng>(&self, rng: &mut R) -> AugmentParams {
        AugmentParams {
            angle_rad: rng
                .gen_range(-self.rotation_deg..=self.rotation_deg)
                .to_radians(),
            zoom: 1.0 + rng.gen_range(-self.zoom_range..=self.zoom_range),
            shift_x: rng.gen_range(-self.shift_range..=self.shift_range),
            shift_y: rng.gen_range(-self.shift_range..=self.shift_range),
            flip: self.horizontal_flip && rng.gen_bool(0.5),
        }
    }
}

/// CHW順の正規化済み画像にアフィン変換を適用する
///
/// 出力画素ごとに入力側の座標を逆算し、バイリニア補間でサンプリング
/// します。画像範囲外は最近傍の縁の画素で埋めます。
pub fn apply(pixels: &[f32], size: usize, params: &AugmentParams) -> Vec<f32> {
    debug_assert_eq!(pixels.len(), 3 * size * size);

    let n = size as f32;
    let center = (n - 1.0) / 2.0;
    let cos = params.angle_rad.cos();
    let sin = params.angle_rad.sin();
    let shift_x = params.shift_x * n;
    let shift_y = params.shift_y * n;

    let mut out = vec![0.0f32; pixels.len()];
    for y in 0..size {
        for x in 0..size {
            let dx = if params.flip {
                n - 1.0 - x as f32
            } else {
                x as f32
            };
            let dy = y as f32;

            // 平行移動を戻し、中心基準で回転・ズームの逆変換をかける
            let tx = dx - shift_x - center;
            let ty = dy - shift_y - center;
            let sx = (cos * tx + sin * ty) / params.zoom + center;
            let sy = (-sin * tx + cos * ty) / params.zoom + center;

            for c in 0..3 {
                out[c * size * size + y * size + x] = bilinear(pixels, size, c, sx, sy);
            }
        }
    }

    out
}

/// 1チャネル上のバイリニア補間（範囲外は縁にクランプ）
fn bilinear(pixels: &[f32], size: usize, channel: usize, x: f32, y: f32) -> f32 {
    let max = (size - 1) as f32;
    let x = x.clamp(0.0, max);
    let y = y.clamp(0.0, max);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(size - 1);
    let y1 = (y0 + 1).min(size - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |cx: usize, cy: usize| pixels[channel * size * size + cy * size + cx];
    let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
    let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient_image(size: usize) -> Vec<f32> {
        let mut pixels = Vec::with_capacity(3 * size * size);
        for c in 0..3 {
            for y in 0..size {
                for x in 0..size {
                    pixels.push((c + 1) as f32 * (x + y * size) as f32 / (3 * size * size) as f32);
                }
            }
        }
        pixels
    }

    #[test]
    fn test_identity_transform_is_noop() {
        let pixels = gradient_image(8);
        let out = apply(&pixels, 8, &AugmentParams::identity());

        for (a, b) in pixels.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_flip_reverses_rows() {
        let pixels = gradient_image(8);
        let mut params = AugmentParams::identity();
        params.flip = true;

        let out = apply(&pixels, 8, &params);
        // 行ごとに左右が反転している
        for c in 0..3 {
            for y in 0..8 {
                for x in 0..8 {
                    let original = pixels[c * 64 + y * 8 + (7 - x)];
                    let flipped = out[c * 64 + y * 8 + x];
                    assert!((original - flipped).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_output_stays_in_unit_range() {
        let pixels = gradient_image(16);
        let mut rng = StdRng::seed_from_u64(7);
        let config = AugmentConfig::default();

        for _ in 0..20 {
            let params = config.sample(&mut rng);
            let out = apply(&pixels, 16, &params);

            assert_eq!(out.len(), pixels.len());
            assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_seeded_sampling_is_deterministic() {
        let config = AugmentConfig::default();
        let params_a = config.sample(&mut StdRng::seed_from_u64(42));
        let params_b = config.sample(&mut StdRng::seed_from_u64(42));

        assert_eq!(params_a.angle_rad, params_b.angle_rad);
        assert_eq!(params_a.zoom, params_b.zoom);
        assert_eq!(params_a.shift_x, params_b.shift_x);
        assert_eq!(params_a.shift_y, params_b.shift_y);
        assert_eq!(params_a.flip, params_b.flip);
    }
}
