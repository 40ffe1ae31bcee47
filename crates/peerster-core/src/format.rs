use crate::model::ReputationScore;

pub const REPUTATION_PRECISION: u32 = 3;

/// Score truncated (not rounded) to three decimals; `-` when unknown.
pub fn display_score(score: Option<ReputationScore>) -> String {
    let Some(score) = score else {
        return "-".to_string();
    };
    let scale = 10f32.powi(REPUTATION_PRECISION as i32);
    let truncated = (score.value() * scale).trunc() / scale;
    let truncated = if truncated == 0.0 { 0.0 } else { truncated };
    format!("{truncated:.prec$}", prec = REPUTATION_PRECISION as usize)
}

/// Red-to-green tint: fully red at or below 0.5, green ramps in from 0 to 0.5.
pub fn score_tint(score: ReputationScore) -> (u8, u8, u8) {
    let value = score.value();
    let red = remap(-value, -1.0, -0.5, 0.0, 255.0);
    let green = remap(value, 0.0, 0.5, 0.0, 255.0);
    (red.round() as u8, green.round() as u8, 0)
}

fn remap(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let clamped = value.clamp(in_min, in_max);
    (clamped - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}
