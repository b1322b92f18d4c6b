//! Waveform synthesis.
//!
//! Each shape is computed once as a canonical table of `sample_rate` samples
//! (one second at 1 Hz), then projected to the requested frequency by index:
//! output sample `i` reads table entry `(i * freq) % sample_rate`.

use alloc::vec::Vec;
use core::f64::consts::TAU;
use core::fmt;
use core::str::FromStr;
use core::time::Duration;

/// Periodic waveform shapes the synthesizer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Sine wave
    Sine,
    /// Square wave, high for the first half of each period
    Square,
    /// Triangle wave, rising then falling
    Triangle,
    /// Rising sawtooth
    SawtoothUp,
    /// Falling sawtooth
    SawtoothDown,
}

/// A tag or name that does not identify a [`Waveform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform")]
pub struct UnknownWaveform;

impl Waveform {
    /// Name accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::SawtoothUp => "sawtooth_up",
            Waveform::SawtoothDown => "sawtooth_down",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Waveform {
    type Error = UnknownWaveform;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Waveform::Sine),
            1 => Ok(Waveform::Square),
            2 => Ok(Waveform::Triangle),
            3 => Ok(Waveform::SawtoothUp),
            4 => Ok(Waveform::SawtoothDown),
            _ => Err(UnknownWaveform),
        }
    }
}

impl FromStr for Waveform {
    type Err = UnknownWaveform;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "triangle" => Ok(Waveform::Triangle),
            "sawtooth_up" => Ok(Waveform::SawtoothUp),
            "sawtooth_down" => Ok(Waveform::SawtoothDown),
            _ => Err(UnknownWaveform),
        }
    }
}

impl TryFrom<&str> for Waveform {
    type Error = UnknownWaveform;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        name.parse()
    }
}

/// Number of samples covering `duration` at `sample_rate`, rounded down
pub fn sample_count(sample_rate: u32, duration: Duration) -> usize {
    let count = u128::from(sample_rate) * duration.as_nanos() / 1_000_000_000;
    usize::try_from(count).unwrap_or(0)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn ramp(i: usize, half: usize, span: f64) -> f64 {
    -1.0 + span * i as f64 / half as f64
}

/// One second of `shape` at 1 Hz
fn table(shape: Waveform, sample_rate: usize) -> Vec<f64> {
    let half = sample_rate / 2;
    if half == 0 {
        return alloc::vec![0.0; sample_rate];
    }

    match shape {
        Waveform::Sine => (0..sample_rate)
            .map(|i| libm::sin(TAU * i as f64 / sample_rate as f64))
            .collect(),
        Waveform::Square => (0..sample_rate)
            .map(|i| if i < half { 1.0 } else { -1.0 })
            .collect(),
        Waveform::Triangle => {
            let mut out: Vec<f64> = (0..half).map(|i| ramp(i, half, 2.0)).collect();
            for k in half..sample_rate {
                out.push(out[(sample_rate - 1 - k).min(half - 1)]);
            }
            out
        }
        Waveform::SawtoothUp | Waveform::SawtoothDown => {
            let mut out: Vec<f64> = (0..half).map(|i| ramp(i, half, 1.0)).collect();
            for j in 0..sample_rate - half {
                out.push(-out[(half - 1).saturating_sub(j)]);
            }
            if shape == Waveform::SawtoothDown {
                out.reverse();
            }
            out
        }
    }
}

fn project(table: &[f64], out: &mut [f64], freq: u32) {
    let rate = table.len() as u64;
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = table[((i as u64 * u64::from(freq)) % rate) as usize];
    }
}

fn quantize(out: &mut [f64], scale: f64) {
    for sample in out {
        *sample = libm::trunc(*sample * scale) / scale;
    }
}

/// Fill `out` with `shape` at `freq` Hz, quantized to `depth` bits.
///
/// Does nothing when `depth` is outside `2..=32` or `sample_rate` is zero.
pub fn synthesize(shape: Waveform, out: &mut [f64], freq: u32, depth: u16, sample_rate: u32) {
    if !(2..=32).contains(&depth) || sample_rate == 0 || out.is_empty() {
        return;
    }

    let table = table(shape, sample_rate as usize);
    let scale = match shape {
        Waveform::Sine => {
            project(&table, out, freq);
            ((2_i64 << (depth - 1)) / 2 - 1) as f64
        }
        _ => {
            let period = (u64::from(sample_rate) / gcd(u64::from(sample_rate), u64::from(freq)))
                as usize;
            let head = period.min(out.len());
            project(&table, &mut out[..head], freq);
            if head < out.len() {
                let (first, rest) = out.split_at_mut(head);
                for tile in rest.chunks_mut(period) {
                    let n = tile.len();
                    tile.copy_from_slice(&first[..n]);
                }
            }
            ((2_i64 << (depth - 2)) - 1) as f64
        }
    };
    quantize(out, scale);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn autocorrelation(samples: &[f64], lag: usize) -> f64 {
        samples
            .iter()
            .zip(&samples[lag..])
            .map(|(a, b)| a * b)
            .sum()
    }

    #[test]
    fn test_sine_period() {
        let mut out = vec![0.0; 44_100];
        synthesize(Waveform::Sine, &mut out, 441, 16, 44_100);

        let window = &out[..4_410];
        let peak = (50..150)
            .max_by(|&a, &b| {
                autocorrelation(window, a)
                    .partial_cmp(&autocorrelation(window, b))
                    .unwrap()
            })
            .unwrap();
        assert!((99..=101).contains(&peak), "peak at lag {peak}");
    }

    #[test]
    fn test_sine_starts_at_zero() {
        let mut out = vec![0.0; 4];
        synthesize(Waveform::Sine, &mut out, 11_025, 16, 44_100);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], -1.0);
    }

    #[test]
    fn test_square_halves() {
        let mut out = vec![0.0; 100];
        synthesize(Waveform::Square, &mut out, 441, 16, 44_100);

        assert!(out[..50].iter().all(|&s| s == 1.0));
        assert!(out[50..].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn test_sawtooth_directions() {
        let mut up = vec![0.0; 100];
        let mut down = vec![0.0; 100];
        synthesize(Waveform::SawtoothUp, &mut up, 441, 16, 44_100);
        synthesize(Waveform::SawtoothDown, &mut down, 441, 16, 44_100);

        assert_eq!(up[0], -1.0);
        assert!(up.windows(2).all(|w| w[1] >= w[0]));
        assert!(down[1..].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_triangle_peaks_mid_period() {
        let mut out = vec![0.0; 100];
        synthesize(Waveform::Triangle, &mut out, 441, 16, 44_100);

        assert_eq!(out[0], -1.0);
        assert!(out[..50].windows(2).all(|w| w[1] >= w[0]));
        assert!(out[50..].windows(2).all(|w| w[1] <= w[0]));
        assert!(out[50] > 0.99);
    }

    #[test]
    fn test_tiling_matches_projection() {
        for shape in [
            Waveform::Square,
            Waveform::Triangle,
            Waveform::SawtoothUp,
            Waveform::SawtoothDown,
        ] {
            // 44100 / gcd(44100, 1234) = 22050, leaving a partial final tile
            let mut tiled = vec![0.0; 50_000];
            synthesize(shape, &mut tiled, 1_234, 16, 44_100);

            let mut direct = vec![0.0; 50_000];
            project(&table(shape, 44_100), &mut direct, 1_234);
            quantize(&mut direct, 32_767.0);

            assert_eq!(tiled, direct, "{shape}");
        }
    }

    #[test]
    fn test_zero_frequency_holds_first_sample() {
        let mut out = vec![0.5; 10];
        synthesize(Waveform::Square, &mut out, 0, 16, 44_100);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_scale_is_depth_dependent() {
        let mut out = vec![0.0; 3];
        synthesize(Waveform::Sine, &mut out, 5_000, 8, 44_100);

        for s in out {
            let code = s * 127.0;
            assert!(libm::fabs(code - libm::round(code)) < 1e-9);
        }
    }

    #[test]
    fn test_invalid_depth_is_ignored() {
        let mut out = vec![0.25; 8];
        synthesize(Waveform::Sine, &mut out, 440, 1, 44_100);
        synthesize(Waveform::Sine, &mut out, 440, 16, 0);
        assert!(out.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_waveform_names() {
        assert_eq!("sawtooth_up".parse(), Ok(Waveform::SawtoothUp));
        assert_eq!(Waveform::try_from("triangle"), Ok(Waveform::Triangle));
        assert_eq!(Waveform::try_from(4), Ok(Waveform::SawtoothDown));
        assert_eq!(Waveform::try_from("noise"), Err(UnknownWaveform));
        assert_eq!(Waveform::try_from(9), Err(UnknownWaveform));
        assert_eq!(Waveform::Sine.to_string(), "sine");
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(sample_count(44_100, Duration::from_secs(1)), 44_100);
        assert_eq!(sample_count(44_100, Duration::from_millis(500)), 22_050);
        assert_eq!(sample_count(48_000, Duration::from_micros(10)), 0);
    }
}
