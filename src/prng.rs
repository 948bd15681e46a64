//! Deterministic pseudo-random primitives.
//!
//! Trend charts must redraw identically for the same filter combination, so
//! both the string hash and the generator are bit-exact contracts: changing a
//! constant here changes every synthetic chart.

use crate::format::round_half_up;
use crate::models::TrendPoint;

const HASH_MULTIPLIER: i32 = 9_654_435;
const LCG_MULTIPLIER: u64 = 48_271;
const LCG_MODULUS: u64 = 0x7fff_ffff;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rolling multiplicative hash: `h = (h ^ unit) * M + 1` with 32-bit
/// wraparound, folding in the first UTF-16 unit of every character.
pub fn hash32(key: &str) -> i32 {
    let mut buf = [0u16; 2];
    key.chars().fold(0i32, |h, c| {
        let unit = c.encode_utf16(&mut buf)[0] as i32;
        (h ^ unit).wrapping_mul(HASH_MULTIPLIER).wrapping_add(1)
    })
}

/// Lehmer generator (`seed * 48271 mod 2^31 - 1`) yielding floats in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed derived from a fingerprint string: the unsigned hash plus one.
    pub fn from_fingerprint(fingerprint: &str) -> Self {
        Self::new(hash32(fingerprint) as u32 as u64 + 1)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Inclusive integer draw.
    pub fn int_between(&mut self, low: i64, high: i64) -> i64 {
        let span = (high - low + 1) as f64;
        low + ((self.next_f64() * span).floor() as i64).min(high - low)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.int_between(0, items.len() as i64 - 1) as usize;
        items.get(index)
    }
}

/// Twelve-month series that drifts linearly from `base * (1 - span)` back to
/// `base`, with jitter bounded by `±15%` of `base * span`.
pub fn synthetic_trend(fingerprint: &str, base: f64, span: f64) -> Vec<TrendPoint> {
    let mut rng = SeededRng::from_fingerprint(fingerprint);
    let mut value = base * (1.0 - span);

    MONTHS
        .iter()
        .map(|month| {
            value += base * span / 11.0;
            value += (rng.next_f64() - 0.5) * base * span * 0.3;
            TrendPoint {
                period: (*month).to_string(),
                value: round_half_up(value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(points: &[TrendPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn hash_matches_pinned_values() {
        assert_eq!(hash32(""), 0);
        assert_eq!(hash32("a"), 936_480_196);
        assert_eq!(hash32("A|B|C|ytd"), 90_946_856);
        assert_eq!(hash32("Tech|All Functions|Total Hires|ytd"), -46_338_900);
        assert_eq!(
            hash32("All Units|All Functions|Avg. Cost Per Hire|last3Months"),
            -644_212_074
        );
    }

    #[test]
    fn hash_uses_first_utf16_unit_of_each_character() {
        assert_eq!(hash32("₹😀"), -1_672_904_588);
    }

    #[test]
    fn generator_reproduces_lehmer_sequence() {
        let mut rng = SeededRng::new(1);
        assert_eq!(rng.next_f64(), 48_271.0 / 2_147_483_647.0);
        assert!((rng.next_f64() - 0.085_032_449_143_488_18).abs() < 1e-15);
        assert!((rng.next_f64() - 0.601_352_605_317_417_9).abs() < 1e-15);
    }

    #[test]
    fn int_between_stays_inclusive() {
        let mut rng = SeededRng::new(7);
        for _ in 0..1_000 {
            let value = rng.int_between(3, 5);
            assert!((3..=5).contains(&value));
        }
    }

    #[test]
    fn synthetic_trend_matches_golden_sequence() {
        let trend = synthetic_trend("Tech|All Functions|Total Hires|ytd", 1500.0, 0.10);
        assert_eq!(
            values(&trend),
            vec![
                1359.0, 1355.0, 1371.0, 1401.0, 1411.0, 1412.0, 1417.0, 1422.0, 1426.0, 1421.0,
                1417.0, 1446.0
            ]
        );
        assert_eq!(trend[0].period, "Jan");
        assert_eq!(trend[11].period, "Dec");

        let cost = synthetic_trend(
            "All Units|All Functions|Avg. Cost Per Hire|last3Months",
            210_500.0,
            0.25,
        );
        assert_eq!(cost[0].value, 161_748.0);
        assert_eq!(cost[11].value, 251_664.0);
    }

    #[test]
    fn synthetic_trend_is_repeatable() {
        let first = synthetic_trend("Tech|Sales|Diversity %|last6Months", 38.0, 0.15);
        let second = synthetic_trend("Tech|Sales|Diversity %|last6Months", 38.0, 0.15);
        assert_eq!(first, second);
        assert_eq!(
            values(&first),
            vec![34.0, 34.0, 35.0, 35.0, 35.0, 36.0, 37.0, 38.0, 39.0, 39.0, 39.0, 39.0]
        );
    }

    #[test]
    fn distinct_fingerprints_produce_distinct_sequences() {
        let fingerprints = [
            "Tech|All Functions|Total Hires|ytd",
            "Tech|Sales|Total Hires|ytd",
            "FMCG|All Functions|Total Hires|ytd",
            "Tech|All Functions|Build Ratio|ytd",
            "Tech|All Functions|Total Hires|last6Months",
            "Tech|All Functions|Total Hires|last3Months",
        ];
        let series: Vec<Vec<f64>> = fingerprints
            .iter()
            .map(|f| values(&synthetic_trend(f, 1500.0, 0.10)))
            .collect();

        for (i, a) in series.iter().enumerate() {
            for b in series.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
