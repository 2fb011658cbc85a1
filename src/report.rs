//! The "energy report" shown after a wish has been sent off.
//!
//! Every number here is decoration: only `name` and `wish` come from the store.

use serde::Serialize;
use uuid::Uuid;

use crate::store::WishRecord;

pub const REPORT_TTL: &str = "24h";
pub const REPORT_COORDS: &str = "猎户座旋臂·银河历2023.12.01";
const BASE_FREQUENCY: f32 = 432.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub name: String,
    pub wish: String,
    /// Percentage in [80, 100).
    pub intensity: u32,
    /// Hz around 432, formatted with two decimals.
    pub freq: String,
    pub ttl: &'static str,
    pub coords: &'static str,
    /// 1 through 5.
    pub energy_level: u32,
    pub resonance: &'static str,
}

impl Report {
    pub fn generate(record: WishRecord) -> Self {
        let mut rng = Prng::from_entropy();
        Self::generate_with(record, &mut rng)
    }

    pub fn generate_with(record: WishRecord, rng: &mut Prng) -> Self {
        let intensity = 80 + rng.below(20);
        let freq = BASE_FREQUENCY + rng.range_f32(-5.0, 5.0);
        let energy_level = 1 + rng.below(5);
        let resonance = if rng.next_f32_01() >= 0.5 { "高" } else { "中" };
        Report {
            name: record.name,
            wish: record.wish,
            intensity,
            freq: format!("{freq:.2}"),
            ttl: REPORT_TTL,
            coords: REPORT_COORDS,
            energy_level,
            resonance,
        }
    }
}

// xorshift64*. Not cryptographic; report values only need to look lively.
#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // a zero state would stay zero forever
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Prng { state: seed }
    }

    pub fn from_entropy() -> Self {
        let bits = Uuid::new_v4().as_u128();
        Prng::new((bits as u64) ^ ((bits >> 64) as u64))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform-ish in [0, 1).
    pub fn next_f32_01(&mut self) -> f32 {
        // 24 bits so the result never rounds up to 1.0
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32_01()
    }

    /// Integer in [0, n).
    pub fn below(&mut self, n: u32) -> u32 {
        ((self.next_u32() as u64 * n as u64) >> 32) as u32
    }
}
