// src/synthetic.rs

//! Synthetic Indian Ocean voyages, used purely as a statistical population
//! for the attribution baseline. No fuel target is produced.

use crate::core::{ExplainError, RawCase, Result};
use crate::schema::*;
use crate::traits::CaseSource;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

#[derive(Debug, Clone, Default)]
pub struct SyntheticVoyageSource {
    seed: Option<u64>,
}

impl SyntheticVoyageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to [`CaseSource::sample`] yields the same cases.
    pub fn seeded(seed: u64) -> Self {
        SyntheticVoyageSource { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn voyage(rng: &mut StdRng, power_noise: &Normal<f64>) -> RawCase {
        let ship_type = *SHIP_TYPES.choose(rng).unwrap_or(&"Bulker");

        let (dwt_range, speed_range, power_per_dwt) = match ship_type {
            "Container" => ((20_000.0, 150_000.0), (18.0, 24.0), 0.4),
            "Bulker" => ((30_000.0, 200_000.0), (12.0, 16.0), 0.15),
            _ => ((50_000.0, 300_000.0), (13.0, 17.0), 0.18),
        };
        let dwt: f64 = Uniform::new(dwt_range.0, dwt_range.1).sample(rng);
        let design_speed: f64 = Uniform::new(speed_range.0, speed_range.1).sample(rng);
        let engine_power_kw = dwt * power_per_dwt + power_noise.sample(rng);

        let distance_nm: f64 = rng.gen_range(500.0..5000.0);
        // Operational speed sits below design speed.
        let avg_speed: f64 = rng.gen_range(design_speed * 0.6..design_speed * 0.95);
        let draft_percentage: f64 = rng.gen_range(50.0..100.0);

        let month: u32 = rng.gen_range(1..=12);
        let season = match month {
            6..=9 => "Southwest Monsoon",
            10..=12 => "Northeast Monsoon",
            _ => "Inter-Monsoon",
        };
        let (wind_beaufort, wave_height_m, current_speed): (i64, f64, f64) = match season {
            "Southwest Monsoon" => (
                rng.gen_range(4..9),
                rng.gen_range(2.5..6.0),
                rng.gen_range(0.5..2.5),
            ),
            "Northeast Monsoon" => (
                rng.gen_range(3..7),
                rng.gen_range(1.5..4.0),
                rng.gen_range(0.5..1.5),
            ),
            _ => (
                rng.gen_range(1..4),
                rng.gen_range(0.5..2.0),
                rng.gen_range(0.1..1.0),
            ),
        };
        let current_direction = *CURRENT_DIRECTIONS.choose(rng).unwrap_or(&"Beam");

        RawCase::new()
            .with(SHIP_TYPE, ship_type)
            .with(DWT, dwt.trunc())
            .with(ENGINE_POWER_KW, engine_power_kw.trunc())
            .with(DESIGN_SPEED, round_to(design_speed, 1))
            .with(AVG_SPEED_KNOTS, round_to(avg_speed, 1))
            .with(DISTANCE_NM, distance_nm.trunc())
            .with(DRAFT_PERCENTAGE, round_to(draft_percentage, 1))
            .with(WIND_BEAUFORT, wind_beaufort)
            .with(WAVE_HEIGHT_M, round_to(wave_height_m, 2))
            .with(CURRENT_SPEED_KNOTS, round_to(current_speed, 2))
            .with(CURRENT_DIRECTION, current_direction)
            .with(SEASON, season)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

impl CaseSource for SyntheticVoyageSource {
    fn sample(&self, n: usize) -> Result<Vec<RawCase>> {
        let power_noise = Normal::new(0.0, 500.0).map_err(|e| ExplainError::Initialization {
            reason: format!("invalid engine power noise: {}", e),
        })?;
        let mut rng = self.rng();
        Ok((0..n).map(|_| Self::voyage(&mut rng, &power_noise)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_cover_the_full_schema() {
        let cases = SyntheticVoyageSource::seeded(1).sample(25).unwrap();
        assert_eq!(cases.len(), 25);
        for case in &cases {
            for name in NUMERIC_FEATURES.iter().chain(CATEGORICAL_FEATURES) {
                assert!(case.contains(name), "missing {name}");
            }
            assert!(!case.contains("Fuel_Consumption_Tons"));
        }
    }

    #[test]
    fn operational_speed_stays_below_design_speed() {
        for case in SyntheticVoyageSource::seeded(9).sample(50).unwrap() {
            let design = case.get(DESIGN_SPEED).and_then(|v| v.as_number()).unwrap();
            let avg = case.get(AVG_SPEED_KNOTS).and_then(|v| v.as_number()).unwrap();
            assert!(avg <= design + 0.1);
        }
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let source = SyntheticVoyageSource::seeded(5);
        assert_eq!(source.sample(10).unwrap(), source.sample(10).unwrap());
    }

    #[test]
    fn monsoon_seas_are_rougher() {
        for case in SyntheticVoyageSource::seeded(3).sample(200).unwrap() {
            let waves = case.get(WAVE_HEIGHT_M).and_then(|v| v.as_number()).unwrap();
            match case.get(SEASON).map(|v| v.to_string()).as_deref() {
                Some("Southwest Monsoon") => assert!(waves >= 2.5),
                Some("Inter-Monsoon") => assert!(waves <= 2.0),
                _ => {}
            }
        }
    }
}
