//! Bonus tasks and the two catalog selection policies.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A bonus task: a handicap or advantage applied to one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    /// Short unique name.
    pub name: String,
    /// Text shown to the player.
    pub description: String,
    /// Added to the round seconds (may be negative).
    #[serde(default)]
    pub seconds: i64,
    /// Added to the turn's points when the player succeeds.
    #[serde(default)]
    pub points: i64,
    /// Relative weight for the weighted policy.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Bonus {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        seconds: i64,
        points: i64,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            seconds,
            points,
            weight,
        }
    }

    /// Round seconds after applying this bonus, clamped to at least one.
    pub fn apply_seconds(&self, base: u32) -> u32 {
        let secs = i64::from(base) + self.seconds;
        secs.clamp(1, i64::from(u32::MAX)) as u32
    }
}

/// How a bonus is drawn from the remaining catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusPolicy {
    /// Shuffle the catalog and take the first entry.
    #[default]
    Uniform,
    /// Argmax of `u^(1/weight)` over a random sub-range of the catalog.
    Weighted,
}

/// Pick the index of a bonus from `catalog`, or `None` when it is empty.
pub fn pick<R: Rng + ?Sized>(policy: BonusPolicy, catalog: &[Bonus], rng: &mut R) -> Option<usize> {
    if catalog.is_empty() {
        return None;
    }
    match policy {
        BonusPolicy::Uniform => {
            let mut order: Vec<usize> = (0..catalog.len()).collect();
            order.shuffle(rng);
            order.first().copied()
        }
        BonusPolicy::Weighted => {
            let mn = rng.gen_range(0..catalog.len());
            let mx = rng.gen_range(mn + 1..=catalog.len());
            let mut best: Option<(usize, f64)> = None;
            for (i, bonus) in catalog.iter().enumerate().take(mx).skip(mn) {
                let score = if bonus.weight > 0.0 {
                    rng.gen_range(0.0..1.0f64).powf(1.0 / bonus.weight)
                } else {
                    0.0
                };
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> Vec<Bonus> {
        vec![
            Bonus::new("a", "", 10, 5, 1.0),
            Bonus::new("b", "", -5, 0, 1.0),
            Bonus::new("c", "", 0, 3, 50.0),
        ]
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick(BonusPolicy::Uniform, &[], &mut rng), None);
        assert_eq!(pick(BonusPolicy::Weighted, &[], &mut rng), None);
    }

    #[test]
    fn uniform_covers_every_entry() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = catalog();
        let mut seen = [false; 3];
        for _ in 0..200 {
            let i = pick(BonusPolicy::Uniform, &items, &mut rng).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn weighted_prefers_heavy_entries() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = catalog();
        let mut counts = [0usize; 3];
        for _ in 0..2000 {
            counts[pick(BonusPolicy::Weighted, &items, &mut rng).unwrap()] += 1;
        }
        assert!(counts[2] > counts[0]);
        assert!(counts[2] > counts[1]);
    }

    #[test]
    fn single_entry_is_always_picked() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = vec![Bonus::new("only", "", 0, 0, 1.0)];
        assert_eq!(pick(BonusPolicy::Weighted, &items, &mut rng), Some(0));
        assert_eq!(pick(BonusPolicy::Uniform, &items, &mut rng), Some(0));
    }

    #[test]
    fn seconds_are_clamped_to_one() {
        let shorter = Bonus::new("x", "", -100, 0, 1.0);
        assert_eq!(shorter.apply_seconds(30), 1);
        let longer = Bonus::new("y", "", 10, 0, 1.0);
        assert_eq!(longer.apply_seconds(30), 40);
    }
}
