//! Dice and randomness service.
//!
//! Every random decision in the engine goes through [`Randomness`], so a
//! session can run on a seeded generator or on a scripted sequence of faces.
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Multiplier applied to a two-dice total when rolling the starting fortune.
pub const FORTUNE_MULTIPLIER: i32 = 4;

/// Both faces of a two-dice throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoDice {
    pub first: u8,
    pub second: u8,
}

impl TwoDice {
    #[must_use]
    pub const fn total(self) -> u8 {
        self.first + self.second
    }

    #[must_use]
    pub const fn is_double(self) -> bool {
        self.first == self.second
    }
}

/// Source of random outcomes.
pub trait Randomness {
    /// One six-sided die, in `1..=6`.
    fn roll_die(&mut self) -> u8;

    /// True with the given probability.
    fn chance(&mut self, probability: f64) -> bool;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;

    /// Uniform integer in `low..=high`.
    fn roll_between(&mut self, low: i32, high: i32) -> i32;

    fn roll_two_dice(&mut self) -> TwoDice {
        let first = self.roll_die();
        let second = self.roll_die();
        TwoDice { first, second }
    }

    /// Starting fortune, in `8..=48`.
    fn roll_fortune(&mut self) -> i32 {
        i32::from(self.roll_two_dice().total()) * FORTUNE_MULTIPLIER
    }
}

/// Randomness backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct DiceRoller<R = ChaCha20Rng> {
    rng: R,
}

impl DiceRoller<ChaCha20Rng> {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> DiceRoller<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> Randomness for DiceRoller<R> {
    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    fn roll_between(&mut self, low: i32, high: i32) -> i32 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays queued outcomes in order.
///
/// Exhausted queues fall back to the lowest outcome: a die shows 1, a chance
/// fails, a pick returns 0 and a range returns its low bound.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u8>,
    chances: VecDeque<bool>,
    picks: VecDeque<usize>,
    ranges: VecDeque<i32>,
}

impl ScriptedDice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_faces(faces: &[u8]) -> Self {
        Self::new().faces(faces)
    }

    /// Queue two-dice totals, each split into a valid pair of faces.
    #[must_use]
    pub fn with_totals(totals: &[u8]) -> Self {
        Self::new().totals(totals)
    }

    #[must_use]
    pub fn faces(mut self, faces: &[u8]) -> Self {
        self.faces.extend(faces.iter().map(|f| (*f).clamp(1, 6)));
        self
    }

    #[must_use]
    pub fn totals(mut self, totals: &[u8]) -> Self {
        for &total in totals {
            let total = total.clamp(2, 12);
            let first = (total - 1).min(6);
            self.faces.push_back(first);
            self.faces.push_back(total - first);
        }
        self
    }

    #[must_use]
    pub fn chances(mut self, outcomes: &[bool]) -> Self {
        self.chances.extend(outcomes.iter().copied());
        self
    }

    #[must_use]
    pub fn picks(mut self, picks: &[usize]) -> Self {
        self.picks.extend(picks.iter().copied());
        self
    }

    #[must_use]
    pub fn ranges(mut self, values: &[i32]) -> Self {
        self.ranges.extend(values.iter().copied());
        self
    }

    /// Number of queued die faces not yet consumed.
    #[must_use]
    pub fn remaining_faces(&self) -> usize {
        self.faces.len()
    }
}

impl Randomness for ScriptedDice {
    fn roll_die(&mut self) -> u8 {
        self.faces.pop_front().unwrap_or(1)
    }

    fn chance(&mut self, _probability: f64) -> bool {
        self.chances.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks
            .pop_front()
            .map_or(0, |p| p.min(len.saturating_sub(1)))
    }

    fn roll_between(&mut self, low: i32, high: i32) -> i32 {
        self.ranges
            .pop_front()
            .map_or(low, |v| v.clamp(low, high.max(low)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rolls_stay_in_range() {
        let mut dice = DiceRoller::seeded(0xD7AC);
        for _ in 0..1_000 {
            let die = dice.roll_die();
            assert!((1..=6).contains(&die));
            let pair = dice.roll_two_dice();
            assert!((2..=12).contains(&pair.total()));
            let fortune = dice.roll_fortune();
            assert!((8..=48).contains(&fortune));
            assert_eq!(fortune % FORTUNE_MULTIPLIER, 0);
            let summon = dice.roll_between(5, 10);
            assert!((5..=10).contains(&summon));
            assert!(dice.pick(3) < 3);
        }
    }

    #[test]
    fn seeded_roller_is_deterministic() {
        let mut a = DiceRoller::seeded(42);
        let mut b = DiceRoller::seeded(42);
        let left: Vec<u8> = (0..32).map(|_| a.roll_die()).collect();
        let right: Vec<u8> = (0..32).map(|_| b.roll_die()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn chance_edges_never_consume_randomness() {
        let mut dice = DiceRoller::seeded(7);
        assert!(!dice.chance(0.0));
        assert!(dice.chance(1.0));
        assert!(!dice.chance(-0.5));
    }

    #[test]
    fn scripted_totals_split_into_faces() {
        let mut dice = ScriptedDice::with_totals(&[12, 7, 2]);
        assert_eq!(dice.roll_two_dice().total(), 12);
        let seven = dice.roll_two_dice();
        assert_eq!(seven.total(), 7);
        assert!((1..=6).contains(&seven.first) && (1..=6).contains(&seven.second));
        assert_eq!(dice.roll_two_dice().total(), 2);
        assert_eq!(dice.remaining_faces(), 0);
        assert_eq!(dice.roll_die(), 1);
    }

    #[test]
    fn scripted_queues_fall_back_to_lowest_outcome() {
        let mut dice = ScriptedDice::new()
            .chances(&[true])
            .picks(&[9])
            .ranges(&[50]);
        assert!(dice.chance(0.1));
        assert!(!dice.chance(0.9));
        assert_eq!(dice.pick(3), 2);
        assert_eq!(dice.pick(3), 0);
        assert_eq!(dice.roll_between(5, 10), 10);
        assert_eq!(dice.roll_between(5, 10), 5);
    }
}
