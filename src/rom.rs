//! Range-of-motion aggregation.
//!
//! Each side's eight movement angles fold into four joint ROM values:
//!
//! - Wrist: flexion + extension
//! - Forearm: supination + pronation
//! - Elbow: average of flexion and extension
//! - Wrist deviation: radial + ulnar
//!
//! Unmeasured slots count as `0.0`. Readings are not clamped; a negative or
//! over-180 value from the device passes straight through.

use serde::{Deserialize, Serialize};

use crate::movement::{Joint, SLOTS_PER_SIDE};

/// The derived ROM values for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RomResult {
    /// Wrist flexion + extension
    pub wrist: f64,
    /// Forearm supination + pronation
    pub forearm: f64,
    /// Mean of elbow flexion and extension
    pub elbow: f64,
    /// Radial + ulnar deviation
    pub wrist_deviation: f64,
}

impl RomResult {
    /// The value for one joint.
    pub fn get(&self, joint: Joint) -> f64 {
        match joint {
            Joint::Wrist => self.wrist,
            Joint::Forearm => self.forearm,
            Joint::Elbow => self.elbow,
            Joint::WristDeviation => self.wrist_deviation,
        }
    }
}

/// Computes ROM from a side's slots. Pure; the same slots always give
/// bit-identical results.
pub fn compute(slots: &[Option<f64>; SLOTS_PER_SIDE]) -> RomResult {
    let s = |i: usize| slots[i].unwrap_or(0.0);
    RomResult {
        wrist: s(0) + s(1),
        forearm: s(2) + s(3),
        elbow: (s(4) + s(5)) / 2.0,
        wrist_deviation: s(6) + s(7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(values: [f64; SLOTS_PER_SIDE]) -> [Option<f64>; SLOTS_PER_SIDE] {
        values.map(Some)
    }

    #[test]
    fn formula() {
        let rom = compute(&full([30.0, 40.0, 10.0, 20.0, 60.0, 80.0, 5.0, 15.0]));
        assert_eq!(
            rom,
            RomResult {
                wrist: 70.0,
                forearm: 30.0,
                elbow: 70.0,
                wrist_deviation: 20.0,
            }
        );
    }

    #[test]
    fn unset_slots_are_zero() {
        let mut slots = [None; SLOTS_PER_SIDE];
        assert_eq!(compute(&slots), RomResult::default());

        slots[0] = Some(42.3);
        slots[5] = Some(9.0);
        let rom = compute(&slots);
        assert_eq!(rom.wrist, 42.3);
        assert_eq!(rom.elbow, 4.5);
        assert_eq!(rom.forearm, 0.0);
    }

    #[test]
    fn no_clamping() {
        let rom = compute(&full([-10.0, 200.0, 0.0, 0.0, -30.0, 0.0, 0.0, 0.0]));
        assert_eq!(rom.wrist, 190.0);
        assert_eq!(rom.elbow, -15.0);
    }

    #[test]
    fn idempotent() {
        let slots = full([0.1, 0.2, 1.0 / 3.0, 2.0 / 7.0, 33.3, 44.4, 1e-9, 7.77]);
        let a = compute(&slots);
        let b = compute(&slots);
        assert_eq!(a.wrist.to_bits(), b.wrist.to_bits());
        assert_eq!(a.forearm.to_bits(), b.forearm.to_bits());
        assert_eq!(a.elbow.to_bits(), b.elbow.to_bits());
        assert_eq!(a.wrist_deviation.to_bits(), b.wrist_deviation.to_bits());
    }

    #[test]
    fn get_by_joint() {
        let rom = compute(&full([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]));
        let values: Vec<f64> = Joint::ALL.iter().map(|&j| rom.get(j)).collect();
        assert_eq!(values, vec![3.0, 7.0, 5.5, 15.0]);
    }
}
