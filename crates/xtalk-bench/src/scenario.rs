//! Scenario kinds and the attack sweep.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of variants in every attack sweep.
pub const SWEEP_LENGTH: usize = 45;

/// The six experiment families, in canonical batch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Undisturbed baseline.
    NoAttack,
    /// Baseline with decoupling pulses on the data register.
    NoAttackWithDd,
    /// Attack sweep without mitigation.
    AttackNoMitigation,
    /// Attack sweep, data register decoupled.
    AttackWithDd,
    /// Attack sweep on the buffered layout.
    AttackWithSpacing,
    /// Attack sweep on the buffered layout with decoupling.
    AttackWithDdAndSpacing,
}

impl ScenarioKind {
    /// Every kind in canonical order.
    pub const ALL: [ScenarioKind; 6] = [
        ScenarioKind::NoAttack,
        ScenarioKind::NoAttackWithDd,
        ScenarioKind::AttackNoMitigation,
        ScenarioKind::AttackWithDd,
        ScenarioKind::AttackWithSpacing,
        ScenarioKind::AttackWithDdAndSpacing,
    ];

    /// Whether attacker pairs are driven.
    pub fn has_attack(self) -> bool {
        !matches!(self, ScenarioKind::NoAttack | ScenarioKind::NoAttackWithDd)
    }

    /// Whether the data register carries decoupling pulses.
    pub fn uses_dd(self) -> bool {
        matches!(
            self,
            ScenarioKind::NoAttackWithDd
                | ScenarioKind::AttackWithDd
                | ScenarioKind::AttackWithDdAndSpacing
        )
    }

    /// Whether the buffered layout is used.
    pub fn uses_buffer(self) -> bool {
        matches!(
            self,
            ScenarioKind::AttackWithSpacing | ScenarioKind::AttackWithDdAndSpacing
        )
    }

    /// Number of circuits this kind contributes.
    pub fn sweep_len(self) -> usize {
        if self.has_attack() { SWEEP_LENGTH } else { 1 }
    }

    /// Sweep values for this kind (`None` once for non-attack kinds).
    pub fn sweep(self) -> Vec<Option<SweepParameter>> {
        if self.has_attack() {
            SweepParameter::all().map(Some).collect()
        } else {
            vec![None]
        }
    }

    /// Stable identifier, as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::NoAttack => "no_attack",
            ScenarioKind::NoAttackWithDd => "no_attack_with_dd",
            ScenarioKind::AttackNoMitigation => "attack_no_mitigation",
            ScenarioKind::AttackWithDd => "attack_with_dd",
            ScenarioKind::AttackWithSpacing => "attack_with_spacing",
            ScenarioKind::AttackWithDdAndSpacing => "attack_with_dd_and_spacing",
        }
    }

    /// Human-readable description used in prompts.
    pub fn description(self) -> &'static str {
        match self {
            ScenarioKind::NoAttack => "no attack",
            ScenarioKind::NoAttackWithDd => "no attack, with dynamical decoupling",
            ScenarioKind::AttackNoMitigation => "attack without mitigation",
            ScenarioKind::AttackWithDd => "attack with dynamical decoupling",
            ScenarioKind::AttackWithSpacing => "attack with buffer spacing",
            ScenarioKind::AttackWithDdAndSpacing => {
                "attack with dynamical decoupling and buffer spacing"
            }
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ScenarioKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = ScenarioKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown scenario '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Position in the attack sweep.
///
/// Sweep index `i` applies `i` attack rounds inside the idle window. Each
/// round is a CX from every attacker to its partner followed by a gap whose
/// length depends on `i` (see [`SweepParameter::gap_us`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SweepParameter(u8);

impl SweepParameter {
    /// Create a sweep parameter, `None` if out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < SWEEP_LENGTH).then(|| Self(index as u8))
    }

    /// All sweep values in order.
    pub fn all() -> impl Iterator<Item = SweepParameter> {
        (0..SWEEP_LENGTH as u8).map(SweepParameter)
    }

    /// Sweep index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Attack rounds applied.
    pub fn rounds(self) -> usize {
        self.index()
    }

    /// Gap after each CX, in microseconds.
    pub fn gap_us(self) -> f64 {
        match self.0 {
            0..=4 => 4.0,
            5..=9 => 2.0,
            10..=14 => 1.0,
            15..=19 => 0.5,
            20..=24 => 0.75,
            25..=29 => 0.5,
            30..=34 => 0.05,
            _ => 0.025,
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SweepParameter> for u8 {
    fn from(p: SweepParameter) -> Self {
        p.0
    }
}

impl TryFrom<u8> for SweepParameter {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SweepParameter::new(value as usize)
            .ok_or_else(|| format!("sweep index {value} out of range 0..{SWEEP_LENGTH}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        use ScenarioKind::*;
        assert!(!NoAttack.has_attack() && !NoAttack.uses_dd() && !NoAttack.uses_buffer());
        assert!(!NoAttackWithDd.has_attack() && NoAttackWithDd.uses_dd());
        assert!(AttackNoMitigation.has_attack() && !AttackNoMitigation.uses_dd());
        assert!(AttackWithDd.uses_dd() && !AttackWithDd.uses_buffer());
        assert!(AttackWithSpacing.uses_buffer() && !AttackWithSpacing.uses_dd());
        assert!(AttackWithDdAndSpacing.uses_buffer() && AttackWithDdAndSpacing.uses_dd());
    }

    #[test]
    fn test_total_sweep_length() {
        let total: usize = ScenarioKind::ALL.iter().map(|k| k.sweep_len()).sum();
        assert_eq!(total, 182);
    }

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut sorted = ScenarioKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ScenarioKind::ALL);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("attack-with-dd".parse::<ScenarioKind>(), Ok(ScenarioKind::AttackWithDd));
        assert_eq!(" NO_ATTACK ".parse::<ScenarioKind>(), Ok(ScenarioKind::NoAttack));
        assert!("attack".parse::<ScenarioKind>().is_err());
        for kind in ScenarioKind::ALL {
            assert_eq!(kind.to_string().parse::<ScenarioKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_sweep_parameter() {
        assert!(SweepParameter::new(44).is_some());
        assert!(SweepParameter::new(45).is_none());
        assert_eq!(SweepParameter::all().count(), SWEEP_LENGTH);
        let gaps: Vec<f64> = [0, 5, 10, 15, 20, 25, 30, 35, 44]
            .into_iter()
            .map(|i| SweepParameter::new(i).unwrap().gap_us())
            .collect();
        assert_eq!(gaps, vec![4.0, 2.0, 1.0, 0.5, 0.75, 0.5, 0.05, 0.025, 0.025]);
    }

    #[test]
    fn test_sweep_for_kind() {
        assert_eq!(ScenarioKind::NoAttack.sweep(), vec![None]);
        let sweep = ScenarioKind::AttackWithDd.sweep();
        assert_eq!(sweep.len(), 45);
        assert_eq!(sweep[7].map(SweepParameter::index), Some(7));
    }
}
