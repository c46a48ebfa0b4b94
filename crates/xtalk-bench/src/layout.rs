//! Logical qubit roles and their physical placement.
//!
//! Both layouts start with the data register at logical qubits `0..3`.
//! The remaining qubits form one group per attack:
//!
//! | Layout | Group `i` | Logical qubits |
//! |--------|-----------|----------------|
//! | unbuffered | (attacker, partner) | `3+2i`, `4+2i` |
//! | buffered | (buffer, attacker, partner) | `3+3i`, `4+3i`, `5+3i` |
//!
//! The attacker drives its partner with CX gates. In the buffered layout an
//! idle buffer qubit sits between the data register and each attacker pair.

use serde::{Deserialize, Serialize};
use xtalk_ir::{IrError, Layout, QubitId};

use crate::config::{DATA_QUBITS, ExperimentConfig, buffered_width, unbuffered_width};
use crate::error::{ExperimentError, ExperimentResult};

/// Qubits involved in one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackGroup {
    /// Idle spacer, present in the buffered layout only.
    pub buffer: Option<QubitId>,
    /// Qubit applying the crosstalk-inducing drive.
    pub attacker: QubitId,
    /// Target of the attacker's CX gates.
    pub partner: QubitId,
}

/// Partition of one layout's logical qubits into roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QubitRoles {
    layout: Layout,
    data: [QubitId; DATA_QUBITS],
    attacks: Vec<AttackGroup>,
    buffered: bool,
}

impl QubitRoles {
    fn resolve(num_of_attacks: u32, physical: &[u32], buffered: bool) -> ExperimentResult<Self> {
        let (expected, stride) = if buffered {
            (buffered_width(num_of_attacks), 3)
        } else {
            (unbuffered_width(num_of_attacks), 2)
        };
        if physical.len() != expected {
            return Err(ExperimentError::LayoutInvariant(format!(
                "{} layout has {} qubits, expected {expected} for {num_of_attacks} attack(s)",
                if buffered { "buffered" } else { "unbuffered" },
                physical.len()
            )));
        }

        let layout = Layout::from_physical(physical.iter().copied()).map_err(|e| match e {
            IrError::DuplicatePhysicalQubit { physical } => ExperimentError::LayoutInvariant(
                format!(
                    "physical qubit {physical} appears twice in the {} layout",
                    if buffered { "buffered" } else { "unbuffered" }
                ),
            ),
            other => ExperimentError::Circuit(other),
        })?;

        let q = |i: usize| QubitId(i as u32);
        let attacks = (0..num_of_attacks as usize)
            .map(|i| {
                let base = DATA_QUBITS + stride * i;
                if buffered {
                    AttackGroup {
                        buffer: Some(q(base)),
                        attacker: q(base + 1),
                        partner: q(base + 2),
                    }
                } else {
                    AttackGroup {
                        buffer: None,
                        attacker: q(base),
                        partner: q(base + 1),
                    }
                }
            })
            .collect();

        Ok(Self {
            layout,
            data: [q(0), q(1), q(2)],
            attacks,
            buffered,
        })
    }

    /// Logical → physical assignment.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The data register.
    pub fn data(&self) -> &[QubitId] {
        &self.data
    }

    /// Attack groups in order.
    pub fn attacks(&self) -> &[AttackGroup] {
        &self.attacks
    }

    /// Buffer qubits (empty for the unbuffered layout).
    pub fn buffers(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.attacks.iter().filter_map(|a| a.buffer)
    }

    /// Whether this is the buffered layout.
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Total qubits in the layout.
    pub fn num_qubits(&self) -> usize {
        self.layout.len()
    }

    /// Physical qubit of a logical qubit.
    pub fn physical(&self, qubit: QubitId) -> Option<u32> {
        self.layout.get_physical(qubit)
    }
}

/// Both layouts of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLayouts {
    /// Layout for scenarios without spacing.
    pub unbuffered: QubitRoles,
    /// Layout for scenarios with spacing.
    pub buffered: QubitRoles,
}

impl ResolvedLayouts {
    /// Resolve role partitions from raw layout lists.
    pub fn resolve(
        num_of_attacks: u32,
        initial_layout: &[u32],
        initial_layout_with_buffer: &[u32],
    ) -> ExperimentResult<Self> {
        Ok(Self {
            unbuffered: QubitRoles::resolve(num_of_attacks, initial_layout, false)?,
            buffered: QubitRoles::resolve(num_of_attacks, initial_layout_with_buffer, true)?,
        })
    }

    /// Resolve both layouts of a validated configuration.
    pub fn from_config(config: &ExperimentConfig) -> ExperimentResult<Self> {
        Self::resolve(
            config.num_of_attacks(),
            config.initial_layout(),
            config.initial_layout_with_buffer(),
        )
    }

    /// Pick the layout for a scenario.
    pub fn select(&self, buffered: bool) -> &QubitRoles {
        if buffered {
            &self.buffered
        } else {
            &self.unbuffered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNBUFFERED: [u32; 9] = [4, 3, 5, 15, 22, 2, 1, 6, 7];
    const BUFFERED: [u32; 12] = [4, 3, 5, 22, 23, 24, 1, 0, 14, 7, 8, 9];

    #[test]
    fn test_resolved_widths() {
        let layouts = ResolvedLayouts::resolve(3, &UNBUFFERED, &BUFFERED).unwrap();
        assert_eq!(layouts.unbuffered.num_qubits(), 9);
        assert_eq!(layouts.buffered.num_qubits(), 12);
        assert!(layouts.buffered.is_buffered());
        assert!(!layouts.unbuffered.is_buffered());
    }

    #[test]
    fn test_unbuffered_roles() {
        let layouts = ResolvedLayouts::resolve(3, &UNBUFFERED, &BUFFERED).unwrap();
        let roles = &layouts.unbuffered;
        assert_eq!(roles.data(), &[QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(roles.attacks().len(), 3);
        let second = roles.attacks()[1];
        assert_eq!(second.attacker, QubitId(5));
        assert_eq!(second.partner, QubitId(6));
        assert_eq!(second.buffer, None);
        assert_eq!(roles.physical(second.attacker), Some(2));
        assert_eq!(roles.buffers().count(), 0);
    }

    #[test]
    fn test_buffered_roles() {
        let layouts = ResolvedLayouts::resolve(3, &UNBUFFERED, &BUFFERED).unwrap();
        let roles = &layouts.buffered;
        let first = roles.attacks()[0];
        assert_eq!(first.buffer, Some(QubitId(3)));
        assert_eq!(first.attacker, QubitId(4));
        assert_eq!(first.partner, QubitId(5));
        assert_eq!(roles.physical(QubitId(3)), Some(22));
        let buffers: Vec<_> = roles.buffers().collect();
        assert_eq!(buffers, vec![QubitId(3), QubitId(6), QubitId(9)]);
    }

    #[test]
    fn test_roles_cover_every_qubit_once() {
        let layouts = ResolvedLayouts::resolve(3, &UNBUFFERED, &BUFFERED).unwrap();
        for roles in [&layouts.unbuffered, &layouts.buffered] {
            let mut all: Vec<QubitId> = roles.data().to_vec();
            for a in roles.attacks() {
                all.extend(a.buffer);
                all.push(a.attacker);
                all.push(a.partner);
            }
            all.sort();
            let expected: Vec<_> = (0..roles.num_qubits() as u32).map(QubitId).collect();
            assert_eq!(all, expected);
        }
    }

    #[test]
    fn test_length_mismatch_is_layout_error() {
        let err = ResolvedLayouts::resolve(3, &UNBUFFERED[..8], &BUFFERED).unwrap_err();
        assert!(matches!(err, ExperimentError::LayoutInvariant(_)));
    }

    #[test]
    fn test_duplicate_physical_is_layout_error() {
        let mut dup = UNBUFFERED;
        dup[8] = 4;
        let err = ResolvedLayouts::resolve(3, &dup, &BUFFERED).unwrap_err();
        match err {
            ExperimentError::LayoutInvariant(msg) => assert!(msg.contains("physical qubit 4")),
            other => panic!("unexpected {other}"),
        }
    }
}
