//! Instruction timing and as-soon-as-possible scheduling.
//!
//! All durations are integers in units of the backend sample time `dt`.
//! Backends only accept delays whose length is a multiple of the pulse
//! alignment, so conversions from wall-clock time round onto that grid.

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::QubitId;

/// Gate and measurement durations of a target device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstructionDurations {
    /// Length of one sample in nanoseconds.
    pub dt_ns: f64,
    /// Duration of any single-qubit gate.
    pub single_qubit: u64,
    /// Duration of a two-qubit gate.
    pub two_qubit: u64,
    /// Duration of a measurement.
    pub measure: u64,
    /// Every delay must be a multiple of this many samples.
    pub pulse_alignment: u64,
}

impl Default for InstructionDurations {
    /// Representative values for a superconducting device with `dt = 2/9 ns`.
    fn default() -> Self {
        Self {
            dt_ns: 2.0 / 9.0,
            single_qubit: 160,
            two_qubit: 1600,
            measure: 4000,
            pulse_alignment: 8,
        }
    }
}

impl InstructionDurations {
    /// Duration of a single instruction.
    pub fn duration_of(&self, inst: &Instruction) -> u64 {
        match &inst.kind {
            InstructionKind::Gate(gate) if gate.is_virtual() => 0,
            InstructionKind::Gate(gate) if gate.num_qubits() == 1 => self.single_qubit,
            InstructionKind::Gate(_) => self.two_qubit,
            InstructionKind::Measure => self.measure,
            InstructionKind::Barrier => 0,
            InstructionKind::Delay { duration } => *duration,
        }
    }

    /// Round up to the next multiple of the pulse alignment.
    pub fn align_up(&self, duration: u64) -> u64 {
        let a = self.pulse_alignment.max(1);
        duration.div_ceil(a) * a
    }

    /// Round down to the previous multiple of the pulse alignment.
    pub fn align_down(&self, duration: u64) -> u64 {
        let a = self.pulse_alignment.max(1);
        duration / a * a
    }

    /// Convert microseconds to an aligned number of samples.
    pub fn us_to_dt(&self, micros: f64) -> u64 {
        let samples = (micros * 1_000.0 / self.dt_ns).round().max(0.0) as u64;
        self.align_up(samples)
    }

    /// Convert samples to microseconds.
    pub fn dt_to_us(&self, samples: u64) -> f64 {
        samples as f64 * self.dt_ns / 1_000.0
    }

    /// Schedule every instruction as soon as its qubits are free.
    ///
    /// Barriers take no time but synchronize their qubits to the latest
    /// of them.
    pub fn schedule(&self, circuit: &Circuit) -> Schedule {
        let n = circuit.num_qubits();
        let mut clock = vec![0u64; n];
        let mut busy = vec![0u64; n];
        let mut starts = Vec::with_capacity(circuit.len());

        for inst in circuit.instructions() {
            let start = inst
                .qubits
                .iter()
                .map(|q| clock[q.index()])
                .max()
                .unwrap_or(0);
            let duration = self.duration_of(inst);
            let end = start + duration;
            for q in &inst.qubits {
                clock[q.index()] = end;
                if inst.is_gate() || inst.is_measure() {
                    busy[q.index()] += duration;
                }
            }
            starts.push(start);
        }

        Schedule {
            starts,
            qubit_end: clock,
            busy,
        }
    }
}

/// Start times of a circuit's instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    starts: Vec<u64>,
    qubit_end: Vec<u64>,
    busy: Vec<u64>,
}

impl Schedule {
    /// Start time of the instruction at `index` in program order.
    pub fn start_of(&self, index: usize) -> Option<u64> {
        self.starts.get(index).copied()
    }

    /// Time at which `qubit` finishes its last operation.
    pub fn qubit_end(&self, qubit: QubitId) -> u64 {
        self.qubit_end.get(qubit.index()).copied().unwrap_or(0)
    }

    /// Time `qubit` spends executing gates or measurements.
    pub fn busy_time(&self, qubit: QubitId) -> u64 {
        self.busy.get(qubit.index()).copied().unwrap_or(0)
    }

    /// Total duration of the circuit.
    pub fn total(&self) -> u64 {
        self.qubit_end.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_us_to_dt() {
        let durations = InstructionDurations::default();
        // 4500 samples, rounded up onto the 8-sample grid
        assert_eq!(durations.us_to_dt(1.0), 4504);
        assert_eq!(durations.us_to_dt(4.0), 18000);
        assert_eq!(durations.us_to_dt(0.0), 0);
    }

    #[test]
    fn test_schedule_barrier_syncs() {
        let durations = InstructionDurations::default();
        let mut circuit = Circuit::with_size("sync", 2, 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.delay(QubitId(1), 800).unwrap();
        circuit.measure_all().unwrap();

        let schedule = durations.schedule(&circuit);
        // the delay on q1 starts after the X on q0
        assert_eq!(schedule.start_of(2), Some(160));
        assert_eq!(schedule.qubit_end(QubitId(1)), 160 + 800 + 4000);
        assert_eq!(schedule.qubit_end(QubitId(0)), 160 + 4000);
        assert_eq!(schedule.total(), 4960);
        assert_eq!(schedule.busy_time(QubitId(1)), 4000);
    }

    #[test]
    fn test_two_qubit_gate_waits_for_both() {
        let durations = InstructionDurations::default();
        let mut circuit = Circuit::with_size("cx", 2, 0);
        circuit.delay(QubitId(0), 400).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let schedule = durations.schedule(&circuit);
        assert_eq!(schedule.start_of(1), Some(400));
        assert_eq!(schedule.total(), 2000);
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = InstructionDurations::default().schedule(&Circuit::new("empty"));
        assert_eq!(schedule.total(), 0);
    }

    proptest! {
        #[test]
        fn prop_alignment(d in 0u64..10_000_000, a in 1u64..64) {
            let durations = InstructionDurations { pulse_alignment: a, ..Default::default() };
            let up = durations.align_up(d);
            let down = durations.align_down(d);
            prop_assert_eq!(up % a, 0);
            prop_assert_eq!(down % a, 0);
            prop_assert!(down <= d && d <= up);
            prop_assert!(up - down < 2 * a);
        }
    }
}
