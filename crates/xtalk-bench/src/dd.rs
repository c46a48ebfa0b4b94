//! Dynamical-decoupling padding of idle windows.
//!
//! A window of length `W` holding `k` pulses of length `p` leaves
//! `τ = W − k·p` of free time. It is split with the balanced spacing
//! `[τ/2k, τ/k, …, τ/k, τ/2k]`, so the pulses sit at the centres of `k`
//! equal slots. Each gap is rounded down onto the pulse-alignment grid and
//! the rounding remainder goes to the final gap, keeping the padded window
//! exactly `W` long.

use xtalk_ir::{Circuit, InstructionDurations, IrError, IrResult, QubitId};

use crate::config::DdSequence;

/// Fraction of the free time placed before each pulse and after the last.
pub fn balanced_spacing(num_pulses: usize) -> Vec<f64> {
    if num_pulses == 0 {
        return vec![1.0];
    }
    let k = num_pulses as f64;
    let mut spacing = vec![1.0 / k; num_pulses + 1];
    spacing[0] = 1.0 / (2.0 * k);
    spacing[num_pulses] = 1.0 / (2.0 * k);
    spacing
}

/// Shortest window that can hold one cycle of `sequence`.
pub fn min_window(sequence: DdSequence, durations: &InstructionDurations) -> u64 {
    sequence.pulses().len() as u64 * durations.single_qubit
}

/// Gap lengths (in `dt`) around the pulses of `sequence` in a `window`.
pub fn gaps(
    sequence: DdSequence,
    window: u64,
    durations: &InstructionDurations,
) -> IrResult<Vec<u64>> {
    let pulses = sequence.pulses().len();
    let required = min_window(sequence, durations);
    let free = window.checked_sub(required).ok_or(IrError::WindowTooShort {
        required,
        available: window,
    })?;

    let spacing = balanced_spacing(pulses);
    let mut gaps: Vec<u64> = spacing[..pulses]
        .iter()
        .map(|frac| durations.align_down((free as f64 * frac) as u64))
        .collect();
    let used: u64 = gaps.iter().sum();
    gaps.push(free - used);
    Ok(gaps)
}

/// Fill `window` on `qubit` with one cycle of `sequence`.
pub fn pad_window(
    circuit: &mut Circuit,
    qubit: QubitId,
    window: u64,
    sequence: DdSequence,
    durations: &InstructionDurations,
) -> IrResult<()> {
    let gaps = gaps(sequence, window, durations)?;
    for (gap, &pulse) in gaps.iter().zip(sequence.pulses()) {
        circuit.delay(qubit, *gap)?;
        circuit.gate(pulse, [qubit])?;
    }
    if let Some(&last) = gaps.last() {
        circuit.delay(qubit, last)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use xtalk_ir::StandardGate;

    #[test]
    fn test_balanced_spacing() {
        assert_eq!(balanced_spacing(2), vec![0.25, 0.5, 0.25]);
        assert_eq!(balanced_spacing(4), vec![0.125, 0.25, 0.25, 0.25, 0.125]);
        let total: f64 = balanced_spacing(4).iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_xx_gaps() {
        let durations = InstructionDurations::default();
        // free time 1600 - 320 = 1280 -> 320, 640, 320
        let gaps = gaps(DdSequence::Xx, 1600, &durations).unwrap();
        assert_eq!(gaps, vec![320, 640, 320]);
    }

    #[test]
    fn test_window_too_short() {
        let durations = InstructionDurations::default();
        let err = gaps(DdSequence::Xyxy, 600, &durations).unwrap_err();
        assert!(matches!(err, IrError::WindowTooShort { required: 640, available: 600 }));
    }

    #[test]
    fn test_pad_window_emits_sequence() {
        let durations = InstructionDurations::default();
        let mut circuit = Circuit::with_size("dd", 1, 0);
        pad_window(&mut circuit, QubitId(0), 8000, DdSequence::Xyxy, &durations).unwrap();

        let pulses: Vec<StandardGate> = circuit
            .instructions()
            .iter()
            .filter_map(|i| i.as_gate())
            .collect();
        assert_eq!(pulses, DdSequence::Xyxy.pulses());
        assert_eq!(durations.schedule(&circuit).total(), 8000);
    }

    proptest! {
        #[test]
        fn prop_padding_preserves_window(slots in 80u64..20_000, xx in any::<bool>()) {
            let durations = InstructionDurations::default();
            let window = slots * durations.pulse_alignment;
            let seq = if xx { DdSequence::Xx } else { DdSequence::Xyxy };
            prop_assume!(window >= min_window(seq, &durations));

            let gaps = gaps(seq, window, &durations).unwrap();
            prop_assert_eq!(gaps.len(), seq.pulses().len() + 1);
            prop_assert!(gaps.iter().all(|g| g % durations.pulse_alignment == 0));

            let mut circuit = Circuit::with_size("dd", 1, 0);
            pad_window(&mut circuit, QubitId(0), window, seq, &durations).unwrap();
            prop_assert_eq!(durations.schedule(&circuit).total(), window);
        }
    }
}
