//! Property-based tests for physical QASM3 emission.
//!
//! Checks that emission is line-per-operation and that every logical qubit
//! reference is rewritten to its physical counterpart.

use proptest::prelude::*;
use xtalk_ir::{Circuit, Layout, QubitId};
use xtalk_qasm3::emit_physical;

#[derive(Debug, Clone)]
enum Op {
    H(u32),
    X(u32),
    Y(u32),
    Cx(u32, u32),
    Delay(u32, u64),
    Barrier,
}

fn arb_op(num_qubits: u32) -> impl Strategy<Value = Op> {
    let q = 0..num_qubits;
    prop_oneof![
        q.clone().prop_map(Op::H),
        q.clone().prop_map(Op::X),
        q.clone().prop_map(Op::Y),
        (q.clone(), q.clone())
            .prop_filter("distinct operands", |(a, b)| a != b)
            .prop_map(|(a, b)| Op::Cx(a, b)),
        (q, 1u64..10_000).prop_map(|(a, d)| Op::Delay(a, d)),
        Just(Op::Barrier),
    ]
}

fn arb_case() -> impl Strategy<Value = (Circuit, Layout)> {
    (2_u32..=6).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_op(n), 1..=20),
            prop::sample::subsequence((0..127).collect::<Vec<u32>>(), n as usize).prop_shuffle(),
        )
            .prop_map(move |(ops, physical)| {
                let mut circuit = Circuit::with_size("prop", n, n);
                for op in ops {
                    let _ = match op {
                        Op::H(q) => circuit.h(QubitId(q)),
                        Op::X(q) => circuit.x(QubitId(q)),
                        Op::Y(q) => circuit.y(QubitId(q)),
                        Op::Cx(a, b) => circuit.cx(QubitId(a), QubitId(b)),
                        Op::Delay(q, d) => circuit.delay(QubitId(q), d),
                        Op::Barrier => circuit.barrier_all(),
                    };
                }
                circuit.measure_all().unwrap();
                let layout = Layout::from_physical(physical).unwrap();
                (circuit, layout)
            })
    })
}

proptest! {
    #[test]
    fn physical_emission_has_one_line_per_operation((circuit, layout) in arb_case()) {
        let qasm = emit_physical(&circuit, &layout).unwrap();
        let body: Vec<&str> = qasm
            .lines()
            .skip_while(|l| !l.is_empty())
            .filter(|l| !l.is_empty() && !l.starts_with("bit["))
            .collect();
        prop_assert_eq!(body.len(), circuit.len());
        prop_assert!(body.iter().all(|l| l.ends_with(';')));
    }

    #[test]
    fn physical_emission_never_mentions_virtual_register((circuit, layout) in arb_case()) {
        let qasm = emit_physical(&circuit, &layout).unwrap();
        prop_assert!(!qasm.contains("q["));
        for &p in layout.physical_qubits() {
            let reference = format!("${p}");
            let measured = format!("measure {reference};");
            prop_assert!(qasm.contains(&measured));
        }
    }
}
