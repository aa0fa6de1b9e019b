pub mod errors;
pub mod evaluator;
pub mod gc;
pub mod generator;

pub use errors::*;
pub use evaluator::*;
pub use gc::*;
pub use generator::*;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use circuit::{AndForm, Circuit, Gate};
    use crypto_core::{utils::int_to_bits, AesRng};

    use crate::{encode, EvaluatorError, GCEvaluator, GCGenerator, HalfGateEvaluator, HalfGateGenerator};

    fn all_gate_kinds() -> Circuit {
        let two = |gate_id, out_id, form| Gate::And {
            gate_id,
            lin_id: 0,
            rin_id: 1,
            out_id,
            form,
        };
        Circuit::new(
            "kinds",
            vec![0],
            vec![1],
            vec![2, 3, 4, 5, 6, 7, 8],
            vec![
                two(0, 2, AndForm::AND),
                two(1, 3, AndForm::OR),
                Gate::Xor {
                    gate_id: 2,
                    lin_id: 0,
                    rin_id: 1,
                    out_id: 4,
                    negated: false,
                },
                two(3, 5, AndForm::NAND),
                two(4, 6, AndForm::NOR),
                Gate::Xor {
                    gate_id: 5,
                    lin_id: 0,
                    rin_id: 1,
                    out_id: 7,
                    negated: true,
                },
                Gate::Inv {
                    gate_id: 6,
                    lin_id: 0,
                    out_id: 8,
                },
            ],
        )
        .unwrap()
    }

    /// Garble once per assignment and compare with plaintext evaluation.
    fn check_exhaustive(circ: &Circuit) {
        let mut rng = AesRng::new();
        let n = circ.ninput_wires();
        for x in 0..(1u64 << n) {
            let bits = int_to_bits(x, n);
            let inputs: BTreeMap<usize, bool> =
                circ.input_wires().zip(bits.iter().copied()).collect();

            let mut gen = HalfGateGenerator::random(&mut rng);
            let mut ev = HalfGateEvaluator::new();

            let gc = gen.garble_fresh(&mut rng, circ).unwrap();
            let decode = gen.finalize(&gc.output_zero_labels);
            let input_value_labels = encode(&gc.input_zero_labels, &inputs, gen.delta()).unwrap();

            let output_value_labels = ev.eval(circ, &gc.gc_table, &input_value_labels).unwrap();
            let outputs = ev.finalize(&output_value_labels, &decode).unwrap();

            assert_eq!(outputs, circ.eval(&inputs).unwrap(), "inputs {:?}", bits);
        }
    }

    #[test]
    fn gc_all_gate_kinds_test() {
        check_exhaustive(&all_gate_kinds());
    }

    #[test]
    fn gc_default_circuits_test() {
        for circ in Circuit::load_file("../circuit/circuit_files/default.json").unwrap() {
            check_exhaustive(&circ);
        }
    }

    #[test]
    fn gc_output_labels_are_pairs() {
        let mut rng = AesRng::new();
        let circ = all_gate_kinds();
        let mut gen = HalfGateGenerator::random(&mut rng);
        let gc = gen.garble_fresh(&mut rng, &circ).unwrap();
        assert_eq!(gc.gc_table.table.len(), circ.nand);

        let inputs = BTreeMap::from([(0, true), (1, false)]);
        let value_labels = encode(&gc.input_zero_labels, &inputs, gen.delta()).unwrap();
        let mut ev = HalfGateEvaluator::new();
        let out = ev.eval(&circ, &gc.gc_table, &value_labels).unwrap();

        // Every output label is either the zero label or the one label.
        for (value, zero) in out.iter().zip(gc.output_zero_labels.iter()) {
            assert_eq!(value.id, zero.id);
            assert!(value.label == zero.label || value.label == zero.label ^ gen.delta());
        }
    }

    #[test]
    fn gc_truncated_table_is_rejected() {
        let mut rng = AesRng::new();
        let circ = all_gate_kinds();
        let mut gen = HalfGateGenerator::random(&mut rng);
        let mut gc = gen.garble_fresh(&mut rng, &circ).unwrap();
        gc.gc_table.table.pop();

        let inputs = BTreeMap::from([(0, false), (1, false)]);
        let value_labels = encode(&gc.input_zero_labels, &inputs, gen.delta()).unwrap();
        let mut ev = HalfGateEvaluator::new();
        assert!(matches!(
            ev.eval(&circ, &gc.gc_table, &value_labels),
            Err(EvaluatorError::TableExhausted(3))
        ));
        assert!(matches!(
            ev.finalize(&value_labels, &[]),
            Err(EvaluatorError::DecodeInfoMismatch { .. })
        ));
    }
}
