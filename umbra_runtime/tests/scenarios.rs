use std::collections::HashMap;

use proptest::prelude::*;
use umbra_circuit::{Circuit, Literal, NodeIndex, Package, Type};
use umbra_runtime::{
    CircuitMetadata, Error, ParameterMetadata, PlainEvaluator, ReturnMetadata, Runtime,
};

fn metadata(entry: &str, is_void: bool, params: Vec<ParameterMetadata>) -> CircuitMetadata {
    CircuitMetadata {
        entry: entry.to_owned(),
        return_type: ReturnMetadata { is_void },
        params,
    }
}

fn input(name: &str, ty: Type) -> ParameterMetadata {
    ParameterMetadata {
        name: name.to_owned(),
        ty,
        is_const: false,
        is_reference: false,
    }
}

fn by_ref(name: &str, ty: Type) -> ParameterMetadata {
    ParameterMetadata {
        name: name.to_owned(),
        ty,
        is_const: false,
        is_reference: true,
    }
}

fn runtime_for(circuit: Circuit, metadata: CircuitMetadata) -> Runtime {
    let mut package = Package::new();
    package.insert_function(&metadata.entry, circuit);

    Runtime::create_from_parts(package, metadata).unwrap()
}

fn identity_circuit() -> (Circuit, CircuitMetadata) {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    circuit.set_return_value(bit);

    (
        circuit,
        metadata("identity", false, vec![input("x", Type::Bits(1))]),
    )
}

fn invert_circuit() -> (Circuit, CircuitMetadata) {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    let inverted = circuit.append_not(bit);
    circuit.set_return_value(inverted);

    (
        circuit,
        metadata("invert", false, vec![input("x", Type::Bits(1))]),
    )
}

#[test]
fn identity_circuit_returns_its_input() {
    let (circuit, md) = identity_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[true]);
    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![true]);
}

#[test]
fn not_gate_inverts_its_input() {
    let (circuit, md) = invert_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[false]);
    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![true]);
}

#[test]
fn and_with_a_literal_masks_the_input() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let one = circuit.append_literal(Literal::from(1), Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    let and = circuit.append_and(one, bit);
    circuit.set_return_value(and);

    let mut runtime = runtime_for(
        circuit,
        metadata("mask", false, vec![input("x", Type::Bits(1))]),
    );
    let evaluator = PlainEvaluator::new();

    for value in [true, false] {
        let mut x = evaluator.encrypt(&[value]);
        let mut result = evaluator.encrypt(&[false]);
        runtime
            .run(
                Some(&mut result[..]),
                HashMap::from([("x", &mut x[..])]),
                &evaluator,
            )
            .unwrap();

        assert_eq!(evaluator.decrypt(&result), vec![value]);
    }
}

#[test]
fn two_bit_reversal_swaps_host_bits() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(2));
    let b0 = circuit.append_bit_slice(x, 0, 1);
    let b1 = circuit.append_bit_slice(x, 1, 1);
    let concat = circuit.append_concat(&[b0, b1]);
    circuit.set_return_value(concat);

    let mut runtime = runtime_for(
        circuit,
        metadata("reverse", false, vec![input("x", Type::Bits(2))]),
    );
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[true, false]);
    let mut result = evaluator.encrypt(&[false, false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![false, true]);
}

#[test]
fn array_reads_address_the_right_element_bit() {
    let array_type = Type::Array {
        element: Box::new(Type::Bits(8)),
        size: 3,
    };

    let mut circuit = Circuit::new();
    let a = circuit.append_parameter("a", array_type.clone());
    let index = circuit.append_literal(Literal::from(2), Type::Bits(2));
    let element = circuit.append_array_index(a, &[index]);
    let bit = circuit.append_bit_slice(element, 3, 1);
    circuit.set_return_value(bit);

    let mut runtime = runtime_for(
        circuit,
        metadata("read", false, vec![input("a", array_type)]),
    );
    let evaluator = PlainEvaluator::new();

    // Bytes [0, 0, 0b00001000]: only bit 3 of element 2 is set.
    let mut bits = vec![false; 24];
    bits[2 * 8 + 3] = true;
    let mut a = evaluator.encrypt(&bits);
    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("a", &mut a[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![true]);
}

#[test]
fn fan_out_evaluates_independent_gates_in_shared_rounds() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(16));
    let mut layer: Vec<NodeIndex> = (0..16)
        .map(|i| {
            let bit = circuit.append_bit_slice(x, i, 1);
            circuit.append_and(bit, bit)
        })
        .collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| circuit.append_and(pair[0], pair[1]))
            .collect();
    }
    circuit.set_return_value(layer[0]);

    let node_count = circuit.node_count();
    let mut runtime = runtime_for(
        circuit,
        metadata("all_set", false, vec![input("x", Type::Bits(16))]),
    );
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[true; 16]);
    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![true]);
    // 16 leaf gates plus a 15-gate reduction tree.
    assert_eq!(evaluator.gate_count(), 31);
    // Independent gates share rounds instead of running one per round.
    assert!(runtime.last_round_count() < node_count);

    // One cleared bit flips the conjunction.
    let mut bits = [true; 16];
    bits[7] = false;
    let mut x = evaluator.encrypt(&bits);
    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![false]);
}

#[test]
fn runs_are_deterministic() {
    let (circuit, md) = invert_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut first = evaluator.encrypt(&[false]);
    let mut second = evaluator.encrypt(&[true]);
    for result in [&mut first, &mut second] {
        let mut x = evaluator.encrypt(&[false]);
        runtime
            .run(
                Some(&mut result[..]),
                HashMap::from([("x", &mut x[..])]),
                &evaluator,
            )
            .unwrap();
    }

    assert_eq!(evaluator.decrypt(&first), evaluator.decrypt(&second));
}

#[test]
fn a_lone_literal_feeding_not_decrypts_to_one() {
    let mut circuit = Circuit::new();
    let zero = circuit.append_literal(Literal::from(0), Type::Bits(1));
    let inverted = circuit.append_not(zero);
    circuit.set_return_value(inverted);

    let mut runtime = runtime_for(circuit, metadata("constant", false, vec![]));
    let evaluator = PlainEvaluator::new();

    let mut result = evaluator.encrypt(&[false]);
    runtime
        .run(Some(&mut result[..]), HashMap::new(), &evaluator)
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![true]);
}

fn void_store_circuit() -> (Circuit, CircuitMetadata) {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let _y = circuit.append_parameter("y", Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    let inverted = circuit.append_not(bit);
    let ret = circuit.append_tuple(&[inverted]);
    circuit.set_return_value(ret);

    (
        circuit,
        metadata(
            "store",
            true,
            vec![input("x", Type::Bits(1)), by_ref("y", Type::Bits(1))],
        ),
    )
}

#[test]
fn void_functions_write_back_through_reference_params() {
    let (circuit, md) = void_store_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[false]);
    let mut y = evaluator.encrypt(&[false]);
    runtime
        .run(
            None,
            HashMap::from([("x", &mut x[..]), ("y", &mut y[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&y), vec![true]);
}

#[test]
fn void_functions_reject_result_buffers() {
    let (circuit, md) = void_store_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[false]);
    let mut y = evaluator.encrypt(&[false]);
    let mut result = evaluator.encrypt(&[false]);
    let outcome = runtime.run(
        Some(&mut result[..]),
        HashMap::from([("x", &mut x[..]), ("y", &mut y[..])]),
        &evaluator,
    );

    assert!(matches!(outcome, Err(Error::VoidWithResult)));
}

#[test]
fn value_returning_functions_require_a_result_buffer() {
    let (circuit, md) = invert_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[false]);
    let outcome = runtime.run(None, HashMap::from([("x", &mut x[..])]), &evaluator);

    assert!(matches!(outcome, Err(Error::MissingResult)));
}

#[test]
fn back_writes_without_reference_params_are_rejected() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    let inverted = circuit.append_not(bit);
    let ret = circuit.append_tuple(&[inverted]);
    circuit.set_return_value(ret);

    let mut runtime = runtime_for(
        circuit,
        metadata("orphan", true, vec![input("x", Type::Bits(1))]),
    );
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[false]);
    let outcome = runtime.run(None, HashMap::from([("x", &mut x[..])]), &evaluator);

    assert!(matches!(outcome, Err(Error::OutputParamMismatch(_))));
}

#[test]
fn primary_return_and_back_writes_compose() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(1));
    let _y = circuit.append_parameter("y", Type::Bits(1));
    let bit = circuit.append_bit_slice(x, 0, 1);
    let inverted = circuit.append_not(bit);
    let ret = circuit.append_tuple(&[inverted, bit]);
    circuit.set_return_value(ret);

    let mut runtime = runtime_for(
        circuit,
        metadata(
            "invert_and_store",
            false,
            vec![input("x", Type::Bits(1)), by_ref("y", Type::Bits(1))],
        ),
    );
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[true]);
    let mut y = evaluator.encrypt(&[false]);
    let mut result = evaluator.encrypt(&[true]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..]), ("y", &mut y[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![false]);
    assert_eq!(evaluator.decrypt(&y), vec![true]);
}

#[test]
fn misnamed_arguments_are_rejected() {
    let (circuit, md) = identity_circuit();
    let mut runtime = runtime_for(circuit, md);
    let evaluator = PlainEvaluator::new();

    let mut y = evaluator.encrypt(&[true]);
    let mut result = evaluator.encrypt(&[false]);
    let outcome = runtime.run(
        Some(&mut result[..]),
        HashMap::from([("y", &mut y[..])]),
        &evaluator,
    );

    assert!(matches!(outcome, Err(Error::MetadataMismatch(_))));
}

#[test]
fn undersized_argument_buffers_are_rejected() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(2));
    let bit = circuit.append_bit_slice(x, 0, 1);
    circuit.set_return_value(bit);

    let mut runtime = runtime_for(
        circuit,
        metadata("narrow", false, vec![input("x", Type::Bits(2))]),
    );
    let evaluator = PlainEvaluator::new();

    let mut x = evaluator.encrypt(&[true]);
    let mut result = evaluator.encrypt(&[false]);
    let outcome = runtime.run(
        Some(&mut result[..]),
        HashMap::from([("x", &mut x[..])]),
        &evaluator,
    );

    assert!(matches!(outcome, Err(Error::MetadataMismatch(_))));
}

#[test]
fn metadata_and_circuit_signatures_must_agree() {
    let (circuit, _) = identity_circuit();
    let mut package = Package::new();
    package.insert_function("identity", circuit);

    let outcome = Runtime::create_from_parts(
        package,
        metadata("identity", false, vec![input("z", Type::Bits(1))]),
    );

    assert!(matches!(outcome, Err(Error::MetadataMismatch(_))));
}

#[test]
fn gates_over_wide_values_fail_validation() {
    let mut circuit = Circuit::new();
    let x = circuit.append_parameter("x", Type::Bits(2));
    let and = circuit.append_and(x, x);
    circuit.set_return_value(and);

    let mut package = Package::new();
    package.insert_function("wide", circuit);

    let outcome = Runtime::create_from_parts(
        package,
        metadata("wide", false, vec![input("x", Type::Bits(2))]),
    );

    assert!(matches!(outcome, Err(Error::InvalidIR(_))));
}

#[test]
fn runtimes_construct_from_serialized_text() {
    let (circuit, md) = invert_circuit();
    let mut package = Package::new();
    package.insert_function("invert", circuit);

    let ir_text = serde_json::to_string(&package).unwrap();
    let metadata_text = serde_json::to_string(&md).unwrap();
    let mut runtime = Runtime::create_from_strings(&ir_text, &metadata_text).unwrap();

    let evaluator = PlainEvaluator::new();
    let mut x = evaluator.encrypt(&[true]);
    let mut result = evaluator.encrypt(&[true]);
    runtime
        .run(
            Some(&mut result[..]),
            HashMap::from([("x", &mut x[..])]),
            &evaluator,
        )
        .unwrap();

    assert_eq!(evaluator.decrypt(&result), vec![false]);
}

proptest! {
    #[test]
    fn reversal_circuits_reverse_any_input(bits in proptest::collection::vec(any::<bool>(), 1..=8)) {
        let width = bits.len();

        let mut circuit = Circuit::new();
        let x = circuit.append_parameter("x", Type::Bits(width));
        let slices: Vec<NodeIndex> = (0..width)
            .map(|i| circuit.append_bit_slice(x, i, 1))
            .collect();
        let concat = circuit.append_concat(&slices);
        circuit.set_return_value(concat);

        // Concat is big-endian, so listing host bit 0 first reverses the
        // vector.
        let mut runtime = runtime_for(
            circuit,
            metadata("reverse", false, vec![input("x", Type::Bits(width))]),
        );
        let evaluator = PlainEvaluator::new();

        let mut x_bits = evaluator.encrypt(&bits);
        let mut result = evaluator.encrypt(&vec![false; width]);
        runtime
            .run(
                Some(&mut result[..]),
                HashMap::from([("x", &mut x_bits[..])]),
                &evaluator,
            )
            .unwrap();

        let expected: Vec<bool> = bits.iter().rev().copied().collect();
        prop_assert_eq!(evaluator.decrypt(&result), expected);
    }
}
