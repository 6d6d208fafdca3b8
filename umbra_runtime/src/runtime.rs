use std::collections::HashMap;
use std::path::Path;

use scoped_threadpool::Pool;
use umbra_circuit::{Circuit, Package, Type};

use crate::run;
use crate::{BooleanEvaluator, CircuitMetadata, Error, Result};

/**
 * Evaluates a compiled package's entry function over encrypted bits.
 *
 * A `Runtime` owns a fixed worker pool sized at twice the online CPU
 * count. Workers park between runs and exit when the runtime is dropped.
 *
 * # Example
 * ```
 * # use std::collections::HashMap;
 * # use umbra_circuit::{Circuit, Package, Type};
 * # use umbra_runtime::{
 * #     CircuitMetadata, ParameterMetadata, PlainEvaluator, ReturnMetadata, Runtime,
 * # };
 * let mut circuit = Circuit::new();
 * let x = circuit.append_parameter("x", Type::Bits(1));
 * let bit = circuit.append_bit_slice(x, 0, 1);
 * let inverted = circuit.append_not(bit);
 * circuit.set_return_value(inverted);
 *
 * let mut package = Package::new();
 * package.insert_function("invert", circuit);
 *
 * let metadata = CircuitMetadata {
 *     entry: "invert".to_owned(),
 *     return_type: ReturnMetadata { is_void: false },
 *     params: vec![ParameterMetadata {
 *         name: "x".to_owned(),
 *         ty: Type::Bits(1),
 *         is_const: false,
 *         is_reference: false,
 *     }],
 * };
 *
 * let mut runtime = Runtime::create_from_parts(package, metadata).unwrap();
 *
 * let evaluator = PlainEvaluator::new();
 * let mut x = evaluator.encrypt(&[false]);
 * let mut result = evaluator.encrypt(&[false]);
 *
 * runtime
 *     .run(
 *         Some(&mut result[..]),
 *         HashMap::from([("x", &mut x[..])]),
 *         &evaluator,
 *     )
 *     .unwrap();
 *
 * assert_eq!(evaluator.decrypt(&result), vec![true]);
 * ```
 */
pub struct Runtime {
    package: Package,
    metadata: CircuitMetadata,
    pool: Pool,
    last_round_count: usize,
}

impl Runtime {
    /**
     * Creates a runtime from serialized circuit-package and metadata files.
     */
    pub fn create_from_files(
        ir_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let ir_text = std::fs::read_to_string(ir_path)?;
        let metadata_text = std::fs::read_to_string(metadata_path)?;

        Self::create_from_strings(&ir_text, &metadata_text)
    }

    /**
     * Creates a runtime from serialized circuit-package and metadata text.
     */
    pub fn create_from_strings(ir_text: &str, metadata_text: &str) -> Result<Self> {
        let package: Package = serde_json::from_str(ir_text)
            .map_err(|e| Error::InvalidIR(format!("could not parse the circuit package: {e}")))?;
        let metadata: CircuitMetadata = serde_json::from_str(metadata_text)
            .map_err(|e| Error::MetadataMismatch(format!("could not parse the call metadata: {e}")))?;

        Self::create_from_parts(package, metadata)
    }

    /**
     * Creates a runtime from already-parsed structures.
     */
    pub fn create_from_parts(package: Package, metadata: CircuitMetadata) -> Result<Self> {
        package.validate()?;
        check_entry(&package, &metadata)?;

        log::debug!(
            "loaded entry `{}` with {} parameters",
            metadata.entry,
            metadata.params.len()
        );

        let workers = 2 * num_cpus::get();

        Ok(Self {
            package,
            metadata,
            pool: Pool::new(workers as u32),
            last_round_count: 0,
        })
    }

    /**
     * The number of scheduler rounds the most recent successful
     * [`run`](Self::run) took.
     */
    pub fn last_round_count(&self) -> usize {
        self.last_round_count
    }

    /**
     * Evaluates the entry function.
     *
     * `args` maps each parameter name to a caller-owned buffer of
     * `flat_bit_count` ciphertexts in host (little-endian) bit order.
     * Non-void functions receive their primary return value through
     * `result`; void functions must pass `None`. Non-const reference
     * parameters are written back into their argument buffers before the
     * call returns.
     *
     * Buffers are borrowed only for the duration of the call. On error,
     * every intermediate ciphertext is freed and the buffers keep whatever
     * writes happened before the abort.
     */
    pub fn run<E: BooleanEvaluator>(
        &mut self,
        result: Option<&mut [E::Ciphertext]>,
        mut args: HashMap<&str, &mut [E::Ciphertext]>,
        evaluator: &E,
    ) -> Result<()> {
        let entry = self.package.function(&self.metadata.entry).ok_or_else(|| {
            Error::InvalidIR(format!(
                "package has no function named `{}`",
                self.metadata.entry
            ))
        })?;

        if args.len() != self.metadata.params.len() {
            return Err(Error::MetadataMismatch(format!(
                "expected {} arguments, got {}",
                self.metadata.params.len(),
                args.len()
            )));
        }
        for param in &self.metadata.params {
            let buffer = args.get(param.name.as_str()).ok_or_else(|| {
                Error::MetadataMismatch(format!("no argument named `{}`", param.name))
            })?;

            let expected = param.ty.flat_bit_count();
            if buffer.len() != expected {
                return Err(Error::MetadataMismatch(format!(
                    "argument `{}` holds {} ciphertexts but its type takes {}",
                    param.name,
                    buffer.len(),
                    expected
                )));
            }
        }

        check_result_buffer(entry, &self.metadata, result.as_deref())?;

        let args_view: HashMap<&str, &[E::Ciphertext]> = args
            .iter()
            .map(|(name, buffer)| (*name, &**buffer as &[E::Ciphertext]))
            .collect();

        let (values, rounds) = run::run_circuit(&mut self.pool, entry, &args_view, evaluator)?;
        drop(args_view);
        self.last_round_count = rounds;

        run::collect_outputs(entry, &self.metadata, result, &mut args, &values, evaluator)
    }
}

/**
 * Checks that the metadata's view of the entry function agrees with the
 * circuit: the entry exists, has a return node, and declares the same
 * parameters in the same order.
 */
fn check_entry(package: &Package, metadata: &CircuitMetadata) -> Result<()> {
    let entry = package.function(&metadata.entry).ok_or_else(|| {
        Error::InvalidIR(format!("package has no function named `{}`", metadata.entry))
    })?;

    if entry.return_value().is_none() {
        return Err(Error::InvalidIR(format!(
            "function `{}` has no return value",
            metadata.entry
        )));
    }

    if entry.params().len() != metadata.params.len() {
        return Err(Error::MetadataMismatch(format!(
            "the circuit takes {} parameters, the metadata declares {}",
            entry.params().len(),
            metadata.params.len()
        )));
    }

    for (node, param) in entry.params().iter().zip(&metadata.params) {
        let info = entry.node(*node);
        let name = info
            .name()
            .ok_or_else(|| Error::InvalidIR("signature node is not a parameter".to_owned()))?;

        if name != param.name {
            return Err(Error::MetadataMismatch(format!(
                "the circuit names a parameter `{name}` where the metadata declares `{}`",
                param.name
            )));
        }
        if info.output_type != param.ty {
            return Err(Error::MetadataMismatch(format!(
                "parameter `{}` is typed differently by the circuit and the metadata",
                param.name
            )));
        }
    }

    Ok(())
}

/**
 * Checks the result buffer against the return convention: void functions
 * take none, value-returning functions take one sized for the primary
 * return element.
 */
fn check_result_buffer<C>(
    entry: &Circuit,
    metadata: &CircuitMetadata,
    result: Option<&[C]>,
) -> Result<()> {
    if metadata.return_type.is_void {
        if result.is_some() {
            return Err(Error::VoidWithResult);
        }
        return Ok(());
    }

    let buffer = result.ok_or(Error::MissingResult)?;

    let return_value = entry
        .return_value()
        .ok_or_else(|| Error::InvalidIR("the entry function has no return value".to_owned()))?;
    let primary = match entry.output_type(return_value) {
        Type::Tuple(_) => entry
            .operand(return_value, 0)
            .map(|node| entry.output_type(node)),
        _ => Some(entry.output_type(return_value)),
    };

    if let Some(primary) = primary {
        let expected = primary.flat_bit_count();
        if buffer.len() != expected {
            return Err(Error::MetadataMismatch(format!(
                "the result buffer holds {} ciphertexts but the return type takes {expected}",
                buffer.len()
            )));
        }
    }

    Ok(())
}
