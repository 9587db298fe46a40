use bytes::Bytes;

use evm_tracer::gas;
use evm_tracer::prelude::*;

fn run(code: &[u8]) -> (Interpreter, ProgramState) {
    let mut vm = Interpreter::init(Bytes::copy_from_slice(code), 10_000_000);
    let state = vm.execute().expect("execution failed");

    (vm, state)
}

#[test]
fn memory_grows_in_32_byte_quanta() {
    // PUSH1 0x2a, PUSH1 0, MSTORE8, STOP: a one-byte write grows to 32
    let (vm, _) = run(&[0x60, 0x2a, 0x60, 0x00, 0x53, 0x00]);

    assert_eq!(vm.memory().len(), 32);
    assert_eq!(vm.memory()[0], 0x2a);
}

#[test]
fn straddling_write_grows_to_next_quantum() {
    // PUSH1 1, PUSH1 30, MSTORE, STOP: a word at 30 needs 64 bytes
    let (vm, _) = run(&[0x60, 0x01, 0x60, 0x1e, 0x52, 0x00]);

    assert_eq!(vm.memory().len(), 64);
}

#[test]
fn msize_reports_active_length() {
    // PUSH1 0, MLOAD, POP, MSIZE, STOP
    let (vm, _) = run(&[0x60, 0x00, 0x51, 0x50, 0x59, 0x00]);

    assert_eq!(vm.stack().peek(0).unwrap(), U256::from(32));
}

#[test]
fn mload_round_trips_mstore() {
    // PUSH1 7, PUSH1 0, MSTORE, PUSH1 0, MLOAD, STOP
    let (vm, _) = run(&[0x60, 0x07, 0x60, 0x00, 0x52, 0x60, 0x00, 0x51, 0x00]);

    assert_eq!(vm.stack().peek(0).unwrap(), U256::from(7));
}

#[test]
fn expansion_cost_is_charged_once() {
    // Two MSTOREs to the same word: only the first pays expansion.
    // PUSH1 1, PUSH1 0, MSTORE, PUSH1 2, PUSH1 0, MSTORE, STOP
    let (_, state) = run(&[
        0x60, 0x01, 0x60, 0x00, 0x52, 0x60, 0x02, 0x60, 0x00, 0x52, 0x00,
    ]);

    // 4 pushes + 2 mstores + one word of expansion
    assert_eq!(state.gas_used(), 4 * 3 + 2 * 3 + gas::memory_cost(1));
}

#[test]
fn expansion_cost_is_quadratic_delta() {
    assert_eq!(gas::memory_expansion_cost(0, 1), 3);
    assert_eq!(
        gas::memory_expansion_cost(32, 64),
        gas::memory_cost(64) - gas::memory_cost(32)
    );
}

#[test]
fn offset_past_limit_fails_before_gas() {
    // PUSH1 1, PUSH8 0xffffffff..., MSTORE8: offset 2^32 - 1 with size 1
    let mut code = vec![0x60, 0x01, 0x67];
    code.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff]);
    code.push(0x53);

    let mut vm = Interpreter::init(Bytes::copy_from_slice(&code), 10_000_000);

    assert_eq!(vm.execute(), Err(ExecutionError::MemoryLimitExceeded));
}

#[test]
fn zero_size_access_at_huge_offset_is_free() {
    // PUSH1 0 (len), PUSH8 huge (offset), RETURN
    let mut code = vec![0x60, 0x00, 0x67];
    code.extend_from_slice(&[0xff; 8]);
    code.push(0xf3);

    let mut vm = Interpreter::init(Bytes::copy_from_slice(&code), 10_000_000);
    let state = vm.execute().unwrap();

    assert_eq!(state.kind(), HaltKind::Stopped);
    assert!(state.return_data().is_empty());
    assert_eq!(vm.memory().len(), 0);
}

#[test]
fn mcopy_moves_within_memory() {
    // PUSH1 0x2a, PUSH1 0, MSTORE,
    // PUSH1 32 (len), PUSH1 0 (src), PUSH1 32 (dest), MCOPY, STOP
    let (vm, _) = run(&[
        0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0x60, 0x20, 0x5e, 0x00,
    ]);

    assert_eq!(vm.memory().len(), 64);
    assert_eq!(vm.memory()[63], 0x2a);
}

#[test]
fn calldatacopy_zero_fills_past_input() {
    // PUSH1 8 (len), PUSH1 0 (offset), PUSH1 0 (dest), CALLDATACOPY, STOP
    let mut vm = Interpreter::init(
        Bytes::from_static(&[0x60, 0x08, 0x60, 0x00, 0x60, 0x00, 0x37, 0x00]),
        10_000_000,
    );
    vm.set_call_context(
        H160::zero(),
        H160::zero(),
        U256::zero(),
        Bytes::from_static(&[0xaa, 0xbb]),
    );
    vm.execute().unwrap();

    assert_eq!(&vm.memory()[..8], &[0xaa, 0xbb, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn calldataload_pads_past_end() {
    // PUSH1 1, CALLDATALOAD, STOP
    let mut vm = Interpreter::init(Bytes::from_static(&[0x60, 0x01, 0x35, 0x00]), 10_000_000);
    vm.set_call_context(
        H160::zero(),
        H160::zero(),
        U256::zero(),
        Bytes::from_static(&[0x11, 0x22, 0x33]),
    );
    vm.execute().unwrap();

    let expected = (U256::from(0x2233u64)) << (8 * 30);
    assert_eq!(vm.stack().peek(0).unwrap(), expected);
}

#[test]
fn keccak256_hashes_memory_region() {
    // PUSH1 0, PUSH1 0, KECCAK256, STOP: hash of the empty string
    let (vm, _) = run(&[0x60, 0x00, 0x60, 0x00, 0x20, 0x00]);

    let expected = U256::from_big_endian(
        &hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
            .unwrap(),
    );
    assert_eq!(vm.stack().peek(0).unwrap(), expected);
}

#[test]
fn returndatacopy_out_of_bounds_fails() {
    // No prior call: the buffer is empty, any nonzero read is out of range.
    // PUSH1 1, PUSH1 0, PUSH1 0, RETURNDATACOPY
    let mut vm = Interpreter::init(
        Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0x3e]),
        10_000_000,
    );

    assert_eq!(vm.execute(), Err(ExecutionError::ReturnDataOutOfBounds));
}
