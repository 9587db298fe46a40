use bytes::Bytes;
use quickcheck_macros::quickcheck;

use evm_tracer::arith;
use evm_tracer::prelude::*;

fn run(code: &[u8]) -> (Interpreter, ProgramState) {
    let mut vm = Interpreter::init(Bytes::copy_from_slice(code), 1_000_000);
    let state = vm.execute().expect("execution failed");

    (vm, state)
}

fn stack_top(vm: &Interpreter) -> U256 {
    vm.stack().peek(0).expect("empty stack")
}

#[test]
fn add_stops_with_sum_and_exact_gas() {
    // PUSH1 3, PUSH1 4, ADD, STOP
    let (vm, state) = run(&[0x60, 0x03, 0x60, 0x04, 0x01, 0x00]);

    assert_eq!(state.kind(), HaltKind::Stopped);
    assert_eq!(vm.stack().len(), 1);
    assert_eq!(stack_top(&vm), U256::from(7));
    assert_eq!(state.gas_used(), 9);
}

#[test]
fn sub_wraps_below_zero() {
    // PUSH1 1, PUSH1 0, SUB, STOP: top is 0 - 1
    let (vm, _) = run(&[0x60, 0x01, 0x60, 0x00, 0x03, 0x00]);

    assert_eq!(stack_top(&vm), U256::max_value());
}

#[test]
fn add_wraps_at_word_size() {
    // PUSH32 0xff..ff, PUSH1 1, ADD, STOP
    let mut code = vec![0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.extend_from_slice(&[0x60, 0x01, 0x01, 0x00]);

    let (vm, state) = run(&code);

    assert_eq!(stack_top(&vm), U256::zero());
    assert_eq!(state.kind(), HaltKind::Stopped);
}

#[test]
fn div_and_mod_by_zero_yield_zero() {
    // PUSH1 0, PUSH1 7, DIV, STOP: 7 / 0
    let (vm, _) = run(&[0x60, 0x00, 0x60, 0x07, 0x04, 0x00]);
    assert_eq!(stack_top(&vm), U256::zero());

    // PUSH1 0, PUSH1 7, MOD, STOP: 7 mod 0
    let (vm, _) = run(&[0x60, 0x00, 0x60, 0x07, 0x06, 0x00]);
    assert_eq!(stack_top(&vm), U256::zero());
}

#[test]
fn div_takes_numerator_from_the_top() {
    // PUSH1 2, PUSH1 6, DIV, STOP: 6 / 2 == 3
    let (vm, _) = run(&[0x60, 0x02, 0x60, 0x06, 0x04, 0x00]);

    assert_eq!(stack_top(&vm), U256::from(3));
}

#[test]
fn sdiv_min_int_by_minus_one_is_min_int() {
    // PUSH32 -1, PUSH32 MIN_INT, SDIV, STOP
    let mut code = vec![0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.push(0x7f);
    code.push(0x80);
    code.extend_from_slice(&[0x00; 31]);
    code.extend_from_slice(&[0x05, 0x00]);

    let (vm, _) = run(&code);

    assert_eq!(stack_top(&vm), U256::one() << 255);
}

#[test]
fn exp_pops_base_first() {
    // PUSH1 8 (exponent), PUSH1 2 (base), EXP, STOP: 2^8
    let (vm, state) = run(&[0x60, 0x08, 0x60, 0x02, 0x0a, 0x00]);

    assert_eq!(stack_top(&vm), U256::from(256));
    // 3 + 3 + (10 + 50 per exponent byte)
    assert_eq!(state.gas_used(), 3 + 3 + 10 + 50);
}

#[test]
fn shifts_pop_shift_amount_first() {
    // PUSH1 1 (value), PUSH1 4 (shift), SHL, STOP: 1 << 4
    let (vm, _) = run(&[0x60, 0x01, 0x60, 0x04, 0x1b, 0x00]);
    assert_eq!(stack_top(&vm), U256::from(16));

    // PUSH1 16, PUSH1 2, SHR, STOP: 16 >> 2
    let (vm, _) = run(&[0x60, 0x10, 0x60, 0x02, 0x1c, 0x00]);
    assert_eq!(stack_top(&vm), U256::from(4));
}

#[test]
fn signed_comparisons() {
    // PUSH1 0, PUSH32 -1, SLT, STOP: -1 < 0
    let mut code = vec![0x60, 0x00, 0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.extend_from_slice(&[0x12, 0x00]);

    let (vm, _) = run(&code);
    assert_eq!(stack_top(&vm), U256::one());
}

#[test]
fn iszero_and_not() {
    let (vm, _) = run(&[0x60, 0x00, 0x15, 0x00]);
    assert_eq!(stack_top(&vm), U256::one());

    let (vm, _) = run(&[0x60, 0x00, 0x19, 0x00]);
    assert_eq!(stack_top(&vm), U256::max_value());
}

#[test]
fn dup_and_swap_reach_their_depth() {
    // PUSH1 1, PUSH1 2, PUSH1 3, DUP3, STOP: top is a copy of the deepest
    let (vm, _) = run(&[0x60, 0x01, 0x60, 0x02, 0x60, 0x03, 0x82, 0x00]);
    assert_eq!(stack_top(&vm), U256::from(1));
    assert_eq!(vm.stack().len(), 4);

    // PUSH1 1, PUSH1 2, PUSH1 3, SWAP2, STOP: top exchanged with bottom
    let (vm, _) = run(&[0x60, 0x01, 0x60, 0x02, 0x60, 0x03, 0x91, 0x00]);
    assert_eq!(stack_top(&vm), U256::from(1));
    assert_eq!(vm.stack().peek(2).unwrap(), U256::from(3));
}

#[test]
fn stack_overflow_is_rejected() {
    let mut vm = Interpreter::init(Bytes::from_static(&[0x60, 0x01, 0x00]), 1_000_000);

    for _ in 0..1024 {
        vm.push_external(U256::zero()).unwrap();
    }

    assert_eq!(vm.step(), Err(ExecutionError::StackOverflow));
    assert_eq!(vm.status(), ExecutionStatus::Reverted);
    assert_eq!(vm.gas_remaining(), 0);
}

#[test]
fn stack_underflow_surfaces() {
    // ADD on an empty stack
    let mut vm = Interpreter::init(Bytes::from_static(&[0x01, 0x00]), 1_000_000);

    assert_eq!(vm.step(), Err(ExecutionError::StackUnderflow));
}

#[test]
fn out_of_gas_zeroes_the_counter() {
    // Three PUSHes under a 5-gas budget
    let mut vm = Interpreter::init(
        Bytes::from_static(&[0x60, 0x01, 0x60, 0x02, 0x60, 0x03, 0x00]),
        5,
    );

    assert!(vm.step().is_ok());
    assert_eq!(vm.step(), Err(ExecutionError::OutOfGas));
    assert_eq!(vm.gas_remaining(), 0);
}

#[test]
fn truncated_push_pads_low_bytes() {
    // PUSH32 with only two immediate bytes left
    let mut vm = Interpreter::init(Bytes::from_static(&[0x7f, 0xaa, 0xbb]), 1_000_000);

    vm.step().unwrap();

    let expected = U256::from(0xaabbu64) << (8 * 30);
    assert_eq!(vm.stack().peek(0).unwrap(), expected);
}

#[test]
fn halted_machine_ignores_further_steps() {
    let (mut vm, state) = run(&[0x00]);

    assert_eq!(state.kind(), HaltKind::Stopped);

    let again = vm.execute().unwrap();
    assert_eq!(again.kind(), HaltKind::Stopped);
    assert_eq!(again.gas_used(), state.gas_used());
}

#[quickcheck]
fn word_round_trips_through_big_endian(a: u64, b: u64, c: u64, d: u64) -> bool {
    let word =
        (U256::from(a) << 192) | (U256::from(b) << 128) | (U256::from(c) << 64) | U256::from(d);
    let bytes = arith::to_be_bytes(word);

    arith::from_be_bytes(&bytes) == word
}

#[quickcheck]
fn add_sub_cancel(a: u64, b: u64) -> bool {
    let a = U256::from(a);
    let b = U256::from(b);

    arith::sub(arith::add(a, b), b) == a
}

#[quickcheck]
fn neg_is_an_involution(a: u64) -> bool {
    let a = U256::from(a);

    arith::neg(arith::neg(a)) == a
}
