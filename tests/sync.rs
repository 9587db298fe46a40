use bytes::Bytes;

use evm_tracer::prelude::*;

/// Snapshot of a mock fast interpreter that agrees with `vm`.
fn snapshot_of(vm: &Interpreter, cursor: usize, gas_limit: u64, gas_used: u64) -> FastSnapshot {
    FastSnapshot {
        cursor,
        pc: vm.pc(),
        gas_remaining: gas_limit - gas_used,
        stack_len: vm.stack().len(),
        stack_top: vm.stack().as_slice().iter().rev().copied().collect(),
        memory_len: vm.memory().len(),
        memory: Some(Bytes::copy_from_slice(vm.memory())),
        halted: vm.status().halt_kind(),
        return_data: Some(vm.return_data().clone()),
    }
}

/// Engine over `code` plus a mirror machine standing in for the fast
/// interpreter.
fn engine_and_mirror(code: &[u8], gas: u64) -> (SyncEngine, Interpreter) {
    let code = Bytes::copy_from_slice(code);
    let engine = SyncEngine::new(Interpreter::init(code.clone(), gas));
    let mirror = Interpreter::init(code, gas);

    (engine, mirror)
}

const GAS: u64 = 1_000_000;

#[test]
fn fused_push_add_advances_two_reference_steps() {
    // PUSH1 5, ADD, STOP with 10 already on both stacks
    let (mut engine, mut mirror) = engine_and_mirror(&[0x60, 0x05, 0x01, 0x00], GAS);

    engine.reference_mut().push_external(U256::from(10)).unwrap();
    mirror.push_external(U256::from(10)).unwrap();

    let op = DispatchCode::Synthetic(SyntheticOpcode::PushAddInline);
    assert_eq!(op.step_count(), 2);

    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));

    // The mirror executes both primitive halves.
    mirror.step().unwrap();
    mirror.step().unwrap();

    let report = engine
        .after_instruction(op, &snapshot_of(&mirror, 1, GAS, 6))
        .expect("sync diverged");

    assert_eq!(report.gas_cost, 6);
    assert_eq!(engine.reference().stack().peek(0).unwrap(), U256::from(15));
    assert_eq!(engine.reference().pc(), 3);
    assert_eq!(engine.reference().gas_used(), 6);
}

#[test]
fn stack_mismatch_diverges() {
    let (mut engine, mut mirror) = engine_and_mirror(&[0x60, 0x07, 0x00], GAS);
    let op = DispatchCode::Primitive(Opcode::Push1);

    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();

    let mut fast = snapshot_of(&mirror, 1, GAS, 3);
    fast.stack_top[0] = U256::from(9);

    match engine.after_instruction(op, &fast) {
        Err(DivergenceError::StackMismatch { index, .. }) => assert_eq!(index, 0),
        other => panic!("expected stack mismatch, got {other:?}"),
    }
}

#[test]
fn stack_length_mismatch_diverges() {
    let (mut engine, mut mirror) = engine_and_mirror(&[0x60, 0x07, 0x00], GAS);
    let op = DispatchCode::Primitive(Opcode::Push1);

    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();

    let mut fast = snapshot_of(&mirror, 1, GAS, 3);
    fast.stack_len = 2;
    fast.stack_top.push(U256::zero());

    assert!(matches!(
        engine.after_instruction(op, &fast),
        Err(DivergenceError::StackMismatch { .. })
    ));
}

#[test]
fn gas_is_reconciled_only_at_block_boundaries() {
    // PUSH1 4, JUMP, INVALID, JUMPDEST, STOP
    let (mut engine, mut mirror) = engine_and_mirror(&[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00], GAS);

    // The fast interpreter batches: it reports no gas spent yet on the
    // PUSH, which must not trip the diff.
    let op = DispatchCode::Primitive(Opcode::Push1);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();
    let mut fast = snapshot_of(&mirror, 1, GAS, 0);
    fast.gas_remaining = GAS;
    let report = engine.after_instruction(op, &fast).expect("push diverged");
    assert!(!report.gas_checked);

    // JUMP is a boundary: now the batch must have settled to the exact
    // cumulative figure.
    let op = DispatchCode::Primitive(Opcode::Jump);
    engine.before_instruction(op, &snapshot_of(&mirror, 1, GAS, 3));
    mirror.step().unwrap();
    let report = engine
        .after_instruction(op, &snapshot_of(&mirror, 2, GAS, 11))
        .expect("jump diverged");
    assert!(report.gas_checked);
    assert_eq!(engine.expected_gas_used(), 11);
}

#[test]
fn gas_mismatch_at_boundary_diverges() {
    let (mut engine, mut mirror) = engine_and_mirror(&[0x5b, 0x00], GAS);

    let op = DispatchCode::Primitive(Opcode::Jumpdest);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();

    let mut fast = snapshot_of(&mirror, 1, GAS, 1);
    fast.gas_remaining = GAS;

    assert!(matches!(
        engine.after_instruction(op, &fast),
        Err(DivergenceError::GasMismatch { fast: 0, reference: 1 })
    ));
}

#[test]
fn terminal_stop_matches() {
    let (mut engine, mut mirror) = engine_and_mirror(&[0x00], GAS);

    let op = DispatchCode::Primitive(Opcode::Stop);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();

    let report = engine
        .after_complete(op, &snapshot_of(&mirror, 1, GAS, 0))
        .expect("halt diverged");

    assert_eq!(report.kind, HaltKind::Stopped);
    assert!(report.return_data.is_empty());
}

#[test]
fn halt_kind_mismatch_diverges() {
    let (mut engine, mut mirror) = engine_and_mirror(&[0x00], GAS);

    let op = DispatchCode::Primitive(Opcode::Stop);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();

    let mut fast = snapshot_of(&mirror, 1, GAS, 0);
    fast.halted = Some(HaltKind::Reverted);

    assert!(matches!(
        engine.after_complete(op, &fast),
        Err(DivergenceError::HaltMismatch { .. })
    ));
}

#[test]
fn return_data_mismatch_diverges() {
    // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
    let (mut engine, mut mirror) = engine_and_mirror(&code, GAS);

    for _ in 0..5 {
        let byte = mirror.bytecode().get(mirror.pc()).unwrap();
        let op = DispatchCode::from_raw(byte as u16).unwrap();
        let cursor = mirror.pc();
        engine.before_instruction(op, &snapshot_of(&mirror, cursor, GAS, mirror.gas_used()));
        mirror.step().unwrap();
        engine
            .after_instruction(op, &snapshot_of(&mirror, cursor + 1, GAS, mirror.gas_used()))
            .expect("prefix diverged");
    }

    let op = DispatchCode::Primitive(Opcode::Return);
    let cursor = mirror.pc();
    engine.before_instruction(op, &snapshot_of(&mirror, cursor, GAS, mirror.gas_used()));
    mirror.step().unwrap();

    let mut fast = snapshot_of(&mirror, cursor + 1, GAS, mirror.gas_used());
    fast.return_data = Some(Bytes::from_static(&[0xde, 0xad]));

    assert!(matches!(
        engine.after_complete(op, &fast),
        Err(DivergenceError::ReturnDataMismatch {
            fast_len: 2,
            reference_len: 32
        })
    ));
}

#[test]
fn reference_error_without_fast_failure_diverges() {
    // ADD on an empty stack fails in the reference; the mock fast
    // interpreter claims success.
    let (mut engine, mirror) = engine_and_mirror(&[0x01, 0x00], GAS);

    let op = DispatchCode::Primitive(Opcode::Add);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));

    assert!(matches!(
        engine.after_instruction(op, &snapshot_of(&mirror, 1, GAS, 3)),
        Err(DivergenceError::ErrorMismatch {
            reference: Some(ExecutionError::StackUnderflow),
            ..
        })
    ));
}

#[test]
fn matching_exceptional_halts_reconcile() {
    // Both sides run out of gas on the same instruction.
    let code = [0x60, 0x01, 0x60, 0x02, 0x00];
    let gas = 4;
    let (mut engine, mut mirror) = engine_and_mirror(&code, gas);

    let op = DispatchCode::Primitive(Opcode::Push1);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, gas, 0));
    mirror.step().unwrap();
    engine
        .after_instruction(op, &snapshot_of(&mirror, 1, gas, 3))
        .expect("first push diverged");

    engine.before_instruction(op, &snapshot_of(&mirror, 1, gas, 3));
    assert_eq!(mirror.step(), Err(ExecutionError::OutOfGas));

    let report = engine
        .after_complete(op, &snapshot_of(&mirror, 2, gas, gas))
        .expect("matching OOG should reconcile");

    assert_eq!(report.kind, HaltKind::Reverted);
    assert_eq!(report.gas_used, gas);
}

#[test]
fn static_jump_verification_catches_bad_targets() {
    // PUSH1 4, JUMP, INVALID, JUMPDEST, STOP
    let (mut engine, mut mirror) = engine_and_mirror(&[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00], GAS);

    // Analysis resolved the jump at offset 2, but to the wrong target.
    engine.pc_tracker_mut().note_static_jump(2, 3);

    let op = DispatchCode::Primitive(Opcode::Push1);
    engine.before_instruction(op, &snapshot_of(&mirror, 0, GAS, 0));
    mirror.step().unwrap();
    engine
        .after_instruction(op, &snapshot_of(&mirror, 1, GAS, 3))
        .expect("push diverged");

    let op = DispatchCode::Primitive(Opcode::Jump);
    engine.before_instruction(op, &snapshot_of(&mirror, 1, GAS, 3));
    mirror.step().unwrap();

    assert!(matches!(
        engine.after_instruction(op, &snapshot_of(&mirror, 2, GAS, 11)),
        Err(DivergenceError::StaticJumpMismatch {
            fast: 3,
            reference: 4
        })
    ));
}

#[test]
fn sstore_reports_the_slot_transition_and_cold_gas() {
    // PUSH1 1 (value), PUSH1 5 (slot), SSTORE, STOP
    let code = [0x60, 0x01, 0x60, 0x05, 0x55, 0x00];
    let (mut engine, mut mirror) = engine_and_mirror(&code, 100_000);

    for _ in 0..2 {
        let cursor = mirror.pc();
        let op = DispatchCode::Primitive(Opcode::Push1);
        engine.before_instruction(op, &snapshot_of(&mirror, cursor, 100_000, mirror.gas_used()));
        mirror.step().unwrap();
        engine
            .after_instruction(
                op,
                &snapshot_of(&mirror, cursor + 1, 100_000, mirror.gas_used()),
            )
            .expect("push diverged");
    }

    let op = DispatchCode::Primitive(Opcode::Sstore);
    engine.before_instruction(op, &snapshot_of(&mirror, 4, 100_000, mirror.gas_used()));
    mirror.step().unwrap();

    let report = engine
        .after_instruction(op, &snapshot_of(&mirror, 5, 100_000, mirror.gas_used()))
        .expect("sstore diverged");

    // Cold slot: 2100 surcharge plus the 20000 set cost.
    assert_eq!(report.gas_cost, 22_100);

    let change = report.storage_change.expect("no storage change reported");
    assert_eq!(change.slot, U256::from(5));
    assert_eq!(change.previous, U256::zero());
    assert_eq!(change.value, U256::from(1));

    let access = engine.reference().access_list();
    assert!(access
        .borrow()
        .is_warm_slot(&engine.reference().context().callee, &U256::from(5)));
}

#[test]
fn create_with_host_reported_address_stays_in_lockstep() {
    // PUSH1 0 (len), PUSH1 0 (offset), PUSH1 0 (value), CREATE, STOP
    let code = [0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xf0, 0x00];
    let (mut engine, mut mirror) = engine_and_mirror(&code, GAS);
    let created = H160::repeat_byte(0xca);

    for _ in 0..3 {
        let cursor = mirror.pc();
        let op = DispatchCode::Primitive(Opcode::Push1);
        engine.before_instruction(op, &snapshot_of(&mirror, cursor, GAS, mirror.gas_used()));
        mirror.step().unwrap();
        engine
            .after_instruction(op, &snapshot_of(&mirror, cursor + 1, GAS, mirror.gas_used()))
            .expect("push diverged");
    }

    // The host ran the init frame and reported the deployment to both
    // sides, the way the tracer seeds the reference on on_call_complete.
    let outcome = CallOutcome {
        success: true,
        return_data: Bytes::new(),
        created,
    };
    engine.reference_mut().set_call_outcome(outcome.clone());
    mirror.set_call_outcome(outcome);

    let op = DispatchCode::Primitive(Opcode::Create);
    engine.before_instruction(op, &snapshot_of(&mirror, 6, GAS, mirror.gas_used()));
    mirror.step().unwrap();

    engine
        .after_instruction(op, &snapshot_of(&mirror, 7, GAS, mirror.gas_used()))
        .expect("create diverged");

    assert_eq!(
        engine.reference().stack().peek(0).unwrap(),
        U256::from_big_endian(created.as_bytes())
    );
}

#[test]
fn create_address_disagreement_diverges() {
    let code = [0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xf0, 0x00];
    let (mut engine, mut mirror) = engine_and_mirror(&code, GAS);

    for _ in 0..3 {
        let cursor = mirror.pc();
        let op = DispatchCode::Primitive(Opcode::Push1);
        engine.before_instruction(op, &snapshot_of(&mirror, cursor, GAS, mirror.gas_used()));
        mirror.step().unwrap();
        engine
            .after_instruction(op, &snapshot_of(&mirror, cursor + 1, GAS, mirror.gas_used()))
            .expect("push diverged");
    }

    // Only the mirror learns the real address; the reference was never
    // seeded and falls back to zero.
    mirror.set_call_outcome(CallOutcome {
        success: true,
        return_data: Bytes::new(),
        created: H160::repeat_byte(0xca),
    });

    let op = DispatchCode::Primitive(Opcode::Create);
    engine.before_instruction(op, &snapshot_of(&mirror, 6, GAS, mirror.gas_used()));
    mirror.step().unwrap();

    assert!(matches!(
        engine.after_instruction(op, &snapshot_of(&mirror, 7, GAS, mirror.gas_used())),
        Err(DivergenceError::StackMismatch { index: 0, .. })
    ));
}

#[test]
fn unknown_dispatch_code_is_not_guessed() {
    assert!(DispatchCode::from_raw(0x1ff).is_none());
}
