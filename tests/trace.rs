use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use bytes::Bytes;
use serde_json::Value;

use evm_tracer::prelude::*;

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn lines(&self) -> Vec<Value> {
        let buf = self.0.borrow();
        let text = std::str::from_utf8(&buf).expect("stream is not UTF-8");

        text.lines()
            .map(|line| serde_json::from_str(line).expect("line is not valid JSON"))
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn snapshot(fast: &Interpreter) -> FastSnapshot {
    FastSnapshot {
        cursor: fast.pc(),
        pc: fast.pc(),
        gas_remaining: fast.gas_remaining(),
        stack_len: fast.stack().len(),
        stack_top: fast.stack().as_slice().iter().rev().copied().collect(),
        memory_len: fast.memory().len(),
        memory: Some(Bytes::copy_from_slice(fast.memory())),
        halted: fast.status().halt_kind(),
        return_data: Some(fast.return_data().clone()),
    }
}

/// Drive the tracer the way the fast interpreter would, using a second
/// reference machine as the stand-in fast side.
fn drive(tracer: &mut DefaultTracer, code: &[u8], gas: u64) {
    let code = Bytes::copy_from_slice(code);

    tracer.prepare_frame(code.clone(), CallContext::default());
    tracer.on_frame_start(code.len(), gas, 0);

    let mut fast = Interpreter::init(code, gas);

    loop {
        let byte = match fast.bytecode().get(fast.pc()) {
            Some(byte) => byte,
            None => break,
        };
        let op = byte as u16;
        let opcode = Opcode::from_u8(byte).expect("test programs use assigned opcodes");

        tracer.before_instruction(op, &snapshot(&fast));

        let result = fast.step();
        let post = snapshot(&fast);

        if opcode.is_terminal() {
            tracer.after_complete(op, &post);
            break;
        }

        match result {
            Ok(state) if state.should_continue() => tracer.after_instruction(op, &post),
            _ => {
                tracer.after_complete(op, &post);
                break;
            }
        }
    }

    let output_len = fast.return_data().len();
    tracer.on_frame_complete(fast.gas_remaining(), output_len);
}

fn types(lines: &[Value]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line["type"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn add_program_emits_ordered_instruction_events() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    drive(&mut tracer, &[0x60, 0x03, 0x60, 0x04, 0x01, 0x00], 1_000);

    let lines = buf.lines();
    let steps: Vec<&Value> = lines
        .iter()
        .filter(|line| line["type"] == "step")
        .collect();

    let names: Vec<&str> = steps
        .iter()
        .map(|step| step["data"]["op_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["PUSH1", "PUSH1", "ADD", "STOP"]);

    let last = lines.last().unwrap();
    assert_eq!(last["type"], "execution_end");
    assert_eq!(last["data"]["status"], "stopped");
    assert_eq!(last["data"]["gas_used"], "0x9");

    assert!(!tracer.is_divergent());
}

#[test]
fn timestamps_are_monotonic_and_lines_parse_independently() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    drive(&mut tracer, &[0x60, 0x03, 0x60, 0x04, 0x01, 0x00], 1_000);

    let lines = buf.lines();
    assert!(!lines.is_empty());

    let mut last = 0u64;
    for line in &lines {
        let ts = line["timestamp"].as_u64().expect("timestamp missing");
        assert!(ts >= last);
        last = ts;
    }
}

#[test]
fn word_encoding_is_minimal_hex() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    // PUSH1 0, STOP
    drive(&mut tracer, &[0x60, 0x00, 0x00], 1_000);

    let lines = buf.lines();
    let step = lines
        .iter()
        .find(|line| line["type"] == "step" && line["data"]["op_name"] == "STOP")
        .unwrap();

    assert_eq!(step["data"]["stack"][0], "0x0");
}

#[test]
fn stack_filter_caps_and_disables() {
    let mut filters = EventFilters::default();
    filters.max_stack_items = 1;

    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), filters);

    // PUSH1 1, PUSH1 2, PUSH1 3, STOP
    drive(&mut tracer, &[0x60, 0x01, 0x60, 0x02, 0x60, 0x03, 0x00], 1_000);

    let lines = buf.lines();
    let step = lines
        .iter()
        .find(|line| line["type"] == "step" && line["data"]["op_name"] == "STOP")
        .unwrap();

    // Capped to the top item, which is the last value pushed.
    assert_eq!(step["data"]["stack"].as_array().unwrap().len(), 1);
    assert_eq!(step["data"]["stack"][0], "0x3");

    let mut filters = EventFilters::default();
    filters.include_stack = false;

    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), filters);

    drive(&mut tracer, &[0x60, 0x01, 0x00], 1_000);

    for line in buf.lines() {
        if line["type"] == "step" {
            assert!(line["data"].get("stack").is_none());
        }
    }
}

#[test]
fn event_type_filter_suppresses_emission() {
    let mut filters = EventFilters::default();
    filters.disable(EventKind::Step);

    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), filters);

    drive(&mut tracer, &[0x60, 0x01, 0x00], 1_000);

    let kinds = types(&buf.lines());
    assert!(!kinds.iter().any(|kind| kind == "step"));
    assert!(kinds.iter().any(|kind| kind == "execution_end"));
}

#[test]
fn revert_emits_revert_event_and_status() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    // PUSH1 0, PUSH1 0, REVERT
    drive(&mut tracer, &[0x60, 0x00, 0x60, 0x00, 0xfd], 1_000);

    let lines = buf.lines();
    let kinds = types(&lines);

    assert!(kinds.iter().any(|kind| kind == "revert"));

    let last = lines.last().unwrap();
    assert_eq!(last["data"]["status"], "reverted");
}

#[test]
fn sstore_emits_storage_change_with_pre_and_post() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    // PUSH1 1, PUSH1 5, SSTORE, STOP
    drive(&mut tracer, &[0x60, 0x01, 0x60, 0x05, 0x55, 0x00], 100_000);

    let lines = buf.lines();
    let change = lines
        .iter()
        .find(|line| line["type"] == "storage_change")
        .expect("no storage_change event");

    assert_eq!(change["data"]["slot"], "0x5");
    assert_eq!(change["data"]["previous"], "0x0");
    assert_eq!(change["data"]["value"], "0x1");

    // The reference warmed the slot while replaying.
    let access = tracer.reference_access_list();
    assert_eq!(access.borrow().slot_count(), 1);
}

#[test]
fn log_opcode_emits_log_event() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    // PUSH1 0xAA (topic), PUSH1 0 (len), PUSH1 0 (offset), LOG1, STOP
    drive(
        &mut tracer,
        &[0x60, 0xaa, 0x60, 0x00, 0x60, 0x00, 0xa1, 0x00],
        100_000,
    );

    let lines = buf.lines();
    let log = lines
        .iter()
        .find(|line| line["type"] == "log")
        .expect("no log event");

    assert_eq!(log["data"]["topics"][0], "0xaa");
}

#[test]
fn divergence_marks_subsequent_events() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    let reported = Rc::new(RefCell::new(0usize));
    let seen = reported.clone();
    tracer.set_divergence_handler(Box::new(move |_| {
        *seen.borrow_mut() += 1;
    }));

    let code = Bytes::from_static(&[0x60, 0x07, 0x00]);
    tracer.prepare_frame(code.clone(), CallContext::default());
    tracer.on_frame_start(code.len(), 1_000, 0);

    let mut fast = Interpreter::init(code, 1_000);
    tracer.before_instruction(0x60, &snapshot(&fast));
    fast.step().unwrap();

    // The mock fast side lies about the pushed value.
    let mut post = snapshot(&fast);
    post.stack_top[0] = U256::from(9);
    tracer.after_instruction(0x60, &post);

    assert!(tracer.is_divergent());
    assert_eq!(*reported.borrow(), 1);

    // STOP still gets traced, marked divergent.
    tracer.before_instruction(0x00, &snapshot(&fast));
    fast.step().unwrap();
    tracer.after_complete(0x00, &snapshot(&fast));
    tracer.on_frame_complete(fast.gas_remaining(), 0);

    let lines = buf.lines();
    let end = lines.last().unwrap();
    assert_eq!(end["type"], "execution_end");
    assert_eq!(end["divergent"], true);
}

#[test]
fn persistent_write_failure_degrades_without_stopping_validation() {
    let mut tracer = DefaultTracer::new(Box::new(FailingSink), EventFilters::default());

    drive(&mut tracer, &[0x60, 0x03, 0x60, 0x04, 0x01, 0x00], 1_000);

    assert_eq!(
        tracer.writer().map(EventWriter::state),
        Some(WriterState::Degraded)
    );
    assert!(tracer.writer().map(EventWriter::dropped).unwrap_or_default() > 0);
    // Validation kept running to the end without divergence.
    assert!(!tracer.is_divergent());
}

#[test]
fn validation_only_tracer_emits_nothing_and_still_validates() {
    let mut tracer = DefaultTracer::validation_only();

    drive(&mut tracer, &[0x60, 0x03, 0x60, 0x04, 0x01, 0x00], 1_000);

    assert!(tracer.writer().is_none());
    assert!(!tracer.is_divergent());
}

#[test]
fn deinit_is_idempotent() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    drive(&mut tracer, &[0x00], 1_000);

    tracer.deinit();
    tracer.deinit();

    assert!(tracer.writer().is_none());
}

#[test]
fn create2_carries_the_host_reported_address() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());
    let created = H160::repeat_byte(0xca);

    // PUSH1 0 (salt), PUSH1 0 (len), PUSH1 0 (offset), PUSH1 0 (value),
    // CREATE2, STOP
    let code = Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xf5, 0x00]);

    tracer.prepare_frame(code.clone(), CallContext::default());
    tracer.on_frame_start(code.len(), 100_000, 0);

    let mut fast = Interpreter::init(code, 100_000);

    for _ in 0..4 {
        tracer.before_instruction(0x60, &snapshot(&fast));
        fast.step().unwrap();
        tracer.after_instruction(0x60, &snapshot(&fast));
    }

    // The host runs the init frame and reports the deployment before the
    // parent's after_instruction arrives.
    tracer.before_instruction(0xf5, &snapshot(&fast));
    tracer.on_call_start(1, created, U256::zero(), &Bytes::new(), 50_000);
    tracer.on_call_complete(1, true, 50_000, &Bytes::new(), Some(created));

    // The mock fast side observed the same deployment.
    fast.set_call_outcome(CallOutcome {
        success: true,
        return_data: Bytes::new(),
        created,
    });
    fast.step().unwrap();
    tracer.after_instruction(0xf5, &snapshot(&fast));

    tracer.before_instruction(0x00, &snapshot(&fast));
    fast.step().unwrap();
    tracer.after_complete(0x00, &snapshot(&fast));
    tracer.on_frame_complete(fast.gas_remaining(), 0);

    assert!(!tracer.is_divergent());

    let lines = buf.lines();
    let create_step = lines
        .iter()
        .find(|line| line["type"] == "step" && line["data"]["op_name"] == "CREATE2")
        .expect("no CREATE2 step event");

    let expected = format!("0x{}", "ca".repeat(20));
    assert_eq!(create_step["data"]["stack"][0], expected.as_str());

    let kinds = types(&lines);
    assert!(kinds.iter().any(|kind| kind == "call_enter"));
    assert!(kinds.iter().any(|kind| kind == "call_exit"));
}

#[test]
fn abort_emits_aborted_end_on_next_callback() {
    let buf = SharedBuf::default();
    let mut tracer = DefaultTracer::new(Box::new(buf.clone()), EventFilters::default());

    let code = Bytes::from_static(&[0x60, 0x01, 0x00]);
    tracer.prepare_frame(code.clone(), CallContext::default());
    tracer.on_frame_start(code.len(), 1_000, 0);

    tracer.abort();

    let fast = Interpreter::init(code, 1_000);
    tracer.before_instruction(0x60, &snapshot(&fast));

    let lines = buf.lines();
    let last = lines.last().unwrap();
    assert_eq!(last["type"], "execution_end");
    assert_eq!(last["data"]["status"], "aborted");

    // Further callbacks are ignored.
    tracer.before_instruction(0x60, &snapshot(&fast));
    assert_eq!(buf.lines().len(), lines.len());
}
