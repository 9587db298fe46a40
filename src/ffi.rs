//! C ABI for embedding the reference interpreter
//!
//! An opaque handle wraps one [`Interpreter`] instance. Every entry point
//! validates the handle (non-null, correctly aligned) before touching it;
//! invalid handles make the call a no-op with a failure return where the
//! signature allows one. All multi-byte integers at this boundary are
//! 32-byte big-endian arrays.

use std::slice;

use bytes::Bytes;
use primitive_types::{H160, U256};

use crate::arith;
use crate::interpreter::Interpreter;
use crate::storage::{InterpreterStorage, MemoryStorage};

/// Opaque handle to a reference-interpreter instance.
pub type Handle = *mut Interpreter<MemoryStorage>;

fn valid(handle: Handle) -> bool {
    !handle.is_null() && (handle as usize) % std::mem::align_of::<Interpreter<MemoryStorage>>() == 0
}

unsafe fn borrow<'a>(handle: Handle) -> Option<&'a mut Interpreter<MemoryStorage>> {
    if valid(handle) {
        Some(&mut *handle)
    } else {
        None
    }
}

unsafe fn read_word(ptr: *const u8) -> U256 {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(slice::from_raw_parts(ptr, 32));

    arith::from_be_bytes(&buf)
}

unsafe fn write_word(value: U256, out: *mut u8) {
    let buf = arith::to_be_bytes(value);

    slice::from_raw_parts_mut(out, 32).copy_from_slice(&buf);
}

unsafe fn read_address(ptr: *const u8) -> H160 {
    H160::from_slice(slice::from_raw_parts(ptr, 20))
}

/// Create an interpreter over a copy of `bytecode_ptr[..bytecode_len]`.
///
/// # Safety
///
/// `bytecode_ptr` must be readable for `bytecode_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_create(
    bytecode_ptr: *const u8,
    bytecode_len: usize,
    gas_limit: u64,
) -> Handle {
    let code = if bytecode_ptr.is_null() || bytecode_len == 0 {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(slice::from_raw_parts(bytecode_ptr, bytecode_len))
    };

    Box::into_raw(Box::new(Interpreter::init(code, gas_limit)))
}

/// Destroy a handle. Null handles are ignored.
///
/// # Safety
///
/// `handle` must come from [`evm_ref_create`] and not be destroyed twice.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_destroy(handle: Handle) {
    if valid(handle) {
        drop(Box::from_raw(handle));
    }
}

/// Set the immutable call-frame fields.
///
/// # Safety
///
/// `caller` and `callee` must be readable for 20 bytes, `value` for 32,
/// `calldata_ptr` for `calldata_len`.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_set_call_context(
    handle: Handle,
    caller: *const u8,
    callee: *const u8,
    value: *const u8,
    calldata_ptr: *const u8,
    calldata_len: usize,
) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if caller.is_null() || callee.is_null() || value.is_null() {
        return false;
    }

    let calldata = if calldata_ptr.is_null() || calldata_len == 0 {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(slice::from_raw_parts(calldata_ptr, calldata_len))
    };

    vm.set_call_context(
        read_address(caller),
        read_address(callee),
        read_word(value),
        calldata,
    );

    true
}

/// Execute one opcode. Returns `true` while the machine keeps running,
/// `false` on halt or error.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_step(handle: Handle) -> bool {
    match borrow(handle) {
        Some(vm) => matches!(vm.step(), Ok(state) if state.should_continue()),
        None => false,
    }
}

/// Run to halt. Returns `true` when the frame stopped normally.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_execute(handle: Handle) -> bool {
    match borrow(handle) {
        Some(vm) => matches!(vm.execute(), Ok(state) if !state.should_revert()),
        None => false,
    }
}

/// Current program counter.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_pc(handle: Handle) -> u64 {
    borrow(handle).map(|vm| vm.pc() as u64).unwrap_or_default()
}

/// Remaining gas.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_gas_remaining(handle: Handle) -> u64 {
    borrow(handle).map(|vm| vm.gas_remaining()).unwrap_or_default()
}

/// Gas consumed since frame start.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_gas_used(handle: Handle) -> u64 {
    borrow(handle).map(|vm| vm.gas_used()).unwrap_or_default()
}

/// Whether the frame halted normally.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_stopped(handle: Handle) -> bool {
    borrow(handle)
        .map(|vm| matches!(vm.status(), crate::state::ExecutionStatus::Stopped))
        .unwrap_or_default()
}

/// Whether the frame reverted.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_reverted(handle: Handle) -> bool {
    borrow(handle)
        .map(|vm| matches!(vm.status(), crate::state::ExecutionStatus::Reverted))
        .unwrap_or_default()
}

/// Number of words on the stack.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_stack_size(handle: Handle) -> u64 {
    borrow(handle).map(|vm| vm.stack().len() as u64).unwrap_or_default()
}

/// Memory length in bytes.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_memory_size(handle: Handle) -> u64 {
    borrow(handle).map(|vm| vm.memory().len() as u64).unwrap_or_default()
}

/// Copy the stack word `index_from_top` below the top into `out`.
///
/// # Safety
///
/// `handle` must be live; `out` must be writable for 32 bytes.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_get_stack_item(
    handle: Handle,
    index_from_top: u64,
    out: *mut u8,
) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if out.is_null() {
        return false;
    }

    match vm.stack().peek(index_from_top as usize) {
        Ok(word) => {
            write_word(word, out);

            true
        }
        Err(_) => false,
    }
}

/// Read one memory byte; zero out of range.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_read_memory(handle: Handle, offset: u64) -> u8 {
    borrow(handle)
        .and_then(|vm| vm.memory().get(offset as usize).copied())
        .unwrap_or_default()
}

/// Read a 32-byte memory word into `out`, zero-padded past the end.
///
/// # Safety
///
/// `handle` must be live; `out` must be writable for 32 bytes.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_read_memory_word(
    handle: Handle,
    offset: u64,
    out: *mut u8,
) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if out.is_null() {
        return false;
    }

    let memory = vm.memory();
    let mut buf = [0u8; 32];

    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = memory
            .get(offset as usize + i)
            .copied()
            .unwrap_or_default();
    }

    slice::from_raw_parts_mut(out, 32).copy_from_slice(&buf);

    true
}

/// Push a word read from `input`.
///
/// # Safety
///
/// `handle` must be live; `input` must be readable for 32 bytes.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_push_stack(handle: Handle, input: *const u8) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if input.is_null() {
        return false;
    }

    vm.push_external(read_word(input)).is_ok()
}

/// Pop the top word into `out`.
///
/// # Safety
///
/// `handle` must be live; `out` must be writable for 32 bytes.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_pop_stack(handle: Handle, out: *mut u8) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if out.is_null() {
        return false;
    }

    match vm.pop_external() {
        Ok(word) => {
            write_word(word, out);

            true
        }
        Err(_) => false,
    }
}

/// Read a persistent storage slot into `out`.
///
/// # Safety
///
/// `handle` must be live; `address` readable for 20 bytes, `slot` for 32,
/// `out` writable for 32.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_read_storage(
    handle: Handle,
    address: *const u8,
    slot: *const u8,
    out: *mut u8,
) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if address.is_null() || slot.is_null() || out.is_null() {
        return false;
    }

    let value = vm
        .storage()
        .storage_read(&read_address(address), &read_word(slot));

    write_word(value, out);

    true
}

/// Write a persistent storage slot.
///
/// # Safety
///
/// `handle` must be live; `address` readable for 20 bytes, `slot` and
/// `value` for 32.
#[no_mangle]
pub unsafe extern "C" fn evm_ref_write_storage(
    handle: Handle,
    address: *const u8,
    slot: *const u8,
    value: *const u8,
) -> bool {
    let vm = match borrow(handle) {
        Some(vm) => vm,
        None => return false,
    };

    if address.is_null() || slot.is_null() || value.is_null() {
        return false;
    }

    vm.storage_mut()
        .storage_write(&read_address(address), &read_word(slot), read_word(value));

    true
}
