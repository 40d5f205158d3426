/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! Early termination by an external process.
//!
//! An observer can stop the benchmark at any time with `SIGUSR1` or
//! `SIGTERM`. The handler cancels the run, closes the benchmark log, creates
//! the done sentinel, and exits the process immediately.
//!
//! The handler may interrupt the lookups on any thread. It only reads state
//! that is prepared at installation, and never touches the hash table or the
//! outer table. All functions called inside the handler are async-signal-safe,
//! i.e., `write`, `open`, `close`, and `_exit`.

use crate::error::{ErrorKind, Result};
use crate::lifecycle::{CancellationToken, SentinelFiles};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;

/// Signals that terminate the benchmark.
pub const TERMINATION_SIGNALS: [Signal; 2] = [Signal::SIGUSR1, Signal::SIGTERM];

const SENTINEL_ERROR: &[u8] = b"ERROR: could not create the shared memory file descriptor\n";

struct HandlerState {
    done_path: CString,
    log_fd: RawFd,
    token: CancellationToken,
}

static HANDLER_STATE: OnceCell<HandlerState> = OnceCell::new();

/// Installs the termination handler for `TERMINATION_SIGNALS`.
///
/// `log_fd` must stay open for the lifetime of the process. The handler can
/// only be installed once per process.
pub fn install_termination_handler(
    sentinels: &SentinelFiles,
    token: CancellationToken,
    log_fd: RawFd,
) -> Result<()> {
    let done_path = CString::new(sentinels.done_path().as_os_str().as_bytes()).map_err(|_| {
        ErrorKind::InvalidArgument(format!(
            "Sentinel path {} contains a nul byte",
            sentinels.done_path().display()
        ))
    })?;

    HANDLER_STATE
        .set(HandlerState {
            done_path,
            log_fd,
            token,
        })
        .map_err(|_| {
            ErrorKind::RuntimeError("Termination handler is already installed".to_string())
        })?;

    let action = SigAction::new(
        SigHandler::Handler(handle_termination),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for &sig in TERMINATION_SIGNALS.iter() {
        unsafe { signal::sigaction(sig, &action) }?;
    }

    Ok(())
}

extern "C" fn handle_termination(sig: libc::c_int) {
    let state = match HANDLER_STATE.get() {
        Some(state) => state,
        None => unsafe { libc::_exit(1) },
    };

    state.token.cancel();

    let mut msg = [0_u8; 64];
    let len = caught_message(sig, &mut msg);
    write_all(state.log_fd, &msg[..len]);

    let fd = unsafe {
        libc::open(
            state.done_path.as_ptr(),
            libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC | libc::O_CLOEXEC,
            0o644 as libc::c_uint,
        )
    };
    if fd < 0 {
        write_all(libc::STDERR_FILENO, SENTINEL_ERROR);
        unsafe { libc::_exit(1) };
    }
    unsafe { libc::close(fd) };

    write_all(state.log_fd, b"</benchmark>\n");

    unsafe { libc::_exit(0) };
}

/// Writes `<sig>Signal N caught!</sig>` without allocating.
fn caught_message(sig: libc::c_int, buf: &mut [u8; 64]) -> usize {
    const PREFIX: &[u8] = b"<sig>Signal ";
    const SUFFIX: &[u8] = b" caught!</sig>\n";

    let mut digits = [0_u8; 10];
    let mut count = 0;
    let mut n = sig as u32;
    loop {
        digits[count] = b'0' + (n % 10) as u8;
        n /= 10;
        count += 1;
        if n == 0 {
            break;
        }
    }

    let mut len = 0;
    for &byte in PREFIX
        .iter()
        .chain(digits[..count].iter().rev())
        .chain(SUFFIX.iter())
    {
        buf[len] = byte;
        len += 1;
    }
    len
}

fn write_all(fd: RawFd, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let written =
            unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        if written <= 0 {
            return;
        }
        bytes = &bytes[written as usize..];
    }
}
