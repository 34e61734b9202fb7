//! Fault injector that acts on the current process
//!
//! Every terminating code either traps in hardware or delivers a signal to
//! this process. The description line is flushed to stdout first so the
//! harness log shows the intended failure even when the process dies.

use std::io::Write;

use nix::sys::signal::{self, SigHandler, Signal};
use shared::FaultCode;

use crate::error::{InjectorError, InjectorResult};
use crate::fault::FaultSignal;
use crate::traits::{FaultInjector, FaultOutcome};

/// Real fault injector for fixture binaries
#[derive(Debug, Default)]
pub struct ProcessFaultInjector;

impl ProcessFaultInjector {
    pub fn new() -> Self {
        Self
    }

    /// Raise the signal mapped to `code` in the calling thread
    pub fn raise(&self, code: FaultCode) -> InjectorResult<()> {
        let signal = code
            .signal()
            .ok_or(InjectorError::NotASignal { code: code.into() })?;

        // std's stack overflow handlers return on a SIGSEGV/SIGBUS that did not come from a fault
        if matches!(signal, Signal::SIGSEGV | Signal::SIGBUS) {
            restore_default(signal)?;
        }
        send_to_self(signal)
    }
}

impl FaultInjector for ProcessFaultInjector {
    fn inject(&self, code: FaultCode) -> FaultOutcome {
        println!("{}", code.description());
        let _ = std::io::stdout().flush();

        match code {
            FaultCode::Unrecognized(raw) => {
                tracing::info!("No fault mapped to code {}, continuing", raw);
                return FaultOutcome::Survived;
            }
            FaultCode::NullDereference => {
                tracing::warn!("💀 Reading through the null page");
                null_page_read();
            }
            FaultCode::DivideByZero => {
                tracing::warn!("💀 Dividing by zero");
                divide_by_zero();
            }
            _ => {
                tracing::warn!("💀 Raising signal for fault code {}", code);
                if let Err(e) = self.raise(code) {
                    tracing::error!("❌ Fault injection failed: {}", e);
                }
            }
        }

        // Only reachable when the fault was handled or ignored
        tracing::warn!("⚠️ Process survived fault code {}", code);
        FaultOutcome::Survived
    }
}

/// Deliver to the calling thread, so the signal has acted before this returns
fn send_to_self(signal: Signal) -> InjectorResult<()> {
    signal::raise(signal).map_err(|source| InjectorError::SignalDelivery { signal, source })
}

fn restore_default(signal: Signal) -> InjectorResult<()> {
    // SAFETY: installs SIG_DFL, no handler code runs
    unsafe { signal::signal(signal, SigHandler::SigDfl) }
        .map(|_| ())
        .map_err(|source| InjectorError::HandlerReset { signal, source })
}

/// Volatile read of an address inside the unmapped first page
fn null_page_read() {
    // Non-null and aligned, so it reaches the MMU instead of a debug check
    let address = std::hint::black_box(std::ptr::null::<i32>()).wrapping_add(1);
    // SAFETY: none. Faulting here is the purpose of this code path.
    let value = unsafe { std::ptr::read_volatile(address) };
    println!("{value}");
}

/// Hardware integer division by zero (#DE, delivered as SIGFPE)
#[cfg(target_arch = "x86_64")]
fn divide_by_zero() {
    let dividend: i32 = std::hint::black_box(937_493);
    let divisor: i32 = std::hint::black_box(0);
    // SAFETY: registers are declared; the trap is the purpose of this code path.
    unsafe {
        std::arch::asm!(
            "cdq",
            "idiv {divisor:e}",
            divisor = in(reg) divisor,
            inout("eax") dividend => _,
            out("edx") _,
            options(nomem, nostack),
        );
    }
}

/// Integer division does not trap on this architecture, raise the same signal instead
#[cfg(not(target_arch = "x86_64"))]
fn divide_by_zero() {
    if let Err(e) = send_to_self(Signal::SIGFPE) {
        tracing::error!("❌ Fault injection failed: {}", e);
    }
}
