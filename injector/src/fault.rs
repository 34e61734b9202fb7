//! Mapping from fault codes to the OS signals they produce

use nix::sys::signal::Signal;
use shared::FaultCode;

/// Signal-related views of a [`FaultCode`]
pub trait FaultSignal {
    /// Signal sent to the current process for codes 2..=11
    fn signal(&self) -> Option<Signal>;

    /// Signal an observer should see the process die from, `None` for the no-op
    fn expected_termination(&self) -> Option<Signal>;
}

impl FaultSignal for FaultCode {
    fn signal(&self) -> Option<Signal> {
        match self {
            FaultCode::FloatingPointException => Some(Signal::SIGFPE),
            FaultCode::IllegalInstruction => Some(Signal::SIGILL),
            FaultCode::SegmentationViolation => Some(Signal::SIGSEGV),
            FaultCode::BusError => Some(Signal::SIGBUS),
            FaultCode::Abort => Some(Signal::SIGABRT),
            FaultCode::Hangup => Some(Signal::SIGHUP),
            FaultCode::Interrupt => Some(Signal::SIGINT),
            FaultCode::Quit => Some(Signal::SIGQUIT),
            FaultCode::Terminate => Some(Signal::SIGTERM),
            FaultCode::Kill => Some(Signal::SIGKILL),
            FaultCode::NullDereference | FaultCode::DivideByZero | FaultCode::Unrecognized(_) => None,
        }
    }

    fn expected_termination(&self) -> Option<Signal> {
        match self {
            FaultCode::NullDereference => Some(Signal::SIGSEGV),
            FaultCode::DivideByZero => Some(Signal::SIGFPE),
            other => other.signal(),
        }
    }
}
