//! Process lifecycle: the shared run flag and OS shutdown signals

mod run_flag;
mod shutdown;

pub use run_flag::RunFlag;
pub use shutdown::ShutdownSignal;
