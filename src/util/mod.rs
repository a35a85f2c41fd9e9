//! Shared utilities

pub mod cancel;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod dym;
pub mod fs;
pub mod hash;
pub mod interning;
pub mod process;
pub mod shlex;
pub mod siphash;

pub use cancel::{AtomicCancellationSource, CancellationSource, NeverCancelled};
pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use interning::InternedString;
pub use siphash::{abi_fingerprint, prune_cosmetic_flags};
