//! The seam between consensus validation and script execution.
//!
//! Script execution is a substantial subsystem in its own right, and the
//! validators treat it as a black box: the only property they rely on is
//! that execution is deterministic for a given transaction, input index,
//! and pay-to-script-hash flag. The embedding peer supplies the engine.

use bittern_chain::{transaction::Transaction, transparent::Script};

/// A deterministic script execution engine.
///
/// Implemented by the peer's script interpreter. Closures with the matching
/// signature also implement this trait, which keeps tests and prototypes
/// short.
pub trait ScriptEngine: Send + Sync {
    /// Execute `lock_script` against `unlock_script` for the input
    /// `input_index` of `transaction`.
    ///
    /// `bip16_active` selects pay-to-script-hash evaluation. Returns whether
    /// the spend is authorized.
    fn run(
        &self,
        lock_script: &Script,
        unlock_script: &Script,
        transaction: &Transaction,
        input_index: usize,
        bip16_active: bool,
    ) -> bool;
}

impl<F> ScriptEngine for F
where
    F: Fn(&Script, &Script, &Transaction, usize, bool) -> bool + Send + Sync,
{
    fn run(
        &self,
        lock_script: &Script,
        unlock_script: &Script,
        transaction: &Transaction,
        input_index: usize,
        bip16_active: bool,
    ) -> bool {
        self(
            lock_script,
            unlock_script,
            transaction,
            input_index,
            bip16_active,
        )
    }
}
