//! Context-free transaction checks, shared by mempool admission and block
//! verification.

use bittern_chain::{amount::MAX_MONEY, transaction::Transaction};

use crate::error::TransactionError;

/// Check the rules a transaction must satisfy on its own, with no chain or
/// mempool context:
///
///   - it has at least one input and one output,
///   - no output value, and no running sum of output values, exceeds the
///     money range,
///   - a coinbase unlock script serializes to 2 to 100 bytes, and
///   - no non-coinbase input references the null outpoint.
pub fn check_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(TransactionError::Empty);
    }

    // The running check keeps the sum within the money range after every
    // addition, so the `u64` accumulator cannot overflow.
    let mut total_output_value: u64 = 0;
    for output in &tx.outputs {
        if output.value > MAX_MONEY {
            return Err(TransactionError::OutputValueOverflow);
        }
        total_output_value += output.value;
        if total_output_value > MAX_MONEY {
            return Err(TransactionError::OutputValueOverflow);
        }
    }

    if tx.is_coinbase() {
        let coinbase_script_size = tx.inputs[0].unlock_script.as_raw_bytes().len();
        if !(2..=100).contains(&coinbase_script_size) {
            return Err(TransactionError::InvalidCoinbaseScriptSize);
        }
    } else {
        for input in &tx.inputs {
            if input.outpoint.is_null() {
                return Err(TransactionError::PreviousOutputNull);
            }
        }
    }

    Ok(())
}

/// Check the local standardness policy.
///
/// Placeholder: every transaction is currently standard. The rejection
/// exists so policy can be added without changing the admission pipeline.
pub fn is_standard(_tx: &Transaction) -> Result<(), TransactionError> {
    Ok(())
}

/// Add the fee paid by `tx` to `total_fees`, given the value consumed by
/// its inputs.
///
/// Returns the new fee total, or `None` when the transaction spends more
/// than it consumes or the total leaves the money range.
pub fn tally_fees(tx: &Transaction, value_in: u64, total_fees: u64) -> Option<u64> {
    let value_out = tx.outputs_value();
    if (value_in as u128) < value_out {
        return None;
    }
    let fee = value_in - value_out as u64;
    let total_fees = total_fees.checked_add(fee)?;
    if total_fees > MAX_MONEY {
        return None;
    }
    Some(total_fees)
}
