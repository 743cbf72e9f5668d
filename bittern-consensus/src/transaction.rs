//! Asynchronous verification of loose transactions for mempool admission.
//!
//! A loose transaction is checked against two sources of context: the best
//! chain, reached through the asynchronous chain oracle, and a read-only
//! snapshot of the mempool. The verifier suspends only at its oracle
//! queries; all of its per-call state (the current input cursor, the
//! accumulated input value, and the unconfirmed-parent list) lives in a
//! single owning task, so no locks are needed.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::FutureExt;
use tower::{Service, ServiceExt};
use tracing::Instrument;

use bittern_chain::{
    amount::MAX_MONEY,
    block,
    transaction::Transaction,
};
use bittern_state as bs;

use crate::{
    error::{TransactionError, VerifyTransactionError},
    mempool,
    parameters::COINBASE_MATURITY,
    script::ScriptEngine,
};

pub mod check;


/// Asynchronous transaction verification.
///
/// # Correctness
///
/// Transaction verification requests should be wrapped in a timeout, so
/// that out-of-order and invalid requests do not hang indefinitely. The
/// oracle imposes any timeouts it wishes; none exist here.
#[derive(Clone)]
pub struct Verifier<ZS> {
    state: ZS,
    engine: Arc<dyn ScriptEngine>,
}

impl<ZS> fmt::Debug for Verifier<ZS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

impl<ZS> Verifier<ZS>
where
    ZS: Service<bs::Request, Response = bs::Response, Error = bs::BoxError>
        + Send
        + Clone
        + 'static,
    ZS::Future: Send + 'static,
{
    /// Create a verifier over the given chain oracle and script engine.
    pub fn new(state: ZS, engine: Arc<dyn ScriptEngine>) -> Self {
        Self { state, engine }
    }
}

/// Specifies the transaction to verify, and the context to verify it in.
pub enum Request {
    /// Verify the supplied transaction as a candidate for the mempool.
    ///
    /// Note: coinbase transactions are invalid in the mempool.
    Mempool {
        /// The transaction itself.
        transaction: Arc<Transaction>,
        /// The mempool as it stands, for duplicate and conflict scans and
        /// for locating unconfirmed parents.
        pool: mempool::Snapshot,
    },
}

impl<ZS> Service<Request> for Verifier<ZS>
where
    ZS: Service<bs::Request, Response = bs::Response, Error = bs::BoxError>
        + Send
        + Clone
        + 'static,
    ZS::Future: Send + 'static,
{
    type Response = mempool::Admission;
    type Error = VerifyTransactionError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // We use the state for contextual verification, and we expect those
        // queries to be fast. So we don't need to call
        // `state.poll_ready()` here.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mut state = self.state.clone();
        let engine = self.engine.clone();

        let Request::Mempool { transaction, pool } = req;
        let hash = transaction.hash();
        let span = tracing::debug_span!("tx", %hash);

        async move {
            let tx = transaction;
            tracing::trace!(?tx);

            // Do basic checks first
            check::check_transaction(&tx)?;

            if tx.is_coinbase() {
                return Err(TransactionError::Coinbase.into());
            }
            check::is_standard(&tx)?;

            if pool.contains(&hash) {
                return Err(TransactionError::Duplicate.into());
            }

            // Check that this transaction is actually new to the chain.
            match query(&mut state, bs::Request::Transaction(hash)).await? {
                bs::Response::Transaction(None) => {}
                bs::Response::Transaction(Some(_)) => {
                    return Err(TransactionError::Duplicate.into())
                }
                _ => unreachable!("wrong response to Request::Transaction"),
            }

            // Check for conflicts with transactions already in the pool.
            for input in &tx.inputs {
                if pool.spends(&input.outpoint) {
                    return Err(TransactionError::DoubleSpend.into());
                }
            }

            // The tip height anchors the coinbase maturity rule.
            let last_height = match query(&mut state, bs::Request::Tip).await? {
                bs::Response::Tip(Some((height, _hash))) => height,
                bs::Response::Tip(None) => {
                    return Err(VerifyTransactionError::State {
                        source: "state service has no chain tip".into(),
                    })
                }
                _ => unreachable!("wrong response to Request::Tip"),
            };

            let mut value_in: u64 = 0;
            let mut unconfirmed = Vec::new();

            // Inputs are processed strictly in order; each input's checks
            // complete before the next input's queries are issued.
            for (index, input) in tx.inputs.iter().enumerate() {
                let parent_hash = input.outpoint.hash;

                // The parent's confirmation height comes first, for the
                // coinbase maturity rule; the body fetch follows.
                let confirmed_height =
                    match query(&mut state, bs::Request::TransactionHeight(parent_hash)).await? {
                        bs::Response::TransactionHeight(height) => height,
                        _ => unreachable!("wrong response to Request::TransactionHeight"),
                    };

                let (parent, parent_height) = match confirmed_height {
                    Some(parent_height) => {
                        match query(&mut state, bs::Request::Transaction(parent_hash)).await? {
                            bs::Response::Transaction(Some(parent)) => (parent, parent_height),
                            bs::Response::Transaction(None) => {
                                return Err(TransactionError::InputNotFound {
                                    index: index as u32,
                                }
                                .into())
                            }
                            _ => unreachable!("wrong response to Request::Transaction"),
                        }
                    }
                    None => {
                        // Not confirmed; the parent may be waiting in the
                        // pool itself.
                        match pool.find(&parent_hash) {
                            Some(entry) => {
                                debug_assert!(
                                    !entry.transaction.is_coinbase(),
                                    "pool transactions are never coinbase"
                                );
                                unconfirmed.push(index as u32);
                                // A pool parent is never a coinbase, so the
                                // zero height is inert in the maturity rule.
                                (entry.transaction.clone(), block::Height(0))
                            }
                            None => {
                                return Err(TransactionError::InputNotFound {
                                    index: index as u32,
                                }
                                .into())
                            }
                        }
                    }
                };

                connect_input(
                    &tx,
                    index,
                    &parent,
                    parent_height,
                    last_height,
                    &mut value_in,
                    engine.as_ref(),
                )?;

                // Search for double spends in the chain. Anything but a
                // clean "unspent" answer is evidence of a spend.
                match query(&mut state, bs::Request::Spend(input.outpoint)).await? {
                    bs::Response::Spend(None) => {}
                    bs::Response::Spend(Some(_)) => {
                        return Err(TransactionError::DoubleSpend.into())
                    }
                    _ => unreachable!("wrong response to Request::Spend"),
                }
            }

            // The fee is computed but unused: admission enforces no minimum
            // fee.
            let _ = check::tally_fees(&tx, value_in, 0);

            tracing::trace!("verified transaction for mempool admission");
            metrics::counter!("mempool.verified.transaction.count").increment(1);

            Ok(mempool::Admission {
                hash,
                unconfirmed_inputs: unconfirmed,
            })
        }
        .instrument(span)
        .boxed()
    }
}

/// Ask the chain oracle one question, propagating service failures
/// verbatim.
async fn query<ZS>(
    state: &mut ZS,
    request: bs::Request,
) -> Result<bs::Response, VerifyTransactionError>
where
    ZS: Service<bs::Request, Response = bs::Response, Error = bs::BoxError>,
{
    state
        .ready()
        .await
        .map_err(|source| VerifyTransactionError::State { source })?
        .call(request)
        .await
        .map_err(|source| VerifyTransactionError::State { source })
}

/// Connect one input of a mempool candidate against its parent transaction.
///
/// The parent's referenced output must exist and be in the money range, a
/// coinbase parent must have matured, and the parent's lock script must
/// authorize the spend. `value_in` accumulates the consumed value and must
/// stay in the money range.
///
/// Pay-to-script-hash evaluation is never enabled on this path; only block
/// connection switches it on.
fn connect_input(
    tx: &Transaction,
    input_index: usize,
    parent: &Transaction,
    parent_height: block::Height,
    last_height: block::Height,
    value_in: &mut u64,
    engine: &dyn ScriptEngine,
) -> Result<(), TransactionError> {
    let input = &tx.inputs[input_index];
    let outpoint = input.outpoint;

    let parent_output = parent
        .outputs
        .get(outpoint.index as usize)
        .ok_or(TransactionError::InvalidInputs)?;

    let output_value = parent_output.value;
    if output_value > MAX_MONEY {
        return Err(TransactionError::InvalidInputs);
    }

    if parent.is_coinbase() {
        let depth_difference = last_height.0.saturating_sub(parent_height.0);
        if depth_difference < COINBASE_MATURITY {
            return Err(TransactionError::InvalidInputs);
        }
    }

    if !engine.run(
        &parent_output.lock_script,
        &input.unlock_script,
        tx,
        input_index,
        false,
    ) {
        return Err(TransactionError::InvalidInputs);
    }

    *value_in = value_in
        .checked_add(output_value)
        .ok_or(TransactionError::InvalidInputs)?;
    if *value_in > MAX_MONEY {
        return Err(TransactionError::InvalidInputs);
    }

    Ok(())
}
