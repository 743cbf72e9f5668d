//! Core Bitcoin data structures for the Bittern consensus validation core.
//!
//! This crate provides definitions of the consensus-critical datastructures
//! shared by the Bittern validators: blocks, transactions, scripts, amounts,
//! and difficulty targets, together with their consensus serialization.

// #![deny(missing_docs)]
#![allow(clippy::try_err)]

#[macro_use]
extern crate serde;

pub mod amount;
pub mod block;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod work;
