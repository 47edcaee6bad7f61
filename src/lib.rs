//! Leveraged Lending Vault on Casper (Odra)
//!
//! A single-asset lending pool that lends to leveraged positions managed by
//! registered strategy modules.
//! - Vault: pool accounting, claim token, debt shares, work and kill
//! - VaultConfig: global parameters, worker registry, whitelists, interest model
//! - Strategy: interface the vault calls on strategy modules
//! - HoldingStrategy: reference strategy keeping collateral as base asset
//! - BaseToken: faucet CEP-18 token used as the base asset in tests

#![cfg_attr(target_arch = "wasm32", no_std)]

extern crate alloc;

pub mod config;
pub mod holding_strategy;
pub mod interest;
pub mod math;
pub mod principal;
pub mod strategy;
pub mod tokens;
pub mod vault;
