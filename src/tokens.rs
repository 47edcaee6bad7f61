//! Base asset plumbing.
//!
//! - `Cep18Asset`: the slice of the CEP-18 interface the vault and strategies
//!   call on the pool's base asset. Argument names follow the CEP-18 standard
//!   so any conforming token can back a vault.
//! - `BaseToken`: CEP-18 test token with an open faucet, used as the base asset
//!   in tests and on testnet.

use alloc::string::String;
use odra::casper_types::U256;
use odra::prelude::*;
use odra_modules::cep18::events::{
    Burn, DecreaseAllowance, IncreaseAllowance, Mint, SetAllowance, Transfer, TransferFrom,
};
use odra_modules::cep18_token::Cep18;

/// Base asset interface consumed by the vault and strategy modules.
#[odra::external_contract]
pub trait Cep18Asset {
    /// Balance of an address
    fn balance_of(&self, address: Address) -> U256;
    /// Transfer from the calling contract
    fn transfer(&mut self, recipient: Address, amount: U256);
    /// Transfer using an allowance granted to the calling contract
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256);
}

/// Faucet-mintable CEP-18 token
#[odra::module(
    events = [
        Mint,
        Burn,
        SetAllowance,
        IncreaseAllowance,
        DecreaseAllowance,
        Transfer,
        TransferFrom
    ]
)]
pub struct BaseToken {
    token: SubModule<Cep18>,
}

#[odra::module]
impl BaseToken {
    /// Initialize the token
    pub fn init(&mut self, name: String, symbol: String, decimals: u8) {
        self.token.init(symbol, name, decimals, U256::zero());
    }

    pub fn name(&self) -> String {
        self.token.name()
    }

    pub fn symbol(&self) -> String {
        self.token.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.token.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.token.total_supply()
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.token.balance_of(&address)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.token.allowance(&owner, &spender)
    }

    pub fn transfer(&mut self, recipient: Address, amount: U256) {
        self.token.transfer(&recipient, &amount);
    }

    pub fn approve(&mut self, spender: Address, amount: U256) {
        self.token.approve(&spender, &amount);
    }

    pub fn increase_allowance(&mut self, spender: Address, amount: U256) {
        self.token.increase_allowance(&spender, &amount);
    }

    pub fn decrease_allowance(&mut self, spender: Address, amount: U256) {
        self.token.decrease_allowance(&spender, &amount);
    }

    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        self.token.transfer_from(&owner, &recipient, &amount);
    }

    /// Faucet mint - anyone can call to get test tokens
    pub fn faucet_mint(&mut self, to: Address, amount: U256) {
        self.token.raw_mint(&to, &amount);
    }
}
