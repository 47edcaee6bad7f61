//! Shared deployment fixture for vault integration tests.

#![allow(dead_code)]

use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::U256;
use odra::host::{Deployer, HostEnv, HostRef};
use odra::prelude::*;

use leverage_vault::config::{VaultConfig, VaultConfigHostRef, VaultConfigInitArgs, WorkerConfig};
use leverage_vault::holding_strategy::{
    HoldingStrategy, HoldingStrategyHostRef, HoldingStrategyInitArgs,
};
use leverage_vault::strategy::StrategyAction;
use leverage_vault::tokens::{BaseToken, BaseTokenHostRef, BaseTokenInitArgs};
use leverage_vault::vault::{Vault, VaultHostRef, VaultInitArgs};

pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

pub const MIN_DEBT_SIZE: u128 = WAD;
pub const RESERVE_POOL_BPS: u64 = 1_000;
pub const KILL_BOUNTY_BPS: u64 = 500;
pub const KILL_TREASURY_BPS: u64 = 100;
pub const WORK_FACTOR_BPS: u64 = 7_000;
pub const KILL_FACTOR_BPS: u64 = 8_000;

/// Starting faucet balance of every test account
pub const FUNDING: u64 = 1_000;

/// Whole tokens to base units
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(WAD)
}

/// Thousandths of a token to base units
pub fn milli(thousandths: u64) -> U256 {
    U256::from(thousandths) * U256::from(WAD / 1_000)
}

pub fn hold() -> Bytes {
    StrategyAction::hold().encode()
}

pub fn close() -> Bytes {
    StrategyAction::close().encode()
}

pub fn unwind(amount: U256) -> Bytes {
    StrategyAction::unwind(amount).encode()
}

pub struct Fixture {
    pub env: HostEnv,
    pub base: BaseTokenHostRef,
    pub config: VaultConfigHostRef,
    pub vault: VaultHostRef,
    pub strategy: HoldingStrategyHostRef,
    pub owner: Address,
    pub lender: Address,
    pub borrower: Address,
    pub killer: Address,
    pub treasury: Address,
}

impl Fixture {
    /// Deploy token, config, vault and one registered holding strategy.
    /// Lender and borrower are funded and have approved the vault.
    pub fn new() -> Self {
        let env = odra_test::env();
        let owner = env.get_account(0);
        let lender = env.get_account(1);
        let borrower = env.get_account(2);
        let killer = env.get_account(3);
        let treasury = env.get_account(4);

        env.set_caller(owner);
        let base = BaseToken::deploy(
            &env,
            BaseTokenInitArgs {
                name: "Test Base".to_string(),
                symbol: "tBASE".to_string(),
                decimals: 18,
            },
        );
        let mut config = VaultConfig::deploy(
            &env,
            VaultConfigInitArgs {
                min_debt_size: U256::from(MIN_DEBT_SIZE),
                reserve_pool_bps: RESERVE_POOL_BPS,
                kill_bounty_bps: KILL_BOUNTY_BPS,
                kill_treasury_bps: KILL_TREASURY_BPS,
                treasury,
            },
        );
        let vault = Vault::deploy(
            &env,
            VaultInitArgs {
                base_token: base.address(),
                config: config.address(),
                name: "Interest Bearing tBASE".to_string(),
                symbol: "ibBASE".to_string(),
                decimals: 18,
            },
        );
        let strategy = HoldingStrategy::deploy(
            &env,
            HoldingStrategyInitArgs {
                vault: vault.address(),
                base_token: base.address(),
            },
        );
        config.set_worker(strategy.address(), default_worker());

        let mut fixture = Fixture {
            env,
            base,
            config,
            vault,
            strategy,
            owner,
            lender,
            borrower,
            killer,
            treasury,
        };
        fixture.fund(lender);
        fixture.fund(borrower);
        fixture
    }

    /// Faucet `FUNDING` tokens to `user` and approve the vault for all of it
    pub fn fund(&mut self, user: Address) {
        self.env.set_caller(user);
        self.base.faucet_mint(user, tokens(FUNDING));
        self.base.approve(self.vault.address(), tokens(FUNDING));
    }

    pub fn deposit(&mut self, user: Address, amount: U256) {
        self.env.set_caller(user);
        self.vault.deposit(amount);
    }

    /// Open a new position on the default strategy, keeping everything as collateral
    pub fn open(&mut self, user: Address, principal: U256, loan: U256) -> u64 {
        self.env.set_caller(user);
        self.vault
            .work(0, self.strategy.address(), principal, loan, U256::zero(), hold())
    }

    pub fn set_valuation(&mut self, valuation_bps: u64) {
        self.env.set_caller(self.owner);
        self.strategy.set_valuation_bps(valuation_bps);
    }

    pub fn open_liquidation(&mut self) {
        self.env.set_caller(self.owner);
        self.config.set_liquidation_open(true);
    }

    pub fn advance_seconds(&self, seconds: u64) {
        self.env.advance_block_time(seconds * 1_000);
    }

    pub fn balance(&self, user: Address) -> U256 {
        self.base.balance_of(user)
    }
}

pub fn default_worker() -> WorkerConfig {
    WorkerConfig {
        work_factor_bps: WORK_FACTOR_BPS,
        kill_factor_bps: KILL_FACTOR_BPS,
        is_opened: true,
        is_liquidated: false,
    }
}
