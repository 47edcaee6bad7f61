//! Vault policy registry.
//!
//! Holds the global lending parameters, the strategy (worker) registry with
//! per-worker leverage limits, the caller and liquidator whitelists, and
//! exposes the interest rate model to the vault. Every setter is owner-only
//! and validates its own bounds.

use alloc::vec::Vec;
use odra::casper_types::U256;
use odra::prelude::*;

use crate::interest;
use crate::math::BPS_DIVISOR;

// ==========================================
// Events
// ==========================================

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct ParamsSet {
        pub min_debt_size: U256,
        pub reserve_pool_bps: u64,
        pub kill_bounty_bps: u64,
        pub kill_treasury_bps: u64,
        pub treasury: Address,
    }

    #[odra::event]
    pub struct WorkerSet {
        pub worker: Address,
        pub work_factor_bps: u64,
        pub kill_factor_bps: u64,
        pub is_opened: bool,
        pub is_liquidated: bool,
    }

    #[odra::event]
    pub struct CallerWhitelisted {
        pub caller: Address,
        pub ok: bool,
    }

    #[odra::event]
    pub struct LiquidatorWhitelisted {
        pub liquidator: Address,
        pub ok: bool,
    }

    #[odra::event]
    pub struct LiquidationOpenSet {
        pub open: bool,
    }

    #[odra::event]
    pub struct OwnershipTransferred {
        pub previous_owner: Address,
        pub new_owner: Address,
    }
}

// ==========================================
// Types
// ==========================================

/// Leverage limits and status of a registered strategy module
#[odra::odra_type]
pub struct WorkerConfig {
    /// Max debt/collateral ratio accepted by `work` (bps)
    pub work_factor_bps: u64,
    /// Debt/collateral ratio above which a position can be killed (bps)
    pub kill_factor_bps: u64,
    /// Worker accepts new debt
    pub is_opened: bool,
    /// Worker is retired; no further work is routed to it
    pub is_liquidated: bool,
}

// ==========================================
// Errors
// ==========================================

#[odra::odra_error]
pub enum ConfigError {
    Unauthorized = 100,
    InvalidReservePoolBps = 101,
    InvalidKillBps = 102,
    InvalidFactor = 103,
    UnknownWorker = 104,
    MathOverflow = 105,
}

// ==========================================
// Contract
// ==========================================

#[odra::module(
    events = [
        events::ParamsSet,
        events::WorkerSet,
        events::CallerWhitelisted,
        events::LiquidatorWhitelisted,
        events::LiquidationOpenSet,
        events::OwnershipTransferred
    ],
    errors = ConfigError
)]
pub struct VaultConfig {
    owner: Var<Address>,

    // Global parameters
    min_debt_size: Var<U256>,
    reserve_pool_bps: Var<u64>,
    kill_bounty_bps: Var<u64>,
    kill_treasury_bps: Var<u64>,
    treasury: Var<Address>,

    // Worker registry
    workers: Mapping<Address, WorkerConfig>,

    // Access lists
    whitelisted_callers: Mapping<Address, bool>,
    whitelisted_liquidators: Mapping<Address, bool>,
    liquidation_open: Var<bool>,
}

#[odra::module]
impl VaultConfig {
    /// Initialize with global parameters; the deployer becomes owner.
    pub fn init(
        &mut self,
        min_debt_size: U256,
        reserve_pool_bps: u64,
        kill_bounty_bps: u64,
        kill_treasury_bps: u64,
        treasury: Address,
    ) {
        self.owner.set(self.env().caller());
        self.liquidation_open.set(false);
        self.write_params(
            min_debt_size,
            reserve_pool_bps,
            kill_bounty_bps,
            kill_treasury_bps,
            treasury,
        );
    }

    // ==========================================
    // Admin Functions
    // ==========================================

    /// Update global parameters (owner only)
    pub fn set_params(
        &mut self,
        min_debt_size: U256,
        reserve_pool_bps: u64,
        kill_bounty_bps: u64,
        kill_treasury_bps: u64,
        treasury: Address,
    ) {
        self.require_owner();
        self.write_params(
            min_debt_size,
            reserve_pool_bps,
            kill_bounty_bps,
            kill_treasury_bps,
            treasury,
        );
    }

    /// Register or update a strategy module (owner only)
    pub fn set_worker(&mut self, worker: Address, config: WorkerConfig) {
        self.require_owner();
        if config.work_factor_bps == 0
            || config.work_factor_bps > config.kill_factor_bps
            || config.kill_factor_bps > BPS_DIVISOR
        {
            self.env().revert(ConfigError::InvalidFactor);
        }
        self.store_worker(worker, config);
    }

    /// Allow or stop new debt through a worker (owner only)
    pub fn set_worker_opened(&mut self, worker: Address, is_opened: bool) {
        self.require_owner();
        let mut config = self.require_worker(&worker);
        config.is_opened = is_opened;
        self.store_worker(worker, config);
    }

    /// Retire or reinstate a worker (owner only)
    pub fn set_worker_liquidated(&mut self, worker: Address, is_liquidated: bool) {
        self.require_owner();
        let mut config = self.require_worker(&worker);
        config.is_liquidated = is_liquidated;
        self.store_worker(worker, config);
    }

    /// Whitelist contracts allowed to call `work` (owner only)
    pub fn set_whitelisted_callers(&mut self, callers: Vec<Address>, ok: bool) {
        self.require_owner();
        for caller in callers {
            self.whitelisted_callers.set(&caller, ok);
            self.env().emit_event(events::CallerWhitelisted { caller, ok });
        }
    }

    /// Whitelist addresses allowed to call `kill` (owner only)
    pub fn set_whitelisted_liquidators(&mut self, liquidators: Vec<Address>, ok: bool) {
        self.require_owner();
        for liquidator in liquidators {
            self.whitelisted_liquidators.set(&liquidator, ok);
            self.env()
                .emit_event(events::LiquidatorWhitelisted { liquidator, ok });
        }
    }

    /// Open `kill` to any caller, or restrict it to whitelisted liquidators (owner only)
    pub fn set_liquidation_open(&mut self, open: bool) {
        self.require_owner();
        self.liquidation_open.set(open);
        self.env().emit_event(events::LiquidationOpenSet { open });
    }

    /// Hand the config over to a new owner (owner only)
    pub fn transfer_ownership(&mut self, new_owner: Address) {
        self.require_owner();
        let previous_owner = self.env().caller();
        self.owner.set(new_owner);
        self.env().emit_event(events::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
    }

    // ==========================================
    // View Functions
    // ==========================================

    /// Registered and not retired
    pub fn is_worker_ok(&self, worker: Address) -> bool {
        self.workers
            .get(&worker)
            .map(|c| !c.is_liquidated)
            .unwrap_or(false)
    }

    /// Registered, not retired and accepting new debt
    pub fn accept_debt(&self, worker: Address) -> bool {
        self.workers
            .get(&worker)
            .map(|c| c.is_opened && !c.is_liquidated)
            .unwrap_or(false)
    }

    pub fn work_factor(&self, worker: Address) -> u64 {
        self.require_worker(&worker).work_factor_bps
    }

    pub fn kill_factor(&self, worker: Address) -> u64 {
        self.require_worker(&worker).kill_factor_bps
    }

    pub fn worker(&self, worker: Address) -> Option<WorkerConfig> {
        self.workers.get(&worker)
    }

    pub fn min_debt_size(&self) -> U256 {
        self.min_debt_size.get_or_default()
    }

    pub fn reserve_pool_bps(&self) -> u64 {
        self.reserve_pool_bps.get_or_default()
    }

    pub fn kill_bounty_bps(&self) -> u64 {
        self.kill_bounty_bps.get_or_default()
    }

    pub fn kill_treasury_bps(&self) -> u64 {
        self.kill_treasury_bps.get_or_default()
    }

    pub fn treasury(&self) -> Option<Address> {
        self.treasury.get()
    }

    /// Contracts must be whitelisted to call `work`; accounts always pass.
    pub fn is_caller_ok(&self, caller: Address) -> bool {
        self.whitelisted_callers.get(&caller).unwrap_or(false)
    }

    pub fn is_liquidator_ok(&self, liquidator: Address) -> bool {
        self.liquidation_open.get_or_default()
            || self.whitelisted_liquidators.get(&liquidator).unwrap_or(false)
    }

    pub fn liquidation_open(&self) -> bool {
        self.liquidation_open.get_or_default()
    }

    /// Per-second borrow rate (1e18-scaled) at the given utilization
    pub fn get_interest_rate(&self, utilization_bps: u64) -> U256 {
        interest::rate_for_bps(utilization_bps)
    }

    /// Per-second borrow rate for a pool with `debt` lent out of `total_token`
    pub fn interest_rate(&self, debt: U256, total_token: U256) -> U256 {
        match interest::rate_for_pool(debt, total_token) {
            Some(rate) => rate,
            None => self.env().revert(ConfigError::MathOverflow),
        }
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner.get()
    }

    // ==========================================
    // Internal Functions
    // ==========================================

    fn require_owner(&self) {
        if self.owner.get() != Some(self.env().caller()) {
            self.env().revert(ConfigError::Unauthorized);
        }
    }

    fn require_worker(&self, worker: &Address) -> WorkerConfig {
        match self.workers.get(worker) {
            Some(config) => config,
            None => self.env().revert(ConfigError::UnknownWorker),
        }
    }

    fn store_worker(&mut self, worker: Address, config: WorkerConfig) {
        self.env().emit_event(events::WorkerSet {
            worker,
            work_factor_bps: config.work_factor_bps,
            kill_factor_bps: config.kill_factor_bps,
            is_opened: config.is_opened,
            is_liquidated: config.is_liquidated,
        });
        self.workers.set(&worker, config);
    }

    fn write_params(
        &mut self,
        min_debt_size: U256,
        reserve_pool_bps: u64,
        kill_bounty_bps: u64,
        kill_treasury_bps: u64,
        treasury: Address,
    ) {
        if reserve_pool_bps > BPS_DIVISOR {
            self.env().revert(ConfigError::InvalidReservePoolBps);
        }
        let kill_total = kill_bounty_bps.checked_add(kill_treasury_bps);
        if kill_total.map_or(true, |total| total > BPS_DIVISOR) {
            self.env().revert(ConfigError::InvalidKillBps);
        }
        self.min_debt_size.set(min_debt_size);
        self.reserve_pool_bps.set(reserve_pool_bps);
        self.kill_bounty_bps.set(kill_bounty_bps);
        self.kill_treasury_bps.set(kill_treasury_bps);
        self.treasury.set(treasury);
        self.env().emit_event(events::ParamsSet {
            min_debt_size,
            reserve_pool_bps,
            kill_bounty_bps,
            kill_treasury_bps,
            treasury,
        });
    }
}
