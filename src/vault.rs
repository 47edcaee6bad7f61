//! Leveraged Lending Vault Contract
//!
//! A single-asset lending pool on Casper Network.
//! - Depositors supply the base asset and receive claim tokens (CEP-18 issued
//!   by the vault itself) priced at `total_token / total_supply`
//! - Borrowers open positions through registered strategy modules, borrowing
//!   from the pool up to the strategy's work factor
//! - Debt is tracked in debt shares; interest accrues pool-wide on a
//!   triple-slope utilization curve, part of it skimmed into a reserve
//! - Positions above the kill factor are liquidated; proceeds pay the
//!   liquidator bounty and treasury fee first, then the debt, then the owner
//!
//! ## Units
//! - Amounts are base asset units (U256)
//! - Ratios are basis points (10_000 = 100%)
//! - Time is block time in seconds
//!
//! ## Out of Scope
//! What strategies do with collateral (DEX routing, farming) is external.

use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;
use odra_modules::cep18::events::{
    Burn, DecreaseAllowance, IncreaseAllowance, Mint, SetAllowance, Transfer, TransferFrom,
};
use odra_modules::cep18_token::Cep18;

use crate::config::VaultConfigContractRef;
use crate::interest;
use crate::math::{bps_of, mul_div_down, mul_div_up, BPS_DIVISOR};
use crate::principal::is_contract;
use crate::strategy::StrategyContractRef;
use crate::tokens::Cep18AssetContractRef;

/// Odra block time is in milliseconds
const MILLIS_PER_SECOND: u64 = 1_000;
/// Position ids start at 1; 0 asks `work` to open a new position
const FIRST_POSITION_ID: u64 = 1;

// ==========================================
// Events
// ==========================================

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct Deposited {
        pub user: Address,
        pub amount: U256,
        pub shares: U256,
    }

    #[odra::event]
    pub struct Withdrawn {
        pub user: Address,
        pub shares: U256,
        pub amount: U256,
    }

    #[odra::event]
    pub struct InterestAccrued {
        pub interest: U256,
        pub to_reserve: U256,
        pub vault_debt_val: U256,
    }

    #[odra::event]
    pub struct PositionOpened {
        pub position_id: u64,
        pub owner: Address,
        pub strategy: Address,
    }

    #[odra::event]
    pub struct Work {
        pub position_id: u64,
        pub loan: U256,
        pub back: U256,
        pub debt_repaid: U256,
        pub refund: U256,
        pub debt: U256,
    }

    #[odra::event]
    pub struct AddDebt {
        pub position_id: u64,
        pub debt_share: U256,
        pub debt_val: U256,
    }

    #[odra::event]
    pub struct RemoveDebt {
        pub position_id: u64,
        pub debt_share: U256,
        pub debt_val: U256,
    }

    #[odra::event]
    pub struct Killed {
        pub position_id: u64,
        pub killer: Address,
        pub owner: Address,
        pub proceeds: U256,
        pub bounty: U256,
        pub treasury_fee: U256,
        pub debt_repaid: U256,
        pub leftover: U256,
        pub bad_debt: U256,
    }

    #[odra::event]
    pub struct ReserveWithdrawn {
        pub to: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct ReserveReduced {
        pub amount: U256,
    }

    #[odra::event]
    pub struct ConfigUpdated {
        pub config: Address,
    }

    #[odra::event]
    pub struct Paused {
        pub by: Address,
    }

    #[odra::event]
    pub struct Unpaused {
        pub by: Address,
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

/// Ledger entry of a leveraged position
#[odra::odra_type]
pub struct Position {
    pub strategy: Address,
    pub owner: Address,
    pub debt_share: U256,
}

/// Position snapshot returned by `position_info`
#[odra::odra_type]
pub struct PositionInfo {
    /// Collateral value reported by the strategy
    pub health: U256,
    /// Outstanding debt including accrued interest
    pub debt_val: U256,
}

// ==========================================
// Errors
// ==========================================

#[odra::odra_error]
pub enum VaultError {
    // Policy
    BadWorkFactor = 1,
    DebtTooSmall = 2,
    UnregisteredStrategy = 3,
    StrategyNotAcceptingDebt = 4,
    UnauthorizedCaller = 5,
    UnauthorizedLiquidator = 6,
    Unauthorized = 7,
    WrongStrategy = 8,
    NotPositionOwner = 9,
    // Resources
    InsufficientPoolLiquidity = 20,
    InsufficientReserve = 21,
    InsufficientShares = 22,
    // Guards
    PositionHealthy = 40,
    ReentrantCall = 41,
    NoDebt = 42,
    PositionNotFound = 43,
    StrategyMisreported = 44,
    InsufficientReturn = 45,
    PoolInsolvent = 46,
    ContractPaused = 47,
    NotPaused = 48,
    ZeroAmount = 49,
    ZeroShares = 50,
    NotInitialized = 51,
    // Arithmetic
    MathOverflow = 60,
}

// ==========================================
// Contract
// ==========================================

#[odra::module(
    events = [
        events::Deposited,
        events::Withdrawn,
        events::InterestAccrued,
        events::PositionOpened,
        events::Work,
        events::AddDebt,
        events::RemoveDebt,
        events::Killed,
        events::ReserveWithdrawn,
        events::ReserveReduced,
        events::ConfigUpdated,
        events::Paused,
        events::Unpaused,
        events::OwnershipTransferred,
        Mint,
        Burn,
        SetAllowance,
        IncreaseAllowance,
        DecreaseAllowance,
        Transfer,
        TransferFrom
    ],
    errors = VaultError
)]
pub struct Vault {
    // Claim token
    token: SubModule<Cep18>,

    // External references
    base_token: Var<Address>,
    config: Var<Address>,

    // Pool state
    total_base: Var<U256>,
    vault_debt_val: Var<U256>,
    vault_debt_share: Var<U256>,
    reserve_pool: Var<U256>,
    total_bad_debt: Var<U256>,
    bad_debt_share: Var<U256>,
    last_accrue_time: Var<u64>,

    // Position ledger
    positions: Mapping<u64, Position>,
    next_position_id: Var<u64>,

    // Admin
    owner: Var<Address>,
    paused: Var<bool>,
    entered: Var<bool>,
}

#[odra::module]
impl Vault {
    // ==========================================
    // Initialization
    // ==========================================

    /// Initialize the vault over `base_token`, governed by `config`
    pub fn init(
        &mut self,
        base_token: Address,
        config: Address,
        name: String,
        symbol: String,
        decimals: u8,
    ) {
        self.token.init(symbol, name, decimals, U256::zero());
        self.base_token.set(base_token);
        self.config.set(config);
        self.total_base.set(U256::zero());
        self.vault_debt_val.set(U256::zero());
        self.vault_debt_share.set(U256::zero());
        self.reserve_pool.set(U256::zero());
        self.total_bad_debt.set(U256::zero());
        self.bad_debt_share.set(U256::zero());
        self.last_accrue_time.set(self.now());
        self.next_position_id.set(FIRST_POSITION_ID);
        self.owner.set(self.env().caller());
        self.paused.set(false);
        self.entered.set(false);
    }

    // ==========================================
    // Lender Functions
    // ==========================================

    /// Deposit base asset and mint claim tokens.
    /// Requires a prior `approve` of `amount` to the vault on the base token.
    pub fn deposit(&mut self, amount: U256) {
        self.non_reentrant(|vault| vault.deposit_internal(amount));
    }

    /// Burn claim tokens for the proportional share of the pool.
    /// Only idle liquidity can leave; lent-out funds must be repaid first.
    pub fn withdraw(&mut self, share: U256) {
        self.non_reentrant(|vault| vault.withdraw_internal(share));
    }

    // ==========================================
    // Borrower Functions
    // ==========================================

    /// Open (`position_id == 0`) or adjust a position through `strategy`.
    ///
    /// Moves `principal` from the caller and `loan` from the pool to the
    /// strategy, lets it act on `data`, repays debt from whatever comes back,
    /// refunds the rest and enforces the work factor on the final state.
    /// Returns the position id.
    pub fn work(
        &mut self,
        position_id: u64,
        strategy: Address,
        principal: U256,
        loan: U256,
        min_back: U256,
        data: Bytes,
    ) -> u64 {
        self.non_reentrant(|vault| {
            vault.work_internal(position_id, strategy, principal, loan, min_back, data)
        })
    }

    /// Liquidate a position whose debt exceeds its kill factor
    pub fn kill(&mut self, position_id: u64) {
        self.non_reentrant(|vault| vault.kill_internal(position_id));
    }

    /// Bring interest up to date without any other action
    pub fn accrue(&mut self) {
        self.non_reentrant(|vault| vault.accrue_interest());
    }

    // ==========================================
    // View Functions
    // ==========================================

    /// Value backing all claim tokens: idle base + debt - reserve
    pub fn total_token(&self) -> U256 {
        self.total_token_value()
    }

    pub fn total_base(&self) -> U256 {
        self.total_base.get_or_default()
    }

    pub fn vault_debt_val(&self) -> U256 {
        self.vault_debt_val.get_or_default()
    }

    pub fn total_debt_share(&self) -> U256 {
        self.vault_debt_share.get_or_default()
    }

    pub fn reserve_pool(&self) -> U256 {
        self.reserve_pool.get_or_default()
    }

    /// Debt written off by liquidations that did not cover it
    pub fn total_bad_debt(&self) -> U256 {
        self.total_bad_debt.get_or_default()
    }

    /// Debt shares left behind by killed positions whose proceeds fell short.
    /// They belong to no position and keep the unrecovered debt priced.
    pub fn bad_debt_share(&self) -> U256 {
        self.bad_debt_share.get_or_default()
    }

    pub fn last_accrue_time(&self) -> u64 {
        self.last_accrue_time.get_or_default()
    }

    /// Interest that the next state-changing call will accrue
    pub fn pending_interest(&self) -> U256 {
        self.interest_since_last_accrual(self.now())
    }

    /// Current utilization in basis points
    pub fn utilization_bps(&self) -> u64 {
        let utilization = self.checked(interest::utilization(
            self.vault_debt_val.get_or_default(),
            self.total_token_value(),
        ));
        let bps = self.checked(mul_div_down(
            utilization,
            U256::from(BPS_DIVISOR),
            U256::from(crate::math::WAD),
        ));
        bps.as_u64()
    }

    pub fn next_position_id(&self) -> u64 {
        self.next_position_id.get_or_default()
    }

    pub fn position(&self, position_id: u64) -> Option<Position> {
        self.positions.get(&position_id)
    }

    /// Strategy-reported collateral value and current debt of a position
    pub fn position_info(&self, position_id: u64) -> PositionInfo {
        let position = self.load_position(position_id);
        PositionInfo {
            health: self.strategy(position.strategy).health(position_id),
            debt_val: self.debt_share_to_val(position.debt_share),
        }
    }

    /// Debt value of `share` debt shares (rounded down; the last share takes all)
    pub fn debt_share_to_val(&self, share: U256) -> U256 {
        let total_share = self.vault_debt_share.get_or_default();
        if total_share.is_zero() || share.is_zero() {
            return U256::zero();
        }
        let debt_val = self.vault_debt_val.get_or_default();
        if share >= total_share {
            return debt_val;
        }
        self.checked(mul_div_down(share, debt_val, total_share))
    }

    /// Debt shares issued for borrowing `value` (rounded up)
    pub fn debt_val_to_share(&self, value: U256) -> U256 {
        let total_share = self.vault_debt_share.get_or_default();
        if total_share.is_zero() {
            return value;
        }
        let debt_val = self.vault_debt_val.get_or_default();
        self.checked(mul_div_up(value, total_share, debt_val))
    }

    pub fn base_token(&self) -> Option<Address> {
        self.base_token.get()
    }

    pub fn config(&self) -> Option<Address> {
        self.config.get()
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get_or_default()
    }

    // ==========================================
    // Claim Token (CEP-18)
    // ==========================================

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
        self.non_reentrant(|vault| vault.token.transfer(&recipient, &amount));
    }

    pub fn approve(&mut self, spender: Address, amount: U256) {
        self.non_reentrant(|vault| vault.token.approve(&spender, &amount));
    }

    pub fn increase_allowance(&mut self, spender: Address, amount: U256) {
        self.non_reentrant(|vault| vault.token.increase_allowance(&spender, &amount));
    }

    pub fn decrease_allowance(&mut self, spender: Address, amount: U256) {
        self.non_reentrant(|vault| vault.token.decrease_allowance(&spender, &amount));
    }

    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        self.non_reentrant(|vault| vault.token.transfer_from(&owner, &recipient, &amount));
    }

    // ==========================================
    // Admin Functions
    // ==========================================

    /// Send reserve to `to` (owner only)
    pub fn withdraw_reserve(&mut self, to: Address, amount: U256) {
        self.require_owner();
        self.non_reentrant(|vault| {
            vault.accrue_interest();
            let reserve = vault.reserve_pool.get_or_default();
            if amount > reserve {
                vault.env().revert(VaultError::InsufficientReserve);
            }
            let total_base = vault.total_base.get_or_default();
            if amount > total_base {
                vault.env().revert(VaultError::InsufficientPoolLiquidity);
            }
            vault.reserve_pool.set(reserve - amount);
            vault.total_base.set(total_base - amount);
            vault.send(to, amount);
            vault.env().emit_event(events::ReserveWithdrawn { to, amount });
        });
    }

    /// Release reserve back to depositors (owner only)
    pub fn reduce_reserve(&mut self, amount: U256) {
        self.require_owner();
        self.non_reentrant(|vault| {
            vault.accrue_interest();
            let reserve = vault.reserve_pool.get_or_default();
            if amount > reserve {
                vault.env().revert(VaultError::InsufficientReserve);
            }
            vault.reserve_pool.set(reserve - amount);
            vault.env().emit_event(events::ReserveReduced { amount });
        });
    }

    /// Point the vault at another config contract (owner only)
    pub fn update_config(&mut self, config: Address) {
        self.require_owner();
        self.non_reentrant(|vault| {
            // Interest up to now is charged under the old curve
            vault.accrue_interest();
            vault.config.set(config);
            vault.env().emit_event(events::ConfigUpdated { config });
        });
    }

    /// Pause deposits and new work (owner only). Withdrawals and kills stay open.
    pub fn pause(&mut self) {
        self.require_owner();
        if self.paused.get_or_default() {
            self.env().revert(VaultError::ContractPaused);
        }
        self.paused.set(true);
        self.env().emit_event(events::Paused {
            by: self.env().caller(),
        });
    }

    /// Unpause (owner only)
    pub fn unpause(&mut self) {
        self.require_owner();
        if !self.paused.get_or_default() {
            self.env().revert(VaultError::NotPaused);
        }
        self.paused.set(false);
        self.env().emit_event(events::Unpaused {
            by: self.env().caller(),
        });
    }

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
    // Internal Functions
    // ==========================================

    fn require_not_paused(&self) {
        if self.paused.get_or_default() {
            self.env().revert(VaultError::ContractPaused);
        }
    }

    fn require_owner(&self) {
        if self.owner.get() != Some(self.env().caller()) {
            self.env().revert(VaultError::Unauthorized);
        }
    }

    fn now(&self) -> u64 {
        self.env().get_block_time() / MILLIS_PER_SECOND
    }

    fn checked(&self, value: Option<U256>) -> U256 {
        match value {
            Some(v) => v,
            None => self.env().revert(VaultError::MathOverflow),
        }
    }

    fn total_token_value(&self) -> U256 {
        let assets = self.checked(
            self.total_base
                .get_or_default()
                .checked_add(self.vault_debt_val.get_or_default()),
        );
        match assets.checked_sub(self.reserve_pool.get_or_default()) {
            Some(total) => total,
            None => self.env().revert(VaultError::PoolInsolvent),
        }
    }

    fn interest_since_last_accrual(&self, now: u64) -> U256 {
        let last = self.last_accrue_time.get_or_default();
        let debt = self.vault_debt_val.get_or_default();
        if now <= last || debt.is_zero() {
            return U256::zero();
        }
        let rate = self.config_ref().interest_rate(debt, self.total_token_value());
        self.checked(interest::pending_interest(debt, rate, now - last))
    }

    /// Charge interest since the last accrual. Idempotent within one call.
    fn accrue_interest(&mut self) {
        let now = self.now();
        if now <= self.last_accrue_time.get_or_default() {
            return;
        }
        let interest = self.interest_since_last_accrual(now);
        if !interest.is_zero() {
            let reserve_bps = self.config_ref().reserve_pool_bps();
            let to_reserve = self.checked(bps_of(interest, reserve_bps));
            let reserve = self.reserve_pool.get_or_default();
            self.reserve_pool.set(self.checked(reserve.checked_add(to_reserve)));
            let debt = self.vault_debt_val.get_or_default();
            let vault_debt_val = self.checked(debt.checked_add(interest));
            self.vault_debt_val.set(vault_debt_val);

            self.env().emit_event(events::InterestAccrued {
                interest,
                to_reserve,
                vault_debt_val,
            });
        }
        self.last_accrue_time.set(now);
    }

    fn deposit_internal(&mut self, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(VaultError::ZeroAmount);
        }
        let caller = self.env().caller();
        self.accrue_interest();

        let total = self.total_token_value();
        let supply = self.token.total_supply();
        let shares = if supply.is_zero() {
            amount
        } else {
            if total.is_zero() {
                self.env().revert(VaultError::PoolInsolvent);
            }
            self.checked(mul_div_down(amount, supply, total))
        };
        if shares.is_zero() {
            self.env().revert(VaultError::ZeroShares);
        }

        let self_address = self.env().self_address();
        self.base().transfer_from(caller, self_address, amount);
        self.add_base(amount);
        self.token.raw_mint(&caller, &shares);

        self.env().emit_event(events::Deposited {
            user: caller,
            amount,
            shares,
        });
    }

    fn withdraw_internal(&mut self, share: U256) {
        if share.is_zero() {
            self.env().revert(VaultError::ZeroAmount);
        }
        let caller = self.env().caller();
        if self.token.balance_of(&caller) < share {
            self.env().revert(VaultError::InsufficientShares);
        }
        self.accrue_interest();

        let total = self.total_token_value();
        let supply = self.token.total_supply();
        let amount = self.checked(mul_div_down(share, total, supply));
        let total_base = self.total_base.get_or_default();
        if amount > total_base {
            self.env().revert(VaultError::InsufficientPoolLiquidity);
        }

        self.token.raw_burn(&caller, &share);
        self.total_base.set(total_base - amount);
        self.send(caller, amount);

        self.env().emit_event(events::Withdrawn {
            user: caller,
            shares: share,
            amount,
        });
    }

    fn work_internal(
        &mut self,
        position_id: u64,
        strategy: Address,
        principal: U256,
        loan: U256,
        min_back: U256,
        data: Bytes,
    ) -> u64 {
        self.require_not_paused();
        let caller = self.env().caller();
        let config = self.config_ref();
        if is_contract(&caller) && !config.is_caller_ok(caller) {
            self.env().revert(VaultError::UnauthorizedCaller);
        }

        self.accrue_interest();

        // 1. Resolve the position
        let (id, mut position) = if position_id == 0 {
            let id = self.next_position_id.get_or_default();
            self.next_position_id.set(id + 1);
            self.env().emit_event(events::PositionOpened {
                position_id: id,
                owner: caller,
                strategy,
            });
            let position = Position {
                strategy,
                owner: caller,
                debt_share: U256::zero(),
            };
            (id, position)
        } else {
            let position = self.load_position(position_id);
            if position.strategy != strategy {
                self.env().revert(VaultError::WrongStrategy);
            }
            if position.owner != caller {
                self.env().revert(VaultError::NotPositionOwner);
            }
            (position_id, position)
        };

        // 2. Policy checks
        if !config.is_worker_ok(strategy) {
            self.env().revert(VaultError::UnregisteredStrategy);
        }
        if !loan.is_zero() && !config.accept_debt(strategy) {
            self.env().revert(VaultError::StrategyNotAcceptingDebt);
        }
        if loan > self.total_base.get_or_default() {
            self.env().revert(VaultError::InsufficientPoolLiquidity);
        }

        // 3. Take the position's debt off the books and add the new loan
        let debt = self.remove_debt(id, &mut position);
        let debt = self.checked(debt.checked_add(loan));

        // 4. Fund the strategy and let it work
        let mut base = self.base();
        if !principal.is_zero() {
            base.transfer_from(caller, strategy, principal);
        }
        if !loan.is_zero() {
            self.sub_base(loan);
            base.transfer(strategy, loan);
        }
        let self_address = self.env().self_address();
        let before = base.balance_of(self_address);
        let reported = self
            .strategy(strategy)
            .work(id, position.owner, debt, data);
        let back = self.received_since(before);
        if reported > back {
            self.env().revert(VaultError::StrategyMisreported);
        }
        if back < min_back {
            self.env().revert(VaultError::InsufficientReturn);
        }

        // 5. Returned funds repay debt first
        let debt_repaid = back.min(debt);
        let debt = debt - debt_repaid;
        self.add_base(debt_repaid);

        // 6. Leverage check on the final state
        if !debt.is_zero() {
            if debt < config.min_debt_size() {
                self.env().revert(VaultError::DebtTooSmall);
            }
            let health = self.strategy(strategy).health(id);
            let work_factor = config.work_factor(strategy);
            let lhs = self.checked(debt.checked_mul(U256::from(BPS_DIVISOR)));
            let rhs = self.checked(health.checked_mul(U256::from(work_factor)));
            if lhs > rhs {
                self.env().revert(VaultError::BadWorkFactor);
            }
            self.add_debt(id, &mut position, debt);
        }
        self.positions.set(&id, position);

        // 7. Refund the rest
        let refund = back - debt_repaid;
        self.send(caller, refund);

        self.env().emit_event(events::Work {
            position_id: id,
            loan,
            back,
            debt_repaid,
            refund,
            debt,
        });
        id
    }

    fn kill_internal(&mut self, position_id: u64) {
        let caller = self.env().caller();
        let config = self.config_ref();
        if !config.is_liquidator_ok(caller) {
            self.env().revert(VaultError::UnauthorizedLiquidator);
        }

        self.accrue_interest();

        let mut position = self.load_position(position_id);
        let debt = self.debt_share_to_val(position.debt_share);
        if debt.is_zero() {
            self.env().revert(VaultError::NoDebt);
        }
        let health = self.strategy(position.strategy).health(position_id);
        let kill_factor = config.kill_factor(position.strategy);
        let lhs = self.checked(debt.checked_mul(U256::from(BPS_DIVISOR)));
        let rhs = self.checked(health.checked_mul(U256::from(kill_factor)));
        if lhs <= rhs {
            self.env().revert(VaultError::PositionHealthy);
        }

        let share = position.debt_share;
        position.debt_share = U256::zero();
        self.positions.set(&position_id, position.clone());

        let self_address = self.env().self_address();
        let before = self.base().balance_of(self_address);
        let reported = self.strategy(position.strategy).liquidate(position_id);
        let proceeds = self.received_since(before);
        if reported > proceeds {
            self.env().revert(VaultError::StrategyMisreported);
        }

        // Split: bounty and treasury fee off the top, then debt, then owner
        let bounty = self.checked(bps_of(proceeds, config.kill_bounty_bps()));
        let treasury_fee = self.checked(bps_of(proceeds, config.kill_treasury_bps()));
        let rest = self.checked(
            proceeds
                .checked_sub(bounty)
                .and_then(|x| x.checked_sub(treasury_fee)),
        );
        let debt_repaid = rest.min(debt);
        let leftover = rest - debt_repaid;
        let bad_debt = debt - debt_repaid;

        self.settle_killed_debt(position_id, share, debt, debt_repaid);
        self.add_base(debt_repaid);
        if !bad_debt.is_zero() {
            let total_bad_debt = self.total_bad_debt.get_or_default();
            self.total_bad_debt
                .set(self.checked(total_bad_debt.checked_add(bad_debt)));
        }

        self.send(caller, bounty);
        if !treasury_fee.is_zero() {
            let treasury = match config.treasury() {
                Some(treasury) => treasury,
                None => self.env().revert(VaultError::NotInitialized),
            };
            self.send(treasury, treasury_fee);
        }
        self.send(position.owner, leftover);

        self.env().emit_event(events::Killed {
            position_id,
            killer: caller,
            owner: position.owner,
            proceeds,
            bounty,
            treasury_fee,
            debt_repaid,
            leftover,
            bad_debt,
        });
    }

    /// Issue debt shares worth `value` to a position
    fn add_debt(&mut self, position_id: u64, position: &mut Position, value: U256) {
        let share = self.debt_val_to_share(value);
        position.debt_share = self.checked(position.debt_share.checked_add(share));
        let total_share = self.vault_debt_share.get_or_default();
        self.vault_debt_share
            .set(self.checked(total_share.checked_add(share)));
        let debt_val = self.vault_debt_val.get_or_default();
        self.vault_debt_val
            .set(self.checked(debt_val.checked_add(value)));

        self.env().emit_event(events::AddDebt {
            position_id,
            debt_share: share,
            debt_val: value,
        });
    }

    /// Redeem all debt shares of a position; returns the debt value removed
    fn remove_debt(&mut self, position_id: u64, position: &mut Position) -> U256 {
        let share = position.debt_share;
        if share.is_zero() {
            return U256::zero();
        }
        let value = self.debt_share_to_val(share);
        let total_share = self.vault_debt_share.get_or_default();
        self.vault_debt_share
            .set(self.checked(total_share.checked_sub(share)));
        let debt_val = self.vault_debt_val.get_or_default();
        self.vault_debt_val
            .set(self.checked(debt_val.checked_sub(value)));
        position.debt_share = U256::zero();

        self.env().emit_event(events::RemoveDebt {
            position_id,
            debt_share: share,
            debt_val: value,
        });
        value
    }

    /// Retire a killed position's `share` (worth `debt`) after `repaid` came back.
    ///
    /// Only `repaid` leaves `vault_debt_val`. On a shortfall the shares matching
    /// the repaid value are burned and the rest stay outstanding in
    /// `bad_debt_share`, so the unrecovered debt never sits on the books
    /// without shares behind it.
    fn settle_killed_debt(&mut self, position_id: u64, share: U256, debt: U256, repaid: U256) {
        let total_share = self.vault_debt_share.get_or_default();
        let debt_val = self.vault_debt_val.get_or_default();
        let burned = if repaid >= debt {
            share
        } else {
            self.checked(mul_div_down(repaid, total_share, debt_val)).min(share)
        };
        self.vault_debt_share
            .set(self.checked(total_share.checked_sub(burned)));
        self.vault_debt_val
            .set(self.checked(debt_val.checked_sub(repaid)));
        if burned < share {
            let bad_debt_share = self.bad_debt_share.get_or_default();
            self.bad_debt_share
                .set(self.checked(bad_debt_share.checked_add(share - burned)));
        }

        self.env().emit_event(events::RemoveDebt {
            position_id,
            debt_share: share,
            debt_val: repaid,
        });
    }

    fn load_position(&self, position_id: u64) -> Position {
        match self.positions.get(&position_id) {
            Some(position) => position,
            None => self.env().revert(VaultError::PositionNotFound),
        }
    }

    fn add_base(&mut self, amount: U256) {
        let total_base = self.total_base.get_or_default();
        self.total_base
            .set(self.checked(total_base.checked_add(amount)));
    }

    fn sub_base(&mut self, amount: U256) {
        let total_base = self.total_base.get_or_default();
        match total_base.checked_sub(amount) {
            Some(rest) => self.total_base.set(rest),
            None => self.env().revert(VaultError::InsufficientPoolLiquidity),
        }
    }

    /// Base asset that arrived since `before` was sampled
    fn received_since(&self, before: U256) -> U256 {
        let after = self.base().balance_of(self.env().self_address());
        match after.checked_sub(before) {
            Some(received) => received,
            None => self.env().revert(VaultError::StrategyMisreported),
        }
    }

    fn send(&self, to: Address, amount: U256) {
        if !amount.is_zero() {
            self.base().transfer(to, amount);
        }
    }

    fn base(&self) -> Cep18AssetContractRef {
        let token = self.base_token.get_or_revert_with(VaultError::NotInitialized);
        Cep18AssetContractRef::new(self.env().clone(), token)
    }

    fn config_ref(&self) -> VaultConfigContractRef {
        let config = self.config.get_or_revert_with(VaultError::NotInitialized);
        VaultConfigContractRef::new(self.env().clone(), config)
    }

    fn strategy(&self, strategy: Address) -> StrategyContractRef {
        StrategyContractRef::new(self.env().clone(), strategy)
    }
}

impl Vault {
    /// Run `f` with the re-entrancy flag held; a nested entry reverts.
    fn non_reentrant<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        if self.entered.get_or_default() {
            self.env().revert(VaultError::ReentrantCall);
        }
        self.entered.set(true);
        let result = f(self);
        self.entered.set(false);
        result
    }
}
