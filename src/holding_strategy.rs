//! Reference strategy module holding base asset collateral.
//!
//! Keeps each position's collateral as base asset and values it at an
//! owner-set valuation (bps of face value), which stands in for the market
//! price of whatever a real strategy would farm. Liquidation releases only the
//! valued part; the haircut stays stranded in the module.

use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;

use crate::math::{bps_of, BPS_DIVISOR};
use crate::principal::is_same_principal;
use crate::strategy::{ActionKind, StrategyAction};
use crate::tokens::Cep18AssetContractRef;

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct CollateralChanged {
        pub position_id: u64,
        pub owner: Address,
        pub received: U256,
        pub released: U256,
        pub collateral: U256,
        pub debt: U256,
    }

    #[odra::event]
    pub struct Liquidated {
        pub position_id: u64,
        pub collateral: U256,
        pub proceeds: U256,
    }

    #[odra::event]
    pub struct ValuationSet {
        pub valuation_bps: u64,
    }
}

#[odra::odra_error]
pub enum StrategyError {
    NotVault = 200,
    InvalidPayload = 201,
    InsufficientCollateral = 202,
    Unauthorized = 203,
    InvalidValuation = 204,
    NotInitialized = 205,
}

#[odra::module(
    events = [events::CollateralChanged, events::Liquidated, events::ValuationSet],
    errors = StrategyError
)]
pub struct HoldingStrategy {
    vault: Var<Address>,
    base_token: Var<Address>,
    owner: Var<Address>,

    collateral: Mapping<u64, U256>,
    total_collateral: Var<U256>,
    stranded: Var<U256>,
    valuation_bps: Var<u64>,
}

#[odra::module]
impl HoldingStrategy {
    /// Bind the strategy to its vault and the vault's base asset
    pub fn init(&mut self, vault: Address, base_token: Address) {
        self.vault.set(vault);
        self.base_token.set(base_token);
        self.owner.set(self.env().caller());
        self.total_collateral.set(U256::zero());
        self.stranded.set(U256::zero());
        self.valuation_bps.set(BPS_DIVISOR);
    }

    pub fn health(&self, position_id: u64) -> U256 {
        let collateral = self.collateral.get(&position_id).unwrap_or_default();
        self.value_of(collateral)
    }

    pub fn work(&mut self, position_id: u64, owner: Address, debt: U256, data: Bytes) -> U256 {
        self.require_vault();
        let action = match StrategyAction::decode(&data) {
            Some(action) => action,
            None => self.env().revert(StrategyError::InvalidPayload),
        };

        // Whatever sits above the accounted balance was just sent by the vault
        let received = self.unaccounted_balance();
        let current = self.collateral.get(&position_id).unwrap_or_default() + received;

        let released = match action.kind {
            ActionKind::Hold => U256::zero(),
            ActionKind::Unwind => {
                if action.amount > current {
                    self.env().revert(StrategyError::InsufficientCollateral);
                }
                action.amount
            }
            ActionKind::Close => current,
        };

        let remaining = current - released;
        self.collateral.set(&position_id, remaining);
        let total = self.total_collateral.get_or_default();
        self.total_collateral.set(total + received - released);

        if !released.is_zero() {
            let vault = self.vault_address();
            self.base().transfer(vault, released);
        }

        self.env().emit_event(events::CollateralChanged {
            position_id,
            owner,
            received,
            released,
            collateral: remaining,
            debt,
        });
        released
    }

    pub fn liquidate(&mut self, position_id: u64) -> U256 {
        self.require_vault();
        let collateral = self.collateral.get(&position_id).unwrap_or_default();
        let proceeds = self.value_of(collateral);

        self.collateral.set(&position_id, U256::zero());
        let total = self.total_collateral.get_or_default();
        self.total_collateral.set(total - collateral);
        let stranded = self.stranded.get_or_default();
        self.stranded.set(stranded + (collateral - proceeds));

        if !proceeds.is_zero() {
            let vault = self.vault_address();
            self.base().transfer(vault, proceeds);
        }

        self.env().emit_event(events::Liquidated {
            position_id,
            collateral,
            proceeds,
        });
        proceeds
    }

    /// Reprice collateral (owner only). 10_000 = face value.
    pub fn set_valuation_bps(&mut self, valuation_bps: u64) {
        if self.owner.get() != Some(self.env().caller()) {
            self.env().revert(StrategyError::Unauthorized);
        }
        if valuation_bps > BPS_DIVISOR {
            self.env().revert(StrategyError::InvalidValuation);
        }
        self.valuation_bps.set(valuation_bps);
        self.env().emit_event(events::ValuationSet { valuation_bps });
    }

    pub fn collateral_of(&self, position_id: u64) -> U256 {
        self.collateral.get(&position_id).unwrap_or_default()
    }

    pub fn total_collateral(&self) -> U256 {
        self.total_collateral.get_or_default()
    }

    /// Base asset lost to the liquidation haircut
    pub fn stranded(&self) -> U256 {
        self.stranded.get_or_default()
    }

    pub fn valuation_bps(&self) -> u64 {
        self.valuation_bps.get_or_default()
    }

    pub fn vault(&self) -> Option<Address> {
        self.vault.get()
    }

    fn require_vault(&self) {
        let vault = self.vault_address();
        if !is_same_principal(&vault, &self.env().caller()) {
            self.env().revert(StrategyError::NotVault);
        }
    }

    fn vault_address(&self) -> Address {
        self.vault.get_or_revert_with(StrategyError::NotInitialized)
    }

    fn base(&self) -> Cep18AssetContractRef {
        let token = self.base_token.get_or_revert_with(StrategyError::NotInitialized);
        Cep18AssetContractRef::new(self.env().clone(), token)
    }

    fn value_of(&self, collateral: U256) -> U256 {
        let valuation = self.valuation_bps.get_or_default();
        bps_of(collateral, valuation)
            .unwrap_or_else(|| self.env().revert(StrategyError::InvalidValuation))
    }

    fn unaccounted_balance(&self) -> U256 {
        let balance = self.base().balance_of(self.env().self_address());
        let accounted = self.total_collateral.get_or_default() + self.stranded.get_or_default();
        balance.saturating_sub(accounted)
    }
}
