//! Strategy module interface.
//!
//! A strategy (worker) takes custody of a position's collateral. The vault
//! keeps the ledger and treats every strategy as untrusted: base asset
//! flowing back is measured on the vault's own balance, never taken from the
//! return value alone.

use odra::casper_types::bytesrepr::{Bytes, FromBytes, ToBytes};
use odra::casper_types::U256;
use odra::prelude::*;

/// Calls the vault makes into a registered strategy module.
///
/// Implementations must reject any caller other than their vault.
#[odra::external_contract]
pub trait Strategy {
    /// Current collateral value of a position, in base asset. Must not mutate state.
    fn health(&self, position_id: u64) -> U256;

    /// Rebalance a position's collateral. The vault transfers principal and loan
    /// before the call; any base asset handed back is transferred to the vault
    /// and its amount returned.
    fn work(&mut self, position_id: u64, owner: Address, debt: U256, data: Bytes) -> U256;

    /// Convert all collateral of a position to base asset, send it to the vault
    /// and return the amount sent.
    fn liquidate(&mut self, position_id: u64) -> U256;
}

/// What a strategy does with a position during `work`
#[odra::odra_type]
#[derive(Copy, Default)]
pub enum ActionKind {
    /// Keep everything received as collateral
    #[default]
    Hold = 0,
    /// Keep what was received, release `amount` of collateral
    Unwind = 1,
    /// Release all collateral
    Close = 2,
}

/// Payload passed through `Vault::work` to the strategy
#[odra::odra_type]
pub struct StrategyAction {
    pub kind: ActionKind,
    pub amount: U256,
}

impl StrategyAction {
    pub fn hold() -> Self {
        StrategyAction {
            kind: ActionKind::Hold,
            amount: U256::zero(),
        }
    }

    pub fn unwind(amount: U256) -> Self {
        StrategyAction {
            kind: ActionKind::Unwind,
            amount,
        }
    }

    pub fn close() -> Self {
        StrategyAction {
            kind: ActionKind::Close,
            amount: U256::zero(),
        }
    }

    /// Serialized form for the `data` argument of `work`.
    pub fn encode(&self) -> Bytes {
        Bytes::from(self.to_bytes().unwrap_or_default())
    }

    /// Parse a payload; `None` for malformed or trailing bytes.
    pub fn decode(data: &Bytes) -> Option<Self> {
        match Self::from_bytes(data.as_slice()) {
            Ok((action, rest)) if rest.is_empty() => Some(action),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_survives_encoding() {
        let action = StrategyAction::unwind(U256::from(42u64));
        assert_eq!(StrategyAction::decode(&action.encode()), Some(action));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert_eq!(StrategyAction::decode(&Bytes::from(vec![9u8])), None);
        assert_eq!(StrategyAction::decode(&Bytes::new()), None);
    }
}
