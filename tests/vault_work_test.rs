//! Position tests
//!
//! Opening, adjusting and closing leveraged positions through `work`, the
//! work factor gate, debt share accounting and strategy registry checks.

mod common;

use odra::casper_types::U256;
use odra::host::{Deployer, HostRef};
use odra::prelude::Addressable;

use common::*;
use leverage_vault::holding_strategy::{HoldingStrategy, HoldingStrategyInitArgs};
use leverage_vault::vault::VaultError;

// ==========================================
// Opening positions
// ==========================================

#[test]
fn test_open_position_moves_funds_and_records_debt() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));

    let id = f.open(f.borrower, tokens(10), tokens(15));

    assert_eq!(id, 1);
    assert_eq!(f.vault.next_position_id(), 2);
    let position = f.vault.position(id).unwrap();
    assert_eq!(position.owner, f.borrower);
    assert_eq!(position.strategy, f.strategy.address());
    assert_eq!(position.debt_share, tokens(15));

    let info = f.vault.position_info(id);
    assert_eq!(info.health, tokens(25));
    assert_eq!(info.debt_val, tokens(15));

    assert_eq!(f.strategy.collateral_of(id), tokens(25));
    assert_eq!(f.vault.total_base(), tokens(85));
    assert_eq!(f.vault.vault_debt_val(), tokens(15));
    assert_eq!(f.vault.total_token(), tokens(100));
    assert_eq!(f.balance(f.borrower), tokens(FUNDING - 10));
}

#[test]
fn test_position_ids_are_sequential() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));

    assert_eq!(f.open(f.borrower, tokens(10), tokens(5)), 1);
    assert_eq!(f.open(f.borrower, tokens(10), tokens(5)), 2);
    assert_eq!(f.open(f.lender, tokens(10), U256::zero()), 3);
}

#[test]
fn test_work_factor_boundary() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let strategy = f.strategy.address();

    // 7 / (3 + 7) = 70% exactly
    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, strategy, tokens(3), tokens(7) + U256::one(), U256::zero(), hold()),
        Err(VaultError::BadWorkFactor.into())
    );
    let id = f.open(f.borrower, tokens(3), tokens(7));
    assert_eq!(f.vault.position_info(id).debt_val, tokens(7));
}

#[test]
fn test_leverage_limits_with_small_pool() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(3));
    let strategy = f.strategy.address();

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, strategy, milli(300), tokens(1), U256::zero(), hold()),
        Err(VaultError::BadWorkFactor.into())
    );

    let id = f.open(f.borrower, tokens(1), tokens(1));
    assert_eq!(f.vault.position_info(id).debt_val, tokens(1));
    assert_eq!(f.vault.total_base(), tokens(2));
}

#[test]
fn test_debt_below_minimum_reverts() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, f.strategy.address(), tokens(1), milli(500), U256::zero(), hold()),
        Err(VaultError::DebtTooSmall.into())
    );
}

#[test]
fn test_loan_above_idle_liquidity_reverts() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(10));

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, f.strategy.address(), tokens(100), tokens(11), U256::zero(), hold()),
        Err(VaultError::InsufficientPoolLiquidity.into())
    );
}

#[test]
fn test_fully_utilized_pool_lends_nothing_more() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(10));
    f.open(f.borrower, tokens(10), tokens(10));

    assert_eq!(f.vault.utilization_bps(), 10_000);
    assert_eq!(f.vault.total_base(), U256::zero());

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, f.strategy.address(), tokens(10), U256::one(), U256::zero(), hold()),
        Err(VaultError::InsufficientPoolLiquidity.into())
    );
}

#[test]
fn test_min_back_guards_returned_amount() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(5));

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(
            id,
            f.strategy.address(),
            U256::zero(),
            U256::zero(),
            tokens(3),
            unwind(tokens(2)),
        ),
        Err(VaultError::InsufficientReturn.into())
    );
}

// ==========================================
// Adjusting and closing
// ==========================================

#[test]
fn test_partial_unwind_repays_debt_first() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.borrower);
    f.vault.work(
        id,
        f.strategy.address(),
        U256::zero(),
        U256::zero(),
        U256::zero(),
        unwind(tokens(5)),
    );

    let info = f.vault.position_info(id);
    assert_eq!(info.debt_val, tokens(10));
    assert_eq!(info.health, tokens(20));
    assert_eq!(f.vault.total_base(), tokens(90));
    assert_eq!(f.balance(f.borrower), tokens(FUNDING - 10));
}

#[test]
fn test_close_repays_everything_and_refunds_rest() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.borrower);
    f.vault
        .work(id, f.strategy.address(), U256::zero(), U256::zero(), U256::zero(), close());

    assert_eq!(f.vault.position(id).unwrap().debt_share, U256::zero());
    assert_eq!(f.vault.vault_debt_val(), U256::zero());
    assert_eq!(f.vault.total_debt_share(), U256::zero());
    assert_eq!(f.vault.total_base(), tokens(100));
    assert_eq!(f.strategy.collateral_of(id), U256::zero());
    assert_eq!(f.balance(f.borrower), tokens(FUNDING));
}

#[test]
fn test_add_collateral_and_borrow_more() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.borrower);
    f.vault
        .work(id, f.strategy.address(), tokens(5), tokens(5), U256::zero(), hold());

    let info = f.vault.position_info(id);
    assert_eq!(info.debt_val, tokens(20));
    assert_eq!(info.health, tokens(35));
}

#[test]
fn test_work_on_foreign_position_reverts() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.lender);
    assert_eq!(
        f.vault.try_work(
            id,
            f.strategy.address(),
            U256::zero(),
            U256::zero(),
            U256::zero(),
            close(),
        ),
        Err(VaultError::NotPositionOwner.into())
    );
}

#[test]
fn test_work_with_other_strategy_reverts() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(id, f.lender, U256::zero(), U256::zero(), U256::zero(), close()),
        Err(VaultError::WrongStrategy.into())
    );
}

#[test]
fn test_unknown_position_reverts() {
    let mut f = Fixture::new();
    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(
            42,
            f.strategy.address(),
            U256::zero(),
            U256::zero(),
            U256::zero(),
            hold(),
        ),
        Err(VaultError::PositionNotFound.into())
    );
}

// ==========================================
// Debt shares
// ==========================================

#[test]
fn test_borrowers_share_interest_pro_rata() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let first = f.open(f.borrower, tokens(10), tokens(15));
    let second = f.open(f.lender, tokens(10), tokens(15));
    assert_eq!(f.vault.total_debt_share(), tokens(30));

    f.advance_seconds(SECONDS_PER_YEAR);
    f.vault.accrue();

    let first_debt = f.vault.position_info(first).debt_val;
    let second_debt = f.vault.position_info(second).debt_val;
    assert_eq!(first_debt, second_debt);
    assert!(first_debt > tokens(15));

    // Once the first closes, the second owns all remaining debt
    f.env.set_caller(f.borrower);
    f.vault
        .work(first, f.strategy.address(), U256::zero(), U256::zero(), U256::zero(), close());
    assert_eq!(
        f.vault.position_info(second).debt_val,
        f.vault.vault_debt_val()
    );
}

#[test]
fn test_late_borrower_gets_fewer_debt_shares() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let first = f.open(f.borrower, tokens(10), tokens(15));
    f.advance_seconds(SECONDS_PER_YEAR);
    let second = f.open(f.lender, tokens(10), tokens(15));

    let first_share = f.vault.position(first).unwrap().debt_share;
    let second_share = f.vault.position(second).unwrap().debt_share;
    assert!(second_share < first_share);
    // Rounded up in the vault's favour, by at most one unit
    let second_debt = f.vault.position_info(second).debt_val;
    assert!(second_debt >= tokens(15));
    assert!(second_debt <= tokens(15) + U256::one());

    // From here on both debts grow by the same factor
    let first_before = f.vault.position_info(first).debt_val;
    f.advance_seconds(SECONDS_PER_YEAR);
    f.vault.accrue();
    let first_after = f.vault.position_info(first).debt_val;
    let second_after = f.vault.position_info(second).debt_val;
    assert!(first_after > first_before);
    assert!(second_after > second_debt);

    // Value per share matches up to flooring
    let lhs = first_after * second_share;
    let rhs = second_after * first_share;
    assert!(lhs < rhs + first_share);
    assert!(rhs < lhs + second_share);
}

#[test]
fn test_debt_share_conversions_on_empty_book() {
    let f = Fixture::new();
    assert_eq!(f.vault.debt_val_to_share(tokens(7)), tokens(7));
    assert_eq!(f.vault.debt_share_to_val(tokens(7)), U256::zero());
}

// ==========================================
// Strategy registry
// ==========================================

#[test]
fn test_unregistered_strategy_reverts() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let rogue = HoldingStrategy::deploy(
        &f.env,
        HoldingStrategyInitArgs {
            vault: f.vault.address(),
            base_token: f.base.address(),
        },
    );

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, rogue.address(), tokens(10), tokens(5), U256::zero(), hold()),
        Err(VaultError::UnregisteredStrategy.into())
    );
}

#[test]
fn test_retired_strategy_rejects_work() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));

    f.env.set_caller(f.owner);
    f.config.set_worker_liquidated(f.strategy.address(), true);

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(0, f.strategy.address(), tokens(10), U256::zero(), U256::zero(), hold()),
        Err(VaultError::UnregisteredStrategy.into())
    );
}

#[test]
fn test_closed_strategy_accepts_no_new_debt() {
    let mut f = Fixture::new();
    f.deposit(f.lender, tokens(100));
    let id = f.open(f.borrower, tokens(10), tokens(15));

    f.env.set_caller(f.owner);
    f.config.set_worker_opened(f.strategy.address(), false);

    f.env.set_caller(f.borrower);
    assert_eq!(
        f.vault.try_work(id, f.strategy.address(), U256::zero(), tokens(1), U256::zero(), hold()),
        Err(VaultError::StrategyNotAcceptingDebt.into())
    );

    // Deleveraging is still allowed
    f.vault
        .work(id, f.strategy.address(), U256::zero(), U256::zero(), U256::zero(), close());
    assert_eq!(f.vault.vault_debt_val(), U256::zero());
}
