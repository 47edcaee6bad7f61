//! Livenet deploy and demo binary for the Leveraged Lending Vault.
//!
//! Run with:
//! - Deploy only:           VAULT_LIVENET_MODE=deploy cargo run --bin vault_livenet --features=livenet
//! - Deploy + demo:         VAULT_LIVENET_MODE=deploy_and_demo cargo run --bin vault_livenet --features=livenet
//! - Demo on existing:      VAULT_LIVENET_MODE=demo VAULT_EXISTING_VAULT=... (all four VAULT_EXISTING_*) cargo run ...
//! - Query pool state:      VAULT_LIVENET_MODE=query VAULT_EXISTING_VAULT=... (all four VAULT_EXISTING_*) cargo run ...
//!
//! Required environment variables (Odra livenet):
//! - ODRA_CASPER_LIVENET_SECRET_KEY_PATH
//! - ODRA_CASPER_LIVENET_NODE_ADDRESS        (base URL; Odra appends "/rpc")
//! - ODRA_CASPER_LIVENET_EVENTS_URL          (required by Odra; placeholder URL is OK here)
//! - ODRA_CASPER_LIVENET_CHAIN_NAME
//!
//! Optional:
//! - ODRA_CASPER_LIVENET_DEPLOY_GAS_TOKEN    (motes)
//! - ODRA_CASPER_LIVENET_DEPLOY_GAS_VAULT    (motes; also used for config and strategy)
//! - ODRA_CASPER_LIVENET_CALL_GAS            (motes)
//! - ODRA_CASPER_LIVENET_GAS                 (legacy fallback; motes)
//! - VAULT_EXISTING_TOKEN / VAULT_EXISTING_CONFIG / VAULT_EXISTING_VAULT / VAULT_EXISTING_STRATEGY
//!   (64-hex or formatted "hash-..."/"contract-package-...")
//! - VAULT_DEMO_DEPOSIT                      (whole tokens; default: 100)
//! - VAULT_DEMO_PRINCIPAL                    (whole tokens; default: 10)
//! - VAULT_DEMO_LOAN                         (whole tokens; default: 15)

use odra::casper_types::U256;
use odra::host::{Deployer, HostRef, HostRefLoader};
use odra::prelude::*;

use leverage_vault::config::{VaultConfig, VaultConfigInitArgs, WorkerConfig};
use leverage_vault::holding_strategy::{HoldingStrategy, HoldingStrategyInitArgs};
use leverage_vault::principal::extract_hash_hex;
use leverage_vault::strategy::StrategyAction;
use leverage_vault::tokens::{BaseToken, BaseTokenInitArgs};
use leverage_vault::vault::{Vault, VaultHostRef, VaultInitArgs};

const TOKEN_DECIMALS: u8 = 18;
const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;
const MOTES_PER_CSPR: u64 = 1_000_000_000;

const DEFAULT_DEPLOY_GAS_TOKEN_MOTES: u64 = 450_000_000_000; // 450 CSPR
const DEFAULT_DEPLOY_GAS_VAULT_MOTES: u64 = 600_000_000_000; // 600 CSPR
const DEFAULT_CALL_GAS_MOTES: u64 = 50_000_000_000; // 50 CSPR

// Demo pool parameters
const DEMO_MIN_DEBT_TOKENS: u128 = 1;
const DEMO_RESERVE_POOL_BPS: u64 = 1_000;
const DEMO_KILL_BOUNTY_BPS: u64 = 500;
const DEMO_KILL_TREASURY_BPS: u64 = 0;
const DEMO_WORK_FACTOR_BPS: u64 = 7_000;
const DEMO_KILL_FACTOR_BPS: u64 = 8_000;

fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(ONE_TOKEN)
}

fn main() {
    println!("============================================");
    println!("  Leveraged Lending Vault - Livenet");
    println!("============================================\n");

    let env = odra_casper_livenet_env::env();

    let mode = std::env::var("VAULT_LIVENET_MODE").unwrap_or_else(|_| "deploy".to_string());
    let should_deploy = mode == "deploy" || mode == "deploy_and_demo";
    let should_demo = mode == "demo" || mode == "deploy_and_demo";
    let should_query = mode == "query";

    let gas_fallback = read_u64_env("ODRA_CASPER_LIVENET_GAS", DEFAULT_DEPLOY_GAS_TOKEN_MOTES);
    let deploy_gas_token = read_u64_env("ODRA_CASPER_LIVENET_DEPLOY_GAS_TOKEN", gas_fallback);
    let deploy_gas_vault =
        read_u64_env("ODRA_CASPER_LIVENET_DEPLOY_GAS_VAULT", DEFAULT_DEPLOY_GAS_VAULT_MOTES);
    let call_gas = read_u64_env("ODRA_CASPER_LIVENET_CALL_GAS", DEFAULT_CALL_GAS_MOTES);

    let deposit = read_u64_env("VAULT_DEMO_DEPOSIT", 100);
    let principal = read_u64_env("VAULT_DEMO_PRINCIPAL", 10);
    let loan = read_u64_env("VAULT_DEMO_LOAN", 15);

    let caller = env.caller();
    println!("[INFO] Mode: {}", mode);
    println!("[INFO] Caller: {:?}", caller);
    println!(
        "[INFO] Gas (motes): deploy_token={} ({} CSPR), deploy_vault={} ({} CSPR), calls={} ({} CSPR)",
        deploy_gas_token,
        deploy_gas_token / MOTES_PER_CSPR,
        deploy_gas_vault,
        deploy_gas_vault / MOTES_PER_CSPR,
        call_gas,
        call_gas / MOTES_PER_CSPR
    );
    println!(
        "[INFO] Demo params: deposit={}, principal={}, loan={}",
        deposit, principal, loan
    );
    println!();

    // ==========================================
    // Step 1: Deploy (or reuse) the base token
    // ==========================================
    let base = if should_deploy {
        println!("[STEP 1] Deploying base token...");
        env.set_gas(deploy_gas_token);
        let base = BaseToken::deploy(
            &env,
            BaseTokenInitArgs {
                name: "Vault Test Base".to_string(),
                symbol: "tBASE".to_string(),
                decimals: TOKEN_DECIMALS,
            },
        );
        println!("[OK] Base token deployed at: {:?}", base.address());
        println!();
        base
    } else {
        println!("[STEP 1] Reusing existing base token...");
        BaseToken::load(&env, existing_address("VAULT_EXISTING_TOKEN", &mode))
    };
    let base_addr = base.address();

    // ==========================================
    // Step 2: Deploy (or reuse) the config
    // ==========================================
    let config = if should_deploy {
        println!("[STEP 2] Deploying vault config...");
        env.set_gas(deploy_gas_vault);
        let config = VaultConfig::deploy(
            &env,
            VaultConfigInitArgs {
                min_debt_size: U256::from(DEMO_MIN_DEBT_TOKENS) * U256::from(ONE_TOKEN),
                reserve_pool_bps: DEMO_RESERVE_POOL_BPS,
                kill_bounty_bps: DEMO_KILL_BOUNTY_BPS,
                kill_treasury_bps: DEMO_KILL_TREASURY_BPS,
                treasury: caller,
            },
        );
        println!("[OK] Config deployed at: {:?}", config.address());
        println!("     min_debt_size: {}", config.min_debt_size());
        println!("     reserve_pool_bps: {}", config.reserve_pool_bps());
        println!();
        config
    } else {
        println!("[STEP 2] Reusing existing config...");
        VaultConfig::load(&env, existing_address("VAULT_EXISTING_CONFIG", &mode))
    };
    let config_addr = config.address();

    // ==========================================
    // Step 3: Deploy (or reuse) the vault
    // ==========================================
    let vault = if should_deploy {
        println!("[STEP 3] Deploying vault...");
        env.set_gas(deploy_gas_vault);
        let vault = Vault::deploy(
            &env,
            VaultInitArgs {
                base_token: base_addr,
                config: config_addr,
                name: "Interest Bearing tBASE".to_string(),
                symbol: "ibBASE".to_string(),
                decimals: TOKEN_DECIMALS,
            },
        );
        println!("[OK] Vault deployed at: {:?}", vault.address());
        println!();
        vault
    } else {
        println!("[STEP 3] Reusing existing vault...");
        Vault::load(&env, existing_address("VAULT_EXISTING_VAULT", &mode))
    };
    let vault_addr = vault.address();

    // ==========================================
    // Step 4: Deploy (or reuse) the holding strategy and register it
    // ==========================================
    let strategy = if should_deploy {
        println!("[STEP 4] Deploying holding strategy...");
        env.set_gas(deploy_gas_vault);
        let strategy = HoldingStrategy::deploy(
            &env,
            HoldingStrategyInitArgs {
                vault: vault_addr,
                base_token: base_addr,
            },
        );
        println!("[OK] Strategy deployed at: {:?}", strategy.address());

        println!("     Registering worker...");
        env.set_gas(call_gas);
        let mut config = config;
        config.set_worker(
            strategy.address(),
            WorkerConfig {
                work_factor_bps: DEMO_WORK_FACTOR_BPS,
                kill_factor_bps: DEMO_KILL_FACTOR_BPS,
                is_opened: true,
                is_liquidated: false,
            },
        );
        println!("[OK] Worker registered: {:?}", config.worker(strategy.address()));
        println!();
        strategy
    } else {
        println!("[STEP 4] Reusing existing strategy...");
        HoldingStrategy::load(&env, existing_address("VAULT_EXISTING_STRATEGY", &mode))
    };
    let strategy_addr = strategy.address();

    // ==========================================
    // Demo: deposit -> open leveraged position
    // ==========================================
    if should_demo {
        let mut base = base;
        let mut vault = vault;

        let deposit_amount = tokens(deposit);
        let principal_amount = tokens(principal);
        let loan_amount = tokens(loan);

        println!("[DEMO 1] Minting test tokens from faucet...");
        env.set_gas(call_gas);
        base.faucet_mint(caller, deposit_amount + principal_amount);
        println!("[OK] Balance: {}", base.balance_of(caller));

        println!("[DEMO 2] Depositing {} into the pool...", deposit);
        env.set_gas(call_gas);
        base.approve(vault_addr, deposit_amount + principal_amount);
        env.set_gas(call_gas);
        vault.deposit(deposit_amount);
        println!("[OK] Deposit complete.");
        print_pool_info(&vault, caller);

        println!(
            "[DEMO 3] Opening position: principal={} loan={}...",
            principal, loan
        );
        env.set_gas(call_gas);
        let position_id = vault.work(
            0,
            strategy_addr,
            principal_amount,
            loan_amount,
            U256::zero(),
            StrategyAction::hold().encode(),
        );
        let info = vault.position_info(position_id);
        println!("[OK] Position {} opened.", position_id);
        println!("     health: {}", info.health);
        println!("     debt: {}", info.debt_val);
        print_pool_info(&vault, caller);
    }

    // ==========================================
    // Query mode: Output pool state as JSON
    // ==========================================
    if should_query {
        let vault = VaultHostRef::new(vault_addr, env.clone());
        println!(
            "VAULT_POOL_JSON={{\"total_token\":\"{}\",\"total_base\":\"{}\",\"vault_debt_val\":\"{}\",\"reserve_pool\":\"{}\",\"total_bad_debt\":\"{}\",\"total_supply\":\"{}\",\"utilization_bps\":{},\"next_position_id\":{},\"paused\":{},\"user_shares\":\"{}\",\"user\":\"{:?}\"}}",
            vault.total_token(),
            vault.total_base(),
            vault.vault_debt_val(),
            vault.reserve_pool(),
            vault.total_bad_debt(),
            vault.total_supply(),
            vault.utilization_bps(),
            vault.next_position_id(),
            vault.is_paused(),
            vault.balance_of(caller),
            caller
        );
        return;
    }

    output_deploy_json(base_addr, config_addr, vault_addr, strategy_addr);
}

fn print_pool_info(vault: &VaultHostRef, user: Address) {
    println!("     total_token: {}", vault.total_token());
    println!("     total_base: {}", vault.total_base());
    println!("     vault_debt_val: {}", vault.vault_debt_val());
    println!("     reserve_pool: {}", vault.reserve_pool());
    println!(
        "     utilization: {} bps ({}%)",
        vault.utilization_bps(),
        vault.utilization_bps() as f64 / 100.0
    );
    println!("     user claim balance: {}", vault.balance_of(user));
    println!();
}

fn read_u64_env(name: &str, default_value: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => {
            let cleaned = raw.trim().replace('_', "");
            cleaned.parse::<u64>().unwrap_or(default_value)
        }
        Err(_) => default_value,
    }
}

fn existing_address(name: &str, mode: &str) -> Address {
    let raw = std::env::var(name)
        .unwrap_or_else(|_| panic!("{} must be set for mode={}", name, mode));
    let addr = parse_contract_address(&raw);
    println!("[OK] {}: {:?}", name, addr);
    println!();
    addr
}

fn output_deploy_json(base: Address, config: Address, vault: Address, strategy: Address) {
    let chain_name = std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME")
        .unwrap_or_else(|_| "casper-test".to_string());
    let node_url = std::env::var("ODRA_CASPER_LIVENET_NODE_ADDRESS")
        .unwrap_or_else(|_| "https://node.testnet.casper.network".to_string());

    println!(
        r#"VAULT_DEPLOY_JSON={{"chain_name":"{}","node_url":"{}","base_token_hash":"{}","config_hash":"{}","vault_hash":"{}","strategy_hash":"{}","deployed_at":"{}"}}"#,
        chain_name,
        node_url,
        format_address_hash(&base),
        format_address_hash(&config),
        format_address_hash(&vault),
        format_address_hash(&strategy),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
}

fn format_address_hash(addr: &Address) -> String {
    let debug_str = format!("{:?}", addr);
    if let (Some(start), Some(end)) = (debug_str.find('['), debug_str.rfind(']')) {
        let hex: String = debug_str[start + 1..end]
            .split(", ")
            .filter_map(|part| part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")))
            .collect();
        if !hex.is_empty() {
            return hex;
        }
    }
    extract_hash_hex(&debug_str).unwrap_or(debug_str)
}

fn parse_contract_address(raw: &str) -> Address {
    use odra::casper_types::account::AccountHash;
    use odra::casper_types::contracts::ContractPackageHash;

    fn decode_hex_32(s: &str) -> [u8; 32] {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            panic!("Invalid address hash (expected 64 hex): {}", s);
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .unwrap_or_else(|_| panic!("Invalid hex in address: {}", s));
        }
        out
    }

    let trimmed = raw.trim();
    if let Some(hex) = trimmed.strip_prefix("account-hash-") {
        return Address::Account(AccountHash::new(decode_hex_32(hex)));
    }
    let hex = trimmed
        .strip_prefix("contract-package-")
        .or_else(|| trimmed.strip_prefix("package-"))
        .or_else(|| trimmed.strip_prefix("hash-"))
        .unwrap_or(trimmed);
    Address::Contract(ContractPackageHash::new(decode_hex_32(hex)))
}
