//! Principal comparison for cross-contract authorization.
//!
//! On Casper 2.0 the same contract can surface as a package hash or as an
//! entity address depending on the call path, so a plain `==` between a stored
//! address and `env().caller()` can fail for the right caller.

use alloc::string::String;
use alloc::vec::Vec;
use odra::prelude::*;

/// Extract the first 64-char hex hash from the debug form of an address.
pub fn extract_hash_hex(debug_str: &str) -> Option<String> {
    let chars: Vec<char> = debug_str.chars().collect();
    for i in 0..chars.len().saturating_sub(63) {
        let slice: String = chars[i..i + 64].iter().collect();
        if slice.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(slice.to_lowercase());
        }
    }
    None
}

/// True when `caller` is the principal registered as `expected`.
pub fn is_same_principal(expected: &Address, caller: &Address) -> bool {
    if expected == caller {
        return true;
    }
    if let (Some(expected_pkg), Some(caller_pkg)) = (
        expected.as_contract_package_hash(),
        caller.as_contract_package_hash(),
    ) {
        return expected_pkg == caller_pkg;
    }
    match (
        extract_hash_hex(&format!("{:?}", expected)),
        extract_hash_hex(&format!("{:?}", caller)),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// True when `caller` is a contract rather than an account.
pub fn is_contract(caller: &Address) -> bool {
    caller.as_contract_package_hash().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_hash_from_debug_output() {
        let hex = "ab".repeat(32);
        let debug = format!("Contract(ContractPackageHash({}))", hex);
        assert_eq!(extract_hash_hex(&debug), Some(hex));
    }

    #[test]
    fn short_strings_have_no_hash() {
        assert_eq!(extract_hash_hex("Account(1234)"), None);
    }
}
