//! Contract bindings for the protocol calls the watchtower makes.

use alloy::sol;

sol! {
    interface IRocketNodeAPI {
        function getTrusted(address nodeAddress) external view returns (bool trusted);
    }

    interface IRocketMinipoolSettings {
        function getMinipoolCheckInterval() external view returns (uint256 interval);
    }

    interface IRocketPool {
        function getPoolsCount() external view returns (uint256 count);
        function getPoolAt(uint256 index) external view returns (address minipool);
    }

    interface IRocketMinipool {
        function getStatus() external view returns (uint8 status);
        function getValidatorPubkey() external view returns (bytes pubkey);
    }

    interface IRocketNodeWatchtower {
        function logoutMinipool(address minipool) external;
        function withdrawMinipool(address minipool, uint256 balance) external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_watchtower_call_layout() {
        let call = IRocketNodeWatchtower::withdrawMinipoolCall {
            minipool: Address::repeat_byte(0xab),
            balance: U256::from(32_000_000_000_000_000_000_u128),
        };
        let data = call.abi_encode();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &IRocketNodeWatchtower::withdrawMinipoolCall::SELECTOR);
        assert_eq!(&data[16..36], &[0xab; 20]);
    }

    #[test]
    fn test_known_selector() {
        assert_eq!(
            IRocketNodeWatchtower::logoutMinipoolCall::SIGNATURE,
            "logoutMinipool(address)"
        );
        assert_eq!(IRocketPool::getPoolAtCall::SIGNATURE, "getPoolAt(uint256)");
    }
}
