//! ABI of the on-chain key/value store.

use alloy::sol;

sol! {
    /// Owner-administered key/value storage contract.
    #[derive(Debug, PartialEq, Eq)]
    interface ISimpleStorage {
        function setValue(string key, uint256 value) external;
        function getValue(string key) external view returns (uint256);
        function removeValue(string key) external;
        function hasKey(string key) external view returns (bool);
    }
}
