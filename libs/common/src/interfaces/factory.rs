use alloy_sol_types::sol;

sol! {
    interface ISavingsFactory {
        #[derive(Debug, PartialEq, Eq)]
        event PoolCreated(
            address indexed pool,
            address indexed creator,
            uint8 maxMembers,
            uint256 contributionPerPeriod,
            uint256 periodDuration,
            uint8 yieldBonusSplit,
            string poolName,
            string poolDescription
        );

        function getPoolCount() external view returns (uint256);

        function getPool(uint256 index) external view returns (address);

        function clientWalletAddress() external view returns (address);
    }
}
