use alloy_sol_types::sol;

sol! {
    interface ISavingsPool {
        #[derive(Debug, PartialEq, Eq)]
        event Joined(address indexed member, uint256 contribution);

        #[derive(Debug, PartialEq, Eq)]
        event PoolStarted(uint256 startTime, uint256 totalCycles);

        #[derive(Debug, PartialEq, Eq)]
        event Contributed(uint256 indexed cycle, address indexed member, uint256 amount);

        #[derive(Debug, PartialEq, Eq)]
        event CollateralLiquidated(uint256 indexed cycle, address indexed member, uint256 amount);

        #[derive(Debug, PartialEq, Eq)]
        event WinnerSelected(uint256 indexed cycle, address indexed winner, uint256 prize);

        #[derive(Debug, PartialEq, Eq)]
        event YieldDistributed(uint256 indexed cycle, address indexed winner, uint256 yieldBonus, uint256 compounded);

        #[derive(Debug, PartialEq, Eq)]
        event CycleEnded(uint256 indexed cycle);

        #[derive(Debug, PartialEq, Eq)]
        event PoolCompleted();

        function getPoolInfo() external view returns (
            uint8 state,
            uint8 maxMembers,
            uint256 currentMembers,
            uint256 contributionPerPeriod,
            uint256 periodDuration,
            uint8 yieldBonusSplit,
            uint256 currentCycle,
            uint256 totalCycles,
            uint256 cycleStartTime
        );

        function pendingNonce() external view returns (uint256);

        function cycleCompleted(uint256 cycle) external view returns (bool);

        function cycleContributionCount(uint256 cycle) external view returns (uint256);

        function autoDraw() external;
    }
}
