use alloy_sol_types::sol;

sol! {
    /// Randomness provider deposit registry. Only whitelisted consumer
    /// contracts receive randomness callbacks.
    interface IVrfDeposit {
        function isContractWhitelisted(address clientAddress, address contractAddress) external view returns (bool);

        function addContractToWhitelist(address contractAddress, uint128 callbackGasPrice, uint128 callbackGasLimit) external;
    }
}
