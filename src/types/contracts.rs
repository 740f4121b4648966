use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface ITokenBridge {
        /// Emitted on the target chain when a transfer that originated with
        /// `sourceTxHash` has been paid out to `recipient`.
        event BridgeSettled(bytes32 indexed sourceTxHash, address indexed recipient, uint256 amount);

        function bridgeTokens(address token, uint256 amount, uint256 toChainId, address recipient) external payable;
        function pause() external;
        function unpause() external;
    }
}
