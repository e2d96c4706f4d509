//! Common contract interfaces shared across lending pools.

use alloy::sol;

// ERC20 interface for the liquidator's underlying balances and approvals
sol! {
    /// Standard ERC20 interface (subset for liquidation needs)
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function approve(address spender, uint256 amount) external returns (bool success);
    }
}
