//! Lending pool contract bindings.
//!
//! The pool contracts are deployed separately; only the functions the bot
//! calls are declared here.

use alloy::sol;

// Collateral market: solvency of a borrower across the pool's borrowables
sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface ICollateral {
        function accountLiquidity(address account)
            external
            returns (uint256 liquidity, uint256 shortfall);
    }
}

// Router: repays debt on behalf of a borrower and transfers seized collateral
sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IRouter02 {
        function liquidate(
            address borrowable,
            uint256 amountMax,
            address borrower,
            address to,
            uint256 deadline
        ) external returns (uint256 amount, uint256 seizeTokens);
    }
}
