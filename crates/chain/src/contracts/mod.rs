//! Contract bindings and write encoding.
//!
//! # Example
//!
//! ```rust,ignore
//! use liquidator_chain::WriteRequest;
//!
//! let approve = WriteRequest::Approve { token, spender: router, amount };
//! let tx_hash = chain.submit(&approve).await?;
//! chain.wait_for_receipt(tx_hash).await?;
//! ```

pub mod bindings;
pub mod common;

pub use bindings::{ICollateral, IRouter02};
pub use common::IERC20;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

/// A state-changing call sent from the liquidator's signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    /// Grant `spender` an allowance of `amount` over `token`.
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    /// Liquidate `borrower` through the router, repaying up to `amount`.
    Liquidate {
        router: Address,
        borrowable: Address,
        amount: U256,
        borrower: Address,
        receiver: Address,
        deadline: u64,
    },
}

impl WriteRequest {
    /// Contract the transaction is sent to.
    pub fn target(&self) -> Address {
        match self {
            Self::Approve { token, .. } => *token,
            Self::Liquidate { router, .. } => *router,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Liquidate { .. } => "liquidate",
        }
    }

    /// ABI-encoded calldata.
    pub fn calldata(&self) -> Bytes {
        match self {
            Self::Approve {
                spender, amount, ..
            } => IERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode()
            .into(),
            Self::Liquidate {
                borrowable,
                amount,
                borrower,
                receiver,
                deadline,
                ..
            } => IRouter02::liquidateCall {
                borrowable: *borrowable,
                amountMax: *amount,
                borrower: *borrower,
                to: *receiver,
                deadline: U256::from(*deadline),
            }
            .abi_encode()
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_targets_token() {
        let token = Address::repeat_byte(0xaa);
        let request = WriteRequest::Approve {
            token,
            spender: Address::repeat_byte(0xbb),
            amount: U256::from(30u64),
        };

        assert_eq!(request.target(), token);
        assert_eq!(request.kind(), "approve");
        assert_eq!(&request.calldata()[..4], IERC20::approveCall::SELECTOR.as_slice());
    }

    #[test]
    fn test_liquidate_encodes_all_arguments() {
        let router = Address::repeat_byte(0x01);
        let request = WriteRequest::Liquidate {
            router,
            borrowable: Address::repeat_byte(0x02),
            amount: U256::from(50u64),
            borrower: Address::repeat_byte(0x03),
            receiver: Address::repeat_byte(0x04),
            deadline: 1_700_003_600,
        };

        assert_eq!(request.target(), router);

        let decoded = IRouter02::liquidateCall::abi_decode(&request.calldata(), true).unwrap();
        assert_eq!(decoded.borrowable, Address::repeat_byte(0x02));
        assert_eq!(decoded.amountMax, U256::from(50u64));
        assert_eq!(decoded.borrower, Address::repeat_byte(0x03));
        assert_eq!(decoded.to, Address::repeat_byte(0x04));
        assert_eq!(decoded.deadline, U256::from(1_700_003_600u64));
    }
}
