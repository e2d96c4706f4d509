//! Position discovery for the liquidation bot.
//!
//! This crate provides:
//! - Borrow position records as mirrored by the lending protocol's subgraph
//! - The [`PositionSource`] trait consumed by the pagination loop
//! - A GraphQL client paging through borrowers with active debt

mod positions;
mod subgraph;

pub use positions::{BorrowPosition, Borrower, PageOutcome, PositionSource};
pub use subgraph::{parse_users_response, SubgraphClient, SubgraphError, USERS_QUERY};
