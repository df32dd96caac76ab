//! Key-addressed ledger and transfer engine.
//!
//! Accounts hold fixed-point balances; payment keys (tax ids, emails,
//! phone numbers or random tokens) resolve to the account that owns them;
//! every transfer debits one account, credits another and writes exactly
//! one canonical transaction record under an all-or-nothing commit, so
//! money is never created or destroyed and readers never observe a
//! half-applied transfer.
//!
//! Layering:
//! - [`domain`]: amounts, accounts, keys, transactions and the pure
//!   balance arithmetic.
//! - [`storage`]: the persistence boundary (account store, append-only
//!   ledger, key registry) plus in-memory implementations.
//! - [`engine`]: the transfer protocol, operator fee/levy application and
//!   the statement reader.

pub mod domain;
pub mod engine;
pub mod prelude;
pub mod storage;
