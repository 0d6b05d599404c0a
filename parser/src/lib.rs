//! Табличный разбор выписок SWIFT MT940.
//!
//! Каждый тег описан грамматикой в [`registry::TagRegistry`]. Значение тега
//! сопоставляется с грамматикой, компоненты приводятся к типам, а
//! [`statement::StatementParser`] собирает из потока тегов одну выписку
//! [`model::Transactions`].

pub mod construct;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod mt940;
pub mod pattern;
pub mod registry;
pub mod statement;
pub mod tags;

mod utils;

pub use crate::diagnostics::{Diagnostic, DiagnosticSink, Level, LogSink, NullSink};
pub use crate::error::{ParseError, TagError};
pub use crate::model::{
    Amount, Balance, BalanceSlot, Balances, Direction, NonSwiftRecord, Transaction, Transactions,
};
pub use crate::mt940::{Block, Mt940Data, split_blocks, split_messages};
pub use crate::registry::TagRegistry;
pub use crate::statement::{
    OrderingPolicy, ParserOptions, State, StatementParser, UnknownTagPolicy, parse_blocks,
    parse_blocks_collecting,
};
pub use crate::tags::{Scope, TagDefinition, TagId, TagKind};
