//! Сборка выписки из потока тегов.
//!
//! Теги подаются по одному в порядке файла. Каждый тег сначала целиком
//! разбирается и проверяется, и только потом применяется к выписке, так что
//! после ошибки состояние остаётся корректным и разбор можно продолжить.

use crate::construct::{TagValue, build, match_tag};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{ParseError, TagError};
use crate::model::{Transaction, Transactions, append_text};
use crate::registry::TagRegistry;
use crate::tags::{Scope, TagKind};
use std::fmt;

/// Что делать с тегом, которого нет в таблице
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTagPolicy {
    /// вернуть [`ParseError::UnknownTag`]
    #[default]
    Error,
    /// пропустить с предупреждением
    Skip,
}

/// Что делать с тегом не на своём месте
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// вернуть [`ParseError::Ordering`]
    #[default]
    Strict,
    /// предупредить и всё равно применить
    Lenient,
}

/// Настройки разбора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    pub unknown_tags: UnknownTagPolicy,
    pub ordering: OrderingPolicy,
}

impl ParserOptions {
    pub fn unknown_tags(mut self, policy: UnknownTagPolicy) -> Self {
        self.unknown_tags = policy;
        self
    }

    pub fn ordering(mut self, policy: OrderingPolicy) -> Self {
        self.ordering = policy;
        self
    }

    /// Пропускать неизвестные теги и не ругаться на порядок
    pub fn lenient() -> Self {
        ParserOptions {
            unknown_tags: UnknownTagPolicy::Skip,
            ordering: OrderingPolicy::Lenient,
        }
    }
}

/// Состояние сборки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// начало, ждём блоки конверта {1:}..{4:} или :20:
    AwaitingEnvelope,
    /// заголовок выписки: :20:, :21:, :25:, :28:
    AwaitingStatementHeader,
    /// открывающий баланс прочитан
    InStatement,
    /// есть открытая проводка
    InTransaction,
    /// закрывающий баланс прочитан
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::AwaitingEnvelope => "AwaitingEnvelope",
            State::AwaitingStatementHeader => "AwaitingStatementHeader",
            State::InStatement => "InStatement",
            State::InTransaction => "InTransaction",
            State::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Переход по таблице; `None` - тег в этом состоянии не ожидается
fn transition(state: State, kind: TagKind) -> Option<State> {
    use State::*;

    match (kind, state) {
        (
            TagKind::BasicHeader | TagKind::ApplicationHeader | TagKind::UserHeader,
            AwaitingEnvelope,
        ) => Some(AwaitingEnvelope),
        (TagKind::TextBlock, AwaitingEnvelope) => Some(AwaitingStatementHeader),
        (TagKind::TransactionReference, AwaitingEnvelope | AwaitingStatementHeader) => {
            Some(AwaitingStatementHeader)
        }
        (
            TagKind::RelatedReference | TagKind::AccountIdentification | TagKind::StatementNumber,
            AwaitingStatementHeader,
        ) => Some(AwaitingStatementHeader),
        (TagKind::Balance(slot), AwaitingStatementHeader) if slot.is_opening() => Some(InStatement),
        (TagKind::StatementLine, InStatement | InTransaction) => Some(InTransaction),
        (TagKind::TransactionDetails | TagKind::NonSwift, InTransaction) => Some(InTransaction),
        (TagKind::Balance(slot), InStatement | InTransaction) if slot.is_closing() => Some(Closed),
        (TagKind::Balance(slot), Closed) if !slot.is_opening() && !slot.is_closing() => {
            Some(Closed)
        }
        (TagKind::Trailer, Closed) => Some(Closed),
        _ => None,
    }
}

/// Куда переходить при мягкой проверке, если тег не на своём месте
fn lenient_target(state: State, kind: TagKind) -> State {
    match kind {
        TagKind::Balance(slot) if slot.is_opening() => State::InStatement,
        TagKind::Balance(slot) if slot.is_closing() => State::Closed,
        TagKind::StatementLine => State::InTransaction,
        _ => state,
    }
}

/// Сборщик одной выписки.
///
/// Пример:
/// ```rust
/// use mt940_parser::{NullSink, ParserOptions, StatementParser, TagRegistry};
///
/// let registry = TagRegistry::standard();
/// let mut parser = StatementParser::new(registry, ParserOptions::default(), NullSink);
/// parser.feed("20", "REF123").unwrap();
/// parser.feed("25", "NL91ABNA0417164300").unwrap();
/// parser.feed("60F", "C240101EUR100,00").unwrap();
/// parser.feed("61", "240102C50,00NTRFNONREF").unwrap();
/// parser.feed("62F", "C240102EUR150,00").unwrap();
///
/// let statement = parser.finish();
/// assert_eq!(statement.transactions.len(), 1);
/// ```
pub struct StatementParser<'r, S> {
    registry: &'r TagRegistry,
    options: ParserOptions,
    sink: S,
    state: State,
    position: usize,
    statement: Transactions,
    open: Option<Transaction>,
}

impl<'r, S: DiagnosticSink> StatementParser<'r, S> {
    pub fn new(registry: &'r TagRegistry, options: ParserOptions, sink: S) -> Self {
        StatementParser {
            registry,
            options,
            sink,
            state: State::AwaitingEnvelope,
            position: 0,
            statement: Transactions::default(),
            open: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Сколько тегов уже подано (включая ошибочные)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Уже собранная часть выписки (без открытой проводки)
    pub fn statement(&self) -> &Transactions {
        &self.statement
    }

    pub fn open_transaction(&self) -> Option<&Transaction> {
        self.open.as_ref()
    }

    /// Разбирает один тег и применяет его к выписке.
    ///
    /// При ошибке выписка не меняется.
    pub fn feed(&mut self, tag: &str, value: &str) -> Result<(), TagError> {
        self.position += 1;
        let position = self.position;
        let fail = |kind: ParseError| TagError::new(position, tag, kind);

        let registry = self.registry;
        let Some(definition) = registry.get(tag) else {
            return match self.options.unknown_tags {
                UnknownTagPolicy::Error => Err(fail(ParseError::UnknownTag(tag.to_string()))),
                UnknownTagPolicy::Skip => {
                    self.sink.emit(Diagnostic::warning(
                        position,
                        tag,
                        format!("skipped unknown tag, value {value:?}"),
                    ));
                    Ok(())
                }
            };
        };

        let components = match_tag(definition, value).map_err(fail)?;
        let got: Vec<String> = components
            .iter()
            .map(|(name, part)| format!("{name}={part:?}"))
            .collect();
        self.sink.emit(Diagnostic::debug(
            position,
            tag,
            format!(
                "matched ({}) {value:?} against {}, got: {}",
                value.len(),
                definition.pattern(),
                got.join(", ")
            ),
        ));

        let parsed = build(definition, &components, &self.statement).map_err(fail)?;

        let next = match transition(self.state, definition.kind()) {
            Some(next) => next,
            None => {
                let err = ParseError::Ordering {
                    tag: tag.to_string(),
                    state: self.state.to_string(),
                };
                match self.options.ordering {
                    OrderingPolicy::Strict => return Err(fail(err)),
                    OrderingPolicy::Lenient => {
                        let message = format!("{err}, applied anyway");
                        self.sink.emit(Diagnostic::warning(position, tag, message));
                        lenient_target(self.state, definition.kind())
                    }
                }
            }
        };

        self.apply(definition.scope(), parsed);
        self.state = if next == State::InTransaction && self.open.is_none() {
            // :86:/:NS: без проводки при мягкой проверке
            self.state
        } else {
            next
        };
        if self.state != State::InTransaction {
            self.close_open_transaction();
        }

        Ok(())
    }

    /// Значение тега с областью `Transaction` дописывается к открытой
    /// проводке. Без открытой проводки (только при мягкой проверке) и для
    /// области `Statement` оно идёт в выписку.
    fn apply(&mut self, scope: Scope, value: TagValue) {
        if let TagValue::StatementLine(transaction) = value {
            self.close_open_transaction();
            self.open = Some(transaction);
            return;
        }

        if scope == Scope::Transaction
            && let Some(transaction) = self.open.as_mut()
        {
            match value {
                TagValue::TransactionDetails(details) => {
                    transaction.append_details(&details);
                    return;
                }
                TagValue::NonSwift(records) => {
                    transaction.non_swift.extend(records);
                    return;
                }
                _ => {}
            }
        }

        self.apply_to_statement(value);
    }

    fn apply_to_statement(&mut self, value: TagValue) {
        let statement = &mut self.statement;
        match value {
            TagValue::BasicHeader(header) => statement.envelope.basic_header = Some(header),
            TagValue::ApplicationHeader(header) => {
                statement.envelope.application_header = Some(header)
            }
            TagValue::UserHeader(text) => statement.envelope.user_header = Some(text),
            TagValue::TextBlock(text) => statement.envelope.text_block = Some(text),
            TagValue::Trailer(text) => statement.envelope.trailer = Some(text),
            TagValue::TransactionReference(reference) => {
                statement.reference_number = Some(reference)
            }
            TagValue::RelatedReference(reference) => statement.related_reference = Some(reference),
            TagValue::AccountIdentification(account) => {
                statement.account_identification = Some(account)
            }
            TagValue::StatementNumber {
                statement_number,
                sequence_number,
            } => {
                statement.statement_number = Some(statement_number);
                statement.sequence_number = sequence_number;
            }
            TagValue::Balance(slot, balance) => statement.balances.set(slot, balance),
            TagValue::StatementLine(transaction) => statement.transactions.push(transaction),
            TagValue::TransactionDetails(details) => {
                append_text(&mut statement.information_to_account_owner, &details)
            }
            TagValue::NonSwift(records) => statement.non_swift.extend(records),
        }
    }

    fn close_open_transaction(&mut self) {
        if let Some(transaction) = self.open.take() {
            self.statement.transactions.push(transaction);
        }
    }

    /// Завершает разбор: открытая проводка добавляется в выписку
    pub fn finish(mut self) -> Transactions {
        self.close_open_transaction();
        self.statement
    }
}

/// Разбирает поток тегов, останавливаясь на первой ошибке
pub fn parse_blocks<I, T, V, S>(
    registry: &TagRegistry,
    options: ParserOptions,
    sink: S,
    blocks: I,
) -> Result<Transactions, TagError>
where
    I: IntoIterator<Item = (T, V)>,
    T: AsRef<str>,
    V: AsRef<str>,
    S: DiagnosticSink,
{
    let mut parser = StatementParser::new(registry, options, sink);
    for (tag, value) in blocks {
        parser.feed(tag.as_ref(), value.as_ref())?;
    }
    Ok(parser.finish())
}

/// Разбирает поток тегов целиком, собирая все ошибки.
///
/// Ошибочные теги пропускаются, остальные применяются.
pub fn parse_blocks_collecting<I, T, V, S>(
    registry: &TagRegistry,
    options: ParserOptions,
    sink: S,
    blocks: I,
) -> (Transactions, Vec<TagError>)
where
    I: IntoIterator<Item = (T, V)>,
    T: AsRef<str>,
    V: AsRef<str>,
    S: DiagnosticSink,
{
    let mut parser = StatementParser::new(registry, options, sink);
    let mut errors = Vec::new();
    for (tag, value) in blocks {
        if let Err(err) = parser.feed(tag.as_ref(), value.as_ref()) {
            errors.push(err);
        }
    }
    (parser.finish(), errors)
}
