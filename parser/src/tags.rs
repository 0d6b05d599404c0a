//! Определения тегов MT940.
//!
//! Форматы полей (нотация SWIFT):
//!
//! ```text
//!     [] = необязательно
//!     !  = фиксированная длина
//!     a  = буквы
//!     x  = любой текст, включая пробелы и '/'
//!     d  = число с десятичной запятой
//!     c  = код из списка / буквы и цифры
//!     n  = цифры
//! ```

use crate::error::ParseError;
use crate::model::BalanceSlot;
use crate::pattern::{
    Charset::*, Element, Pattern, Width::*, anon, field, literal, named, optional, repeated,
};
use serde::Serialize;
use std::fmt;

/// Идентификатор тега: числовой (`20`) или с буквой (`60F`, `NS`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagId {
    Numeric(u8),
    Alphanumeric(&'static str),
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagId::Numeric(n) => write!(f, "{n}"),
            TagId::Alphanumeric(s) => f.write_str(s),
        }
    }
}

/// К чему относится значение тега
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    /// к выписке целиком
    Statement,
    /// к текущей открытой проводке
    Transaction,
}

/// Что строится из компонентов тега
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    BasicHeader,
    ApplicationHeader,
    UserHeader,
    TextBlock,
    Trailer,
    TransactionReference,
    RelatedReference,
    AccountIdentification,
    StatementNumber,
    Balance(BalanceSlot),
    StatementLine,
    TransactionDetails,
    NonSwift,
}

impl TagKind {
    pub fn scope(&self) -> Scope {
        match self {
            TagKind::StatementLine | TagKind::TransactionDetails | TagKind::NonSwift => {
                Scope::Transaction
            }
            _ => Scope::Statement,
        }
    }
}

/// Неизменяемое описание одного тега
#[derive(Debug, Clone)]
pub struct TagDefinition {
    id: TagId,
    name: &'static str,
    slug: &'static str,
    kind: TagKind,
    scope: Scope,
    pattern: Pattern,
    sub_pattern: Option<Pattern>,
}

impl TagDefinition {
    pub fn new(
        id: TagId,
        name: &'static str,
        slug: &'static str,
        kind: TagKind,
        notation: &'static str,
        elements: Vec<Element>,
    ) -> Result<Self, ParseError> {
        let pattern = compile(id, notation, elements)?;
        Ok(TagDefinition {
            id,
            name,
            slug,
            kind,
            scope: kind.scope(),
            pattern,
            sub_pattern: None,
        })
    }

    /// Грамматика отдельной записи для многострочных тегов (:NS:)
    pub fn with_sub_pattern(
        mut self,
        notation: &'static str,
        elements: Vec<Element>,
    ) -> Result<Self, ParseError> {
        self.sub_pattern = Some(compile(self.id, notation, elements)?);
        Ok(self)
    }

    /// Переопределяет область, заданную видом тега
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slug(&self) -> &'static str {
        self.slug
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn sub_pattern(&self) -> Option<&Pattern> {
        self.sub_pattern.as_ref()
    }
}

impl fmt::Display for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}: {}", self.id, self.name)
    }
}

fn compile(
    id: TagId,
    notation: &'static str,
    elements: Vec<Element>,
) -> Result<Pattern, ParseError> {
    Pattern::compile(notation, elements).map_err(|source| ParseError::InvalidPattern {
        tag: id.to_string(),
        source,
    })
}

/// 1!a6!n3!a15d - общий формат семейства балансов
fn balance_elements() -> Vec<Element> {
    vec![
        field("status", OneOf("DC"), Fixed(1)),
        field("year", Numeric, Fixed(2)),
        field("month", Numeric, Fixed(2)),
        field("day", Numeric, Fixed(2)),
        field("currency", Alpha, Fixed(3)),
        // 15d, запятая входит в длину
        field("amount", Decimal, UpTo(16)),
    ]
}

fn balance(id: TagId, name: &'static str, slot: BalanceSlot) -> Result<TagDefinition, ParseError> {
    TagDefinition::new(
        id,
        name,
        slot.slug(),
        TagKind::Balance(slot),
        "1!a6!n3!a15d",
        balance_elements(),
    )
}

fn statement_number(id: TagId) -> Result<TagDefinition, ParseError> {
    TagDefinition::new(
        id,
        "Statement number",
        "statement_number",
        TagKind::StatementNumber,
        "5n[/5n]",
        vec![
            field("statement_number", Numeric, Range(1, 5)),
            optional(vec![
                literal("/"),
                field("sequence_number", Numeric, Range(1, 5)),
            ]),
        ],
    )
}

fn statement_line() -> Result<TagDefinition, ParseError> {
    TagDefinition::new(
        TagId::Numeric(61),
        "Statement line",
        "statement",
        TagKind::StatementLine,
        "6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][34x]",
        vec![
            // дата валютирования YYMMDD
            field("year", Numeric, Fixed(2)),
            field("month", Numeric, Fixed(2)),
            field("day", Numeric, Fixed(2)),
            // дата проводки MMDD
            optional(vec![field("entry_month", Numeric, Fixed(2))]),
            optional(vec![field("entry_day", Numeric, Fixed(2))]),
            field("status", Mark, Fixed(1)),
            // третья буква кода валюты, если нужна
            optional(vec![field("funds_code", Alpha, Fixed(1))]),
            field("amount", Decimal, Range(1, 15)),
            optional(vec![field("id", TypeCode, Fixed(1))]),
            field("customer_reference", Text, UpTo(16)),
            optional(vec![literal("//"), field("bank_reference", Text, UpTo(16))]),
            // дополнительные сведения, обычно на отдельной строке
            optional(vec![
                optional(vec![literal("\n")]),
                field("extra_details", Text, UpTo(34)),
            ]),
        ],
    )
}

fn non_swift() -> Result<TagDefinition, ParseError> {
    TagDefinition::new(
        TagId::Alphanumeric("NS"),
        "Non-swift extension",
        "non_swift",
        TagKind::NonSwift,
        "2!n35x",
        vec![named(
            "non_swift",
            vec![
                anon(Numeric, Fixed(2)),
                anon(Text, UpTo(35)),
                repeated(vec![
                    literal("\n"),
                    anon(Numeric, Fixed(2)),
                    anon(Text, UpTo(35)),
                ]),
            ],
        )],
    )?
    .with_sub_pattern(
        "2!n35x",
        vec![
            field("ns_id", Numeric, Fixed(2)),
            field("ns_data", Text, UpTo(35)),
        ],
    )
}

fn raw_block(
    id: u8,
    name: &'static str,
    slug: &'static str,
    kind: TagKind,
) -> Result<TagDefinition, ParseError> {
    TagDefinition::new(
        TagId::Numeric(id),
        name,
        slug,
        kind,
        "*x",
        vec![field(slug, Text, Unbounded)],
    )
}

/// Встроенная таблица тегов MT940
pub fn standard_definitions() -> Result<Vec<TagDefinition>, ParseError> {
    Ok(vec![
        TagDefinition::new(
            TagId::Numeric(1),
            "Basic header",
            "file_header1",
            TagKind::BasicHeader,
            "1!a2!c8-12a4!n6!n",
            vec![
                literal("F"),
                field("app_id", Choice(&["01", "21"]), Fixed(1)),
                field("bic", Alpha, Range(8, 12)),
                field("session_number", Numeric, Fixed(4)),
                field("sequence_number", Numeric, Fixed(6)),
            ],
        )?,
        TagDefinition::new(
            TagId::Numeric(2),
            "Application header",
            "file_header2",
            TagKind::ApplicationHeader,
            "1!a3!n4!n6!n8-12c10!n6!n4!n1!a",
            vec![
                field("mode", Choice(&["I", "O"]), Fixed(1)),
                field("message_type", Numeric, Fixed(3)),
                field("input_time", Numeric, Fixed(4)),
                field("mir_date", Numeric, Fixed(6)),
                field("mir_bic", Alphanumeric, Range(8, 12)),
                field("mir_end", Numeric, Fixed(10)),
                field("output_date", Numeric, Fixed(6)),
                field("output_time", Numeric, Fixed(4)),
                field("priority", Choice(&["S", "N", "U"]), Fixed(1)),
            ],
        )?,
        raw_block(3, "User header", "file_header3", TagKind::UserHeader)?,
        raw_block(4, "Text block", "file_header4", TagKind::TextBlock)?,
        raw_block(5, "Trailer", "file_footer5", TagKind::Trailer)?,
        TagDefinition::new(
            TagId::Numeric(20),
            "Transaction reference number",
            "transaction_reference_number",
            TagKind::TransactionReference,
            "16x",
            vec![field("transaction_reference", Text, UpTo(16))],
        )?,
        TagDefinition::new(
            TagId::Numeric(21),
            "Related reference",
            "related_reference",
            TagKind::RelatedReference,
            "16x",
            vec![field("related_reference", Text, UpTo(16))],
        )?,
        TagDefinition::new(
            TagId::Numeric(25),
            "Account identification",
            "account_identification",
            TagKind::AccountIdentification,
            "35x",
            vec![field("account_identification", Text, UpTo(35))],
        )?,
        statement_number(TagId::Numeric(28))?,
        statement_number(TagId::Alphanumeric("28C"))?,
        balance(TagId::Numeric(60), "Opening balance", BalanceSlot::Opening)?,
        balance(TagId::Alphanumeric("60F"), "Final opening balance", BalanceSlot::FinalOpening)?,
        balance(
            TagId::Alphanumeric("60M"),
            "Intermediate opening balance",
            BalanceSlot::IntermediateOpening,
        )?,
        statement_line()?,
        balance(TagId::Numeric(62), "Closing balance", BalanceSlot::Closing)?,
        balance(TagId::Alphanumeric("62F"), "Final closing balance", BalanceSlot::FinalClosing)?,
        balance(
            TagId::Alphanumeric("62M"),
            "Intermediate closing balance",
            BalanceSlot::IntermediateClosing,
        )?,
        balance(TagId::Numeric(64), "Available balance", BalanceSlot::Available)?,
        balance(
            TagId::Numeric(65),
            "Forward available balance",
            BalanceSlot::ForwardAvailable,
        )?,
        TagDefinition::new(
            TagId::Numeric(86),
            "Transaction details",
            "transaction_details",
            TagKind::TransactionDetails,
            "6*65x",
            vec![field("transaction_details", Multiline, UpTo(330))],
        )?,
        non_swift()?,
    ])
}
