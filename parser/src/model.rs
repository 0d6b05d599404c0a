use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Направление (Дебет/Кредит)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Дебет
    Debit,
    /// Кредит
    Credit,
}

impl Direction {
    /// Направление по признаку из тега: последняя буква `D` или `C`.
    ///
    /// Для `"RD"`/`"RC"` возвращается направление исходной проводки,
    /// знак суммы учитывает сторно отдельно (см. [`Amount::new`]).
    pub fn from_mark(mark: &str) -> Option<Direction> {
        match mark.chars().last()?.to_ascii_uppercase() {
            'D' => Some(Direction::Debit),
            'C' => Some(Direction::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Credit => write!(f, "Credit"),
            Direction::Debit => write!(f, "Debit"),
        }
    }
}

/// Признак сторно: перед `D`/`C` стоит ещё одна буква (`RD`, `RC`, `CD`)
fn is_reversal_mark(mark: &str) -> bool {
    mark.len() == 2
}

/// Денежная сумма со знаком.
///
/// Знак выставляется один раз при создании по признаку дебет/кредит:
/// `D` и `RC` - отрицательная сумма, `C` и `RD` - положительная.
/// Любая лишняя буква перед `D`/`C` означает сторно и меняет знак,
/// так что `CD` тоже положительная, а `DC` отрицательная.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amount {
    value: Decimal,
    currency: Option<String>,
}

impl Amount {
    /// `magnitude` - модуль суммы, как в файле (неотрицательный)
    pub fn new(magnitude: Decimal, mark: &str, currency: Option<String>) -> Self {
        let magnitude = magnitude.abs();
        let debit = Direction::from_mark(mark) == Some(Direction::Debit);

        let value = if debit != is_reversal_mark(mark) {
            -magnitude
        } else {
            magnitude
        };

        Amount { value, currency }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {currency}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Баланс из тегов 60/62/64/65
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub status: Direction,
    pub date: NaiveDate,
    pub currency: String,
    pub amount: Amount,
}

/// Ячейка выписки, в которую попадает баланс.
///
/// У каждого идентификатора тега своя ячейка, так что `60F` и `60M`
/// не затирают друг друга.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BalanceSlot {
    /// :60:
    Opening,
    /// :60F:
    FinalOpening,
    /// :60M:
    IntermediateOpening,
    /// :62:
    Closing,
    /// :62F:
    FinalClosing,
    /// :62M:
    IntermediateClosing,
    /// :64:
    Available,
    /// :65:
    ForwardAvailable,
}

impl BalanceSlot {
    pub fn slug(&self) -> &'static str {
        match self {
            BalanceSlot::Opening => "opening_balance",
            BalanceSlot::FinalOpening => "final_opening_balance",
            BalanceSlot::IntermediateOpening => "intermediate_opening_balance",
            BalanceSlot::Closing => "closing_balance",
            BalanceSlot::FinalClosing => "final_closing_balance",
            BalanceSlot::IntermediateClosing => "intermediate_closing_balance",
            BalanceSlot::Available => "available_balance",
            BalanceSlot::ForwardAvailable => "forward_available_balance",
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(
            self,
            BalanceSlot::Opening | BalanceSlot::FinalOpening | BalanceSlot::IntermediateOpening
        )
    }

    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            BalanceSlot::Closing | BalanceSlot::FinalClosing | BalanceSlot::IntermediateClosing
        )
    }
}

/// Все балансы выписки, по ячейке на тег
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub opening: Option<Balance>,
    pub final_opening: Option<Balance>,
    pub intermediate_opening: Option<Balance>,
    pub closing: Option<Balance>,
    pub final_closing: Option<Balance>,
    pub intermediate_closing: Option<Balance>,
    pub available: Option<Balance>,
    /// :65: может повторяться, порядок как в файле
    pub forward_available: Vec<Balance>,
}

impl Balances {
    pub fn set(&mut self, slot: BalanceSlot, balance: Balance) {
        let cell = match slot {
            BalanceSlot::Opening => &mut self.opening,
            BalanceSlot::FinalOpening => &mut self.final_opening,
            BalanceSlot::IntermediateOpening => &mut self.intermediate_opening,
            BalanceSlot::Closing => &mut self.closing,
            BalanceSlot::FinalClosing => &mut self.final_closing,
            BalanceSlot::IntermediateClosing => &mut self.intermediate_closing,
            BalanceSlot::Available => &mut self.available,
            BalanceSlot::ForwardAvailable => {
                self.forward_available.push(balance);
                return;
            }
        };
        *cell = Some(balance);
    }

    pub fn get(&self, slot: BalanceSlot) -> Option<&Balance> {
        match slot {
            BalanceSlot::Opening => self.opening.as_ref(),
            BalanceSlot::FinalOpening => self.final_opening.as_ref(),
            BalanceSlot::IntermediateOpening => self.intermediate_opening.as_ref(),
            BalanceSlot::Closing => self.closing.as_ref(),
            BalanceSlot::FinalClosing => self.final_closing.as_ref(),
            BalanceSlot::IntermediateClosing => self.intermediate_closing.as_ref(),
            BalanceSlot::Available => self.available.as_ref(),
            BalanceSlot::ForwardAvailable => self.forward_available.first(),
        }
    }
}

/// Запись нестандартного расширения :NS:
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonSwiftRecord {
    /// двузначный идентификатор подполя
    pub id: String,
    /// до 35 символов данных
    pub data: String,
}

/// Одна проводка (:61: + привязанные к ней :86: и :NS:)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// дата валютирования
    pub value_date: NaiveDate,
    /// дата проводки, год берётся из даты валютирования
    pub entry_date: Option<NaiveDate>,
    /// признак дебет/кредит как в файле: "D", "C", "RD", "RC", "CD"
    pub status: String,
    pub funds_code: Option<String>,
    pub amount: Amount,
    /// код типа операции, напр. "NTRF"
    pub type_id: Option<String>,
    pub customer_reference: String,
    pub bank_reference: Option<String>,
    /// продолжение строки :61: на следующей строке
    pub supplementary_details: Option<String>,
    /// текст из :86:, несколько :86: склеиваются через перевод строки
    pub transaction_details: Option<String>,
    pub non_swift: Vec<NonSwiftRecord>,
}

impl Transaction {
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_mark(&self.status)
    }

    pub fn is_reversal(&self) -> bool {
        is_reversal_mark(&self.status)
    }

    pub(crate) fn append_details(&mut self, details: &str) {
        append_text(&mut self.transaction_details, details);
    }
}

pub(crate) fn append_text(target: &mut Option<String>, text: &str) {
    match target {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text.trim());
        }
        None => *target = Some(text.to_string()),
    }
}

/// Блок {1:} конверта
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicHeader {
    pub app_id: String,
    pub bic: String,
    pub session_number: String,
    pub sequence_number: String,
}

/// Блок {2:} конверта (выходное сообщение)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationHeader {
    pub mode: String,
    pub message_type: String,
    pub input_time: String,
    pub mir_date: String,
    pub mir_bic: String,
    pub mir_end: String,
    pub output_date: String,
    pub output_time: String,
    pub priority: String,
}

/// Блоки конверта SWIFT {1:}..{5:}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub basic_header: Option<BasicHeader>,
    pub application_header: Option<ApplicationHeader>,
    pub user_header: Option<String>,
    pub text_block: Option<String>,
    pub trailer: Option<String>,
}

/// Выписка целиком: поля уровня выписки и проводки в порядке файла.
///
/// Наполняется по одному тегу через [`crate::statement::StatementParser`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transactions {
    pub envelope: Envelope,
    /// :20:
    pub reference_number: Option<String>,
    /// :21:
    pub related_reference: Option<String>,
    /// :25:
    pub account_identification: Option<String>,
    /// :28: / :28C:
    pub statement_number: Option<String>,
    pub sequence_number: Option<String>,
    pub balances: Balances,
    pub transactions: Vec<Transaction>,
    /// :86: вне проводки (только при мягкой проверке порядка)
    pub information_to_account_owner: Option<String>,
    /// :NS: вне проводки (только при мягкой проверке порядка)
    pub non_swift: Vec<NonSwiftRecord>,
}

impl Transactions {
    /// Валюта выписки - валюта первого найденного баланса.
    pub fn currency(&self) -> Option<&str> {
        let b = &self.balances;
        [
            b.final_opening.as_ref(),
            b.opening.as_ref(),
            b.intermediate_opening.as_ref(),
            b.available.as_ref(),
            b.forward_available.first(),
            b.final_closing.as_ref(),
            b.closing.as_ref(),
            b.intermediate_closing.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|balance| balance.currency.as_str())
        .next()
    }

    /// Открывающий баланс: :60F:, затем :60:, затем :60M:
    pub fn opening_balance(&self) -> Option<&Balance> {
        let b = &self.balances;
        b.final_opening
            .as_ref()
            .or(b.opening.as_ref())
            .or(b.intermediate_opening.as_ref())
    }

    /// Закрывающий баланс: :62F:, затем :62:, затем :62M:
    pub fn closing_balance(&self) -> Option<&Balance> {
        let b = &self.balances;
        b.final_closing
            .as_ref()
            .or(b.closing.as_ref())
            .or(b.intermediate_closing.as_ref())
    }

    pub fn available_balance(&self) -> Option<&Balance> {
        self.balances.available.as_ref()
    }

    pub fn forward_available_balance(&self) -> Option<&Balance> {
        self.balances.forward_available.first()
    }
}
