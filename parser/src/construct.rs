//! Построение типизированных значений из компонентов тега.

use crate::error::ParseError;
use crate::model::{
    Amount, ApplicationHeader, Balance, BalanceSlot, BasicHeader, Direction, NonSwiftRecord,
    Transaction, Transactions,
};
use crate::pattern::Components;
use crate::tags::{TagDefinition, TagKind};
use crate::utils::{derive_entry_date, parse_amount, parse_date};

/// Результат разбора одного тега
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    BasicHeader(BasicHeader),
    ApplicationHeader(ApplicationHeader),
    UserHeader(String),
    TextBlock(String),
    Trailer(String),
    TransactionReference(String),
    RelatedReference(String),
    AccountIdentification(String),
    StatementNumber {
        statement_number: String,
        sequence_number: Option<String>,
    },
    Balance(BalanceSlot, Balance),
    StatementLine(Transaction),
    TransactionDetails(String),
    NonSwift(Vec<NonSwiftRecord>),
}

/// Сопоставляет значение с грамматикой тега.
pub fn match_tag<'v>(
    definition: &TagDefinition,
    value: &'v str,
) -> Result<Components<'v>, ParseError> {
    definition
        .pattern()
        .captures(value)
        .ok_or_else(|| ParseError::PatternMismatch {
            tag: definition.id().to_string(),
            value: value.to_string(),
            pattern: definition.pattern().notation().to_string(),
        })
}

/// Строит значение тега.
///
/// `statement` нужен только для валюты проводки :61: по умолчанию и сам
/// не меняется.
pub fn build(
    definition: &TagDefinition,
    components: &Components<'_>,
    statement: &Transactions,
) -> Result<TagValue, ParseError> {
    let tag = definition.id().to_string();
    let tag = tag.as_str();

    let value = match definition.kind() {
        TagKind::BasicHeader => TagValue::BasicHeader(BasicHeader {
            app_id: text(tag, components, "app_id")?,
            bic: text(tag, components, "bic")?,
            session_number: text(tag, components, "session_number")?,
            sequence_number: text(tag, components, "sequence_number")?,
        }),
        TagKind::ApplicationHeader => TagValue::ApplicationHeader(ApplicationHeader {
            mode: text(tag, components, "mode")?,
            message_type: text(tag, components, "message_type")?,
            input_time: text(tag, components, "input_time")?,
            mir_date: text(tag, components, "mir_date")?,
            mir_bic: text(tag, components, "mir_bic")?,
            mir_end: text(tag, components, "mir_end")?,
            output_date: text(tag, components, "output_date")?,
            output_time: text(tag, components, "output_time")?,
            priority: text(tag, components, "priority")?,
        }),
        TagKind::UserHeader => TagValue::UserHeader(text(tag, components, definition.slug())?),
        TagKind::TextBlock => TagValue::TextBlock(text(tag, components, definition.slug())?),
        TagKind::Trailer => TagValue::Trailer(text(tag, components, definition.slug())?),
        TagKind::TransactionReference => {
            TagValue::TransactionReference(text(tag, components, "transaction_reference")?)
        }
        TagKind::RelatedReference => {
            TagValue::RelatedReference(text(tag, components, "related_reference")?)
        }
        TagKind::AccountIdentification => {
            TagValue::AccountIdentification(text(tag, components, "account_identification")?)
        }
        TagKind::StatementNumber => TagValue::StatementNumber {
            statement_number: text(tag, components, "statement_number")?,
            sequence_number: components.get("sequence_number").map(str::to_string),
        },
        TagKind::Balance(slot) => TagValue::Balance(slot, build_balance(tag, components)?),
        TagKind::StatementLine => {
            TagValue::StatementLine(build_statement_line(tag, components, statement.currency())?)
        }
        TagKind::TransactionDetails => {
            TagValue::TransactionDetails(text(tag, components, "transaction_details")?)
        }
        TagKind::NonSwift => TagValue::NonSwift(build_non_swift(definition, components)?),
    };

    Ok(value)
}

fn required<'v>(
    tag: &str,
    components: &Components<'v>,
    name: &'static str,
) -> Result<&'v str, ParseError> {
    components.get(name).ok_or_else(|| ParseError::FieldCoercion {
        tag: tag.to_string(),
        component: name,
        value: String::new(),
        reason: "component is missing".into(),
    })
}

fn text(tag: &str, components: &Components<'_>, name: &'static str) -> Result<String, ParseError> {
    required(tag, components, name).map(str::to_string)
}

fn build_balance(tag: &str, c: &Components<'_>) -> Result<Balance, ParseError> {
    let mark = required(tag, c, "status")?;
    let status = Direction::from_mark(mark).ok_or_else(|| ParseError::FieldCoercion {
        tag: tag.to_string(),
        component: "status",
        value: mark.to_string(),
        reason: "expected D or C".into(),
    })?;

    let date = parse_date(
        tag,
        required(tag, c, "year")?,
        required(tag, c, "month")?,
        required(tag, c, "day")?,
    )?;
    let currency = required(tag, c, "currency")?.to_ascii_uppercase();
    let magnitude = parse_amount(tag, "amount", required(tag, c, "amount")?)?;

    Ok(Balance {
        status,
        date,
        amount: Amount::new(magnitude, mark, Some(currency.clone())),
        currency,
    })
}

fn build_statement_line(
    tag: &str,
    c: &Components<'_>,
    currency: Option<&str>,
) -> Result<Transaction, ParseError> {
    let status = required(tag, c, "status")?.to_ascii_uppercase();

    let value_date = parse_date(
        tag,
        required(tag, c, "year")?,
        required(tag, c, "month")?,
        required(tag, c, "day")?,
    )?;
    let entry_date = derive_entry_date(tag, value_date, c.get("entry_month"), c.get("entry_day"))?;

    let magnitude = parse_amount(tag, "amount", required(tag, c, "amount")?)?;
    // в :61: валюты нет, берём валюту выписки
    let amount = Amount::new(magnitude, &status, currency.map(str::to_string));

    Ok(Transaction {
        value_date,
        entry_date,
        status,
        funds_code: c.get("funds_code").map(str::to_string),
        amount,
        type_id: c.get("id").map(str::to_string),
        customer_reference: c.get("customer_reference").unwrap_or_default().to_string(),
        bank_reference: c.get("bank_reference").map(str::to_string),
        supplementary_details: c
            .get("extra_details")
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        transaction_details: None,
        non_swift: Vec::new(),
    })
}

/// Каждая строка :NS: - отдельная запись `2!n35x`
fn build_non_swift(
    definition: &TagDefinition,
    c: &Components<'_>,
) -> Result<Vec<NonSwiftRecord>, ParseError> {
    let tag = definition.id().to_string();
    let raw = required(&tag, c, "non_swift")?;
    let sub_pattern = definition
        .sub_pattern()
        .ok_or_else(|| ParseError::FieldCoercion {
            tag: tag.clone(),
            component: "non_swift",
            value: raw.to_string(),
            reason: "no sub-pattern for records".into(),
        })?;

    raw.split('\n')
        .map(|chunk| -> Result<NonSwiftRecord, ParseError> {
            let record = sub_pattern
                .captures(chunk)
                .ok_or_else(|| ParseError::PatternMismatch {
                    tag: tag.clone(),
                    value: chunk.to_string(),
                    pattern: sub_pattern.notation().to_string(),
                })?;
            Ok(NonSwiftRecord {
                id: text(&tag, &record, "ns_id")?,
                data: text(&tag, &record, "ns_data")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TagRegistry;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn parse(tag: &str, value: &str, statement: &Transactions) -> Result<TagValue, ParseError> {
        let def = TagRegistry::standard().get(tag).unwrap();
        let components = match_tag(def, value)?;
        build(def, &components, statement)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn eur_statement() -> Transactions {
        let mut stmt = Transactions::default();
        match parse("60F", "C240101EUR0,00", &stmt).unwrap() {
            TagValue::Balance(slot, b) => stmt.balances.set(slot, b),
            other => panic!("expected Balance, got {other:?}"),
        }
        stmt
    }

    // балансы

    #[test]
    fn balance_from_credit_value() {
        let value = parse("60F", "C240101EUR1234,56", &Transactions::default()).unwrap();
        let TagValue::Balance(slot, balance) = value else {
            panic!("expected Balance, got {value:?}");
        };

        assert_eq!(slot, BalanceSlot::FinalOpening);
        assert_eq!(slot.slug(), "final_opening_balance");
        assert_eq!(balance.status, Direction::Credit);
        assert_eq!(balance.date, date(2024, 1, 1));
        assert_eq!(balance.currency, "EUR");
        assert_eq!(balance.amount.value(), Decimal::new(123456, 2));
        assert_eq!(balance.amount.currency(), Some("EUR"));
    }

    #[test]
    fn debit_balance_is_negative() {
        let value = parse("62M", "D250218USD1000,00", &Transactions::default()).unwrap();
        let TagValue::Balance(slot, balance) = value else {
            panic!("expected Balance, got {value:?}");
        };
        assert_eq!(slot, BalanceSlot::IntermediateClosing);
        assert_eq!(balance.status, Direction::Debit);
        assert_eq!(balance.amount.value(), Decimal::new(-100000, 2));
    }

    #[test]
    fn balance_with_invalid_status_is_pattern_mismatch() {
        let err = parse("60F", "X240101EUR100,00", &Transactions::default()).unwrap_err();
        match err {
            ParseError::PatternMismatch { tag, value, pattern } => {
                assert_eq!(tag, "60F");
                assert_eq!(value, "X240101EUR100,00");
                assert_eq!(pattern, "1!a6!n3!a15d");
            }
            other => panic!("expected PatternMismatch, got {other:?}"),
        }
    }

    #[test]
    fn balance_with_impossible_date_is_coercion_error() {
        let err = parse("60F", "C240231EUR100,00", &Transactions::default()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::FieldCoercion { component: "day", .. }
        ));
    }

    #[test]
    fn balance_with_bad_amount_is_coercion_error() {
        let err = parse("64", "C240101EUR1,0,0", &Transactions::default()).unwrap_err();
        match err {
            ParseError::FieldCoercion { tag, component, .. } => {
                assert_eq!(tag, "64");
                assert_eq!(component, "amount");
            }
            other => panic!("expected FieldCoercion, got {other:?}"),
        }
    }

    // :61:

    #[test]
    fn statement_line_full_example() {
        let stmt = eur_statement();
        let value = parse(
            "61",
            "2401010104DR1500,00NMSCNONREF//BANKREF123\nEXTRA DETAIL",
            &stmt,
        )
        .unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };

        assert_eq!(tx.value_date, date(2024, 1, 1));
        assert_eq!(tx.entry_date, Some(date(2024, 1, 4)));
        assert_eq!(tx.status, "D");
        assert_eq!(tx.funds_code.as_deref(), Some("R"));
        assert!(!tx.is_reversal());
        assert_eq!(tx.amount.value(), Decimal::new(-150000, 2));
        assert_eq!(tx.amount.currency(), Some("EUR"));
        assert_eq!(tx.type_id.as_deref(), Some("NMSC"));
        assert_eq!(tx.customer_reference, "NONREF");
        assert_eq!(tx.bank_reference.as_deref(), Some("BANKREF123"));
        assert_eq!(tx.supplementary_details.as_deref(), Some("EXTRA DETAIL"));
        assert_eq!(tx.transaction_details, None);
    }

    #[test]
    fn statement_line_currency_defaults_to_statement() {
        let value = parse("61", "240102C50,00NTRFREF", &eur_statement()).unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };
        assert_eq!(tx.amount.currency(), Some("EUR"));

        // без баланса валюты нет
        let value = parse("61", "240102C50,00NTRFREF", &Transactions::default()).unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };
        assert_eq!(tx.amount.currency(), None);
    }

    #[test]
    fn statement_line_keeps_reversal_mark() {
        let value = parse("61", "2401010102RD25,00NTRFREF", &eur_statement()).unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };
        assert_eq!(tx.status, "RD");
        assert!(tx.is_reversal());
        assert_eq!(tx.direction(), Some(Direction::Debit));
        assert_eq!(tx.amount.value(), Decimal::new(2500, 2));
    }

    #[test]
    fn entry_date_needs_both_month_and_day() {
        // только месяц: 2 цифры, затем признак
        let value = parse("61", "24031512C10,00NTRFREF", &eur_statement()).unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };
        assert_eq!(tx.value_date, date(2024, 3, 15));
        assert_eq!(tx.entry_date, None);
    }

    #[test]
    fn entry_date_year_comes_from_value_date() {
        let value = parse("61", "2312311231C10,00", &eur_statement()).unwrap();
        let TagValue::StatementLine(tx) = value else {
            panic!("expected StatementLine, got {value:?}");
        };
        assert_eq!(tx.entry_date, Some(date(2023, 12, 31)));
        assert_eq!(tx.supplementary_details, None);
        assert_eq!(tx.customer_reference, "");
    }

    #[test]
    fn statement_line_with_bad_entry_date_fails() {
        let err = parse("61", "2401011332C10,00", &eur_statement()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::FieldCoercion { component: "entry_month", .. }
        ));
    }

    // :28:

    #[test]
    fn statement_number_with_and_without_sequence() {
        let stmt = Transactions::default();
        assert_eq!(
            parse("28", "123/1", &stmt).unwrap(),
            TagValue::StatementNumber {
                statement_number: "123".into(),
                sequence_number: Some("1".into()),
            }
        );
        assert_eq!(
            parse("28C", "123", &stmt).unwrap(),
            TagValue::StatementNumber {
                statement_number: "123".into(),
                sequence_number: None,
            }
        );
        assert!(matches!(
            parse("28", "123/", &stmt),
            Err(ParseError::PatternMismatch { .. })
        ));
    }

    // :NS:

    #[test]
    fn non_swift_records_keep_order_and_repeats() {
        let stmt = Transactions::default();
        assert_eq!(
            parse("NS", "00FOO\n01BAR", &stmt).unwrap(),
            TagValue::NonSwift(vec![
                NonSwiftRecord { id: "00".into(), data: "FOO".into() },
                NonSwiftRecord { id: "01".into(), data: "BAR".into() },
            ])
        );

        let TagValue::NonSwift(records) = parse("NS", "22A\n22B\n23C", &stmt).unwrap() else {
            panic!("expected NonSwift");
        };
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        let data: Vec<_> = records.iter().map(|r| r.data.as_str()).collect();
        assert_eq!(ids, ["22", "22", "23"]);
        assert_eq!(data, ["A", "B", "C"]);
    }

    #[test]
    fn non_swift_rejects_lines_without_id() {
        assert!(matches!(
            parse("NS", "00FOO\nBAR", &Transactions::default()),
            Err(ParseError::PatternMismatch { .. })
        ));
    }

    // прочее

    #[test]
    fn transaction_details_keep_newlines() {
        let value = parse("86", "LINE ONE\nLINE TWO", &Transactions::default()).unwrap();
        assert_eq!(value, TagValue::TransactionDetails("LINE ONE\nLINE TWO".into()));

        let too_long = "x".repeat(331);
        assert!(matches!(
            parse("86", &too_long, &Transactions::default()),
            Err(ParseError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn basic_header_components() {
        let value = parse("1", "F01FOOBARBAXXX0000000000", &Transactions::default()).unwrap();
        let TagValue::BasicHeader(header) = value else {
            panic!("expected BasicHeader, got {value:?}");
        };
        assert_eq!(header.app_id, "01");
        assert_eq!(header.bic, "FOOBARBAXXX");
    }

    #[test]
    fn user_header_is_raw_text() {
        let value = parse("3", "{108:MT940}", &Transactions::default()).unwrap();
        assert_eq!(value, TagValue::UserHeader("{108:MT940}".into()));
    }
}
