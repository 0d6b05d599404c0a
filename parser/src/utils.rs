use crate::error::ParseError;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Двузначный год всегда считается годом 2000-х
const CENTURY: i32 = 2000;

fn coercion(
    tag: &str,
    component: &'static str,
    value: &str,
    reason: impl Into<String>,
) -> ParseError {
    ParseError::FieldCoercion {
        tag: tag.to_string(),
        component,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Сумма MT940: цифры и запятая как десятичный разделитель ("1234,56", "1500,")
pub(crate) fn parse_amount(
    tag: &str,
    component: &'static str,
    raw: &str,
) -> Result<Decimal, ParseError> {
    if raw.is_empty() {
        return Err(coercion(tag, component, raw, "empty amount"));
    }

    let mut split = raw.split(',');
    // split всегда отдаёт хотя бы один кусок
    let int_part = split.next().unwrap_or_default();
    let dec_part = split.next().unwrap_or_default();
    if split.next().is_some() {
        return Err(coercion(tag, component, raw, "more than one decimal separator"));
    }
    if int_part.is_empty() && dec_part.is_empty() {
        return Err(coercion(tag, component, raw, "no digits in amount"));
    }

    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let normalized = if dec_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{dec_part}")
    };

    Decimal::from_str(&normalized).map_err(|e| coercion(tag, component, raw, e.to_string()))
}

fn parse_number(tag: &str, component: &'static str, raw: &str) -> Result<u32, ParseError> {
    raw.parse()
        .map_err(|e: std::num::ParseIntError| coercion(tag, component, raw, e.to_string()))
}

/// Дата из компонентов YY, MM, DD. Компоненты называются `year`, `month`, `day`.
pub(crate) fn parse_date(
    tag: &str,
    year: &str,
    month: &str,
    day: &str,
) -> Result<NaiveDate, ParseError> {
    let yy = parse_number(tag, "year", year)?;
    let mm = parse_number(tag, "month", month)?;
    let dd = parse_number(tag, "day", day)?;

    if !(1..=12).contains(&mm) {
        return Err(coercion(tag, "month", month, "month out of range"));
    }

    NaiveDate::from_ymd_opt(CENTURY + yy as i32, mm, dd)
        .ok_or_else(|| coercion(tag, "day", day, format!("no such day in {year}{month}")))
}

/// Дата проводки (MMDD) с годом из даты валютирования.
///
/// Если нет месяца или дня, даты проводки нет.
pub(crate) fn derive_entry_date(
    tag: &str,
    value_date: NaiveDate,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<Option<NaiveDate>, ParseError> {
    let (Some(month), Some(day)) = (month, day) else {
        return Ok(None);
    };

    let mm = parse_number(tag, "entry_month", month)?;
    let dd = parse_number(tag, "entry_day", day)?;

    if !(1..=12).contains(&mm) {
        return Err(coercion(tag, "entry_month", month, "month out of range"));
    }

    NaiveDate::from_ymd_opt(value_date.year(), mm, dd)
        .map(Some)
        .ok_or_else(|| {
            coercion(
                tag,
                "entry_day",
                day,
                format!("no such day in {}-{month}", value_date.year()),
            )
        })
}
