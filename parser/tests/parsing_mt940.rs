use chrono::NaiveDate;
use mt940_parser::{
    Diagnostic, Direction, Level, Mt940Data, NullSink, OrderingPolicy, ParseError, ParserOptions,
    State, StatementParser, TagRegistry, Transactions, UnknownTagPolicy, parse_blocks,
    parse_blocks_collecting,
};
use rust_decimal::Decimal;
use std::{fs::File, io::BufReader, path::PathBuf};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("mt940")
        .join("example.mt940")
}

fn parse_fixture() -> Vec<Transactions> {
    let path = fixture_path();
    let file = File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open MT940 fixture {path:?}: {e}"));

    let data = Mt940Data::parse(BufReader::new(file)).expect("failed to split MT940 fixture");
    data.statements(TagRegistry::standard(), ParserOptions::default(), NullSink)
        .expect("failed to parse MT940 fixture")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn fixture_contains_two_statements() {
    let statements = parse_fixture();
    assert_eq!(statements.len(), 2, "fixture has two messages");

    let first = &statements[0];
    let second = &statements[1];

    assert_eq!(first.reference_number.as_deref(), Some("STMT240101"));
    assert_eq!(second.reference_number.as_deref(), Some("STMT240105"));
    assert_eq!(second.statement_number.as_deref(), Some("00002"));
    assert_eq!(second.transactions.len(), 1);
    assert!(second.envelope.basic_header.is_none());
}

#[test]
fn fixture_envelope_is_parsed() {
    let statements = parse_fixture();
    let envelope = &statements[0].envelope;

    let basic = envelope.basic_header.as_ref().expect("tag 1 present");
    assert_eq!(basic.app_id, "01");
    assert_eq!(basic.bic, "DEUTDEFFXXX");

    let app = envelope.application_header.as_ref().expect("tag 2 present");
    assert_eq!(app.mode, "O");
    assert_eq!(app.message_type, "940");
    assert_eq!(app.mir_bic, "DEUTDEFFAXXX");
    assert_eq!(app.priority, "N");

    assert_eq!(envelope.user_header.as_deref(), Some("{108:MT940STMT}"));
    assert_eq!(envelope.text_block.as_deref(), Some(""));
    assert_eq!(envelope.trailer.as_deref(), Some("{CHK:0123456789AB}"));
}

#[test]
fn fixture_header_and_balances() {
    let statements = parse_fixture();
    let stmt = &statements[0];

    assert_eq!(
        stmt.account_identification.as_deref(),
        Some("DE89370400440532013000")
    );
    assert_eq!(stmt.statement_number.as_deref(), Some("00001"));
    assert_eq!(stmt.sequence_number.as_deref(), Some("001"));
    assert_eq!(stmt.currency(), Some("EUR"));

    let opening = stmt.opening_balance().expect("60F present");
    assert_eq!(opening.status, Direction::Credit);
    assert_eq!(opening.date, date(2024, 1, 1));
    assert_eq!(opening.amount.value(), Decimal::new(100000, 2));

    let closing = stmt.closing_balance().expect("62F present");
    assert_eq!(closing.amount.value(), Decimal::new(224050, 2));
    assert!(stmt.available_balance().is_some());
    assert_eq!(stmt.balances.forward_available.len(), 2);
    assert_eq!(stmt.balances.forward_available[1].date, date(2024, 1, 6));
}

#[test]
fn fixture_transactions_sum_up_to_closing_balance() {
    let statements = parse_fixture();
    let stmt = &statements[0];
    assert_eq!(stmt.transactions.len(), 3);

    let opening = stmt.opening_balance().unwrap().amount.value();
    let closing = stmt.closing_balance().unwrap().amount.value();
    let total: Decimal = stmt.transactions.iter().map(|t| t.amount.value()).sum();
    assert_eq!(opening + total, closing);
}

#[test]
fn fixture_transaction_fields() {
    let statements = parse_fixture();
    let txs = &statements[0].transactions;

    let first = &txs[0];
    assert_eq!(first.value_date, date(2024, 1, 2));
    assert_eq!(first.entry_date, Some(date(2024, 1, 2)));
    assert_eq!(first.direction(), Some(Direction::Debit));
    assert_eq!(first.amount.value(), Decimal::new(-25000, 2));
    assert_eq!(first.amount.currency(), Some("EUR"));
    assert_eq!(first.type_id.as_deref(), Some("NTRF"));
    assert_eq!(first.customer_reference, "EREF-INV-42");
    assert_eq!(first.bank_reference.as_deref(), Some("BANK0001"));
    assert_eq!(first.supplementary_details.as_deref(), Some("/CTC/100/SEPA"));
    assert_eq!(
        first.transaction_details.as_deref(),
        Some("/EREF/INV-42/NAME/ACME GMBH\n/REMI/Invoice 42")
    );

    let second = &txs[1];
    assert_eq!(second.amount.value(), Decimal::new(150050, 2));
    assert_eq!(second.transaction_details.as_deref(), Some("Salary January"));
    let records: Vec<_> = second
        .non_swift
        .iter()
        .map(|r| (r.id.as_str(), r.data.as_str()))
        .collect();
    assert_eq!(records, [("22", "Extra info"), ("23", "Second record")]);

    let third = &txs[2];
    assert_eq!(third.status, "RC");
    assert!(third.is_reversal());
    assert_eq!(third.amount.value(), Decimal::new(-1000, 2));
    assert_eq!(third.customer_reference, "REVERSAL");
}

#[test]
fn fixture_serializes_to_json_shape() {
    let statements = parse_fixture();
    let json = serde_json::to_value(&statements[0]).unwrap();

    assert_eq!(json["reference_number"], "STMT240101");
    assert_eq!(json["transactions"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["balances"]["final_opening"]["currency"], "EUR");
}

#[test]
fn statement_line_with_funds_code_and_supplementary_details() {
    let mut parser =
        StatementParser::new(TagRegistry::standard(), ParserOptions::default(), NullSink);
    for (tag, value) in [
        ("20", "REF"),
        ("25", "ACC"),
        ("60F", "C240101EUR0,00"),
        ("61", "2401010104DR1500,00NMSCNONREF//BANKREF123\nEXTRA DETAIL"),
    ] {
        parser.feed(tag, value).unwrap();
    }
    assert_eq!(parser.state(), State::InTransaction);

    let stmt = parser.finish();
    let tx = &stmt.transactions[0];
    assert_eq!(tx.status, "D");
    assert_eq!(tx.funds_code.as_deref(), Some("R"));
    assert_eq!(tx.bank_reference.as_deref(), Some("BANKREF123"));
    assert_eq!(tx.supplementary_details.as_deref(), Some("EXTRA DETAIL"));
    assert_eq!(tx.entry_date, Some(date(2024, 1, 4)));
}

#[test]
fn broken_fixture_lines_are_collected_not_fatal() {
    let text = std::fs::read_to_string(fixture_path()).unwrap();
    let broken = text.replace(":62F:C240104EUR2240,50", ":62F:C240104EUR22,40,50");

    let data = Mt940Data::from_text(&broken).unwrap();
    let results =
        data.statements_collecting(TagRegistry::standard(), ParserOptions::default(), NullSink);

    let (first, errors) = &results[0];
    assert_eq!(errors[0].tag, "62F");
    assert!(matches!(
        errors[0].kind,
        ParseError::FieldCoercion { component: "amount", .. }
    ));
    // без :62F: выписка не закрылась, :64:, :65: и {5:} не на своём месте
    let rest: Vec<_> = errors[1..].iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(rest, ["64", "65", "65", "5"]);
    assert!(
        errors[1..]
            .iter()
            .all(|e| matches!(e.kind, ParseError::Ordering { .. }))
    );

    assert!(first.closing_balance().is_none());
    assert_eq!(first.transactions.len(), 3);
    assert!(results[1].1.is_empty());
}

#[test]
fn lenient_options_cover_messy_input() {
    let blocks = [
        ("20", "REF"),
        ("61", "240101C1,00"),
        ("XX", "vendor"),
        ("86", "details"),
        ("60F", "C240101EUR0,00"),
        ("62F", "C240101EUR1,00"),
    ];

    let strict = parse_blocks(TagRegistry::standard(), ParserOptions::default(), NullSink, blocks);
    let err = strict.unwrap_err();
    assert_eq!(err.position, 2);

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let options = ParserOptions::default()
        .ordering(OrderingPolicy::Lenient)
        .unknown_tags(UnknownTagPolicy::Skip);
    let (stmt, errors) =
        parse_blocks_collecting(TagRegistry::standard(), options, &mut diagnostics, blocks);

    assert!(errors.is_empty());
    assert_eq!(stmt.transactions.len(), 1);
    assert_eq!(stmt.transactions[0].transaction_details.as_deref(), Some("details"));
    assert!(
        diagnostics
            .iter()
            .any(|d| d.level == Level::Warning && d.tag == "XX")
    );
}
