//! Разбиение сырого текста MT940 на блоки `(тег, значение)` и сообщения.

mod utils;
use crate::diagnostics::DiagnosticSink;
use crate::error::{ParseError, TagError};
use crate::model::Transactions;
use crate::registry::TagRegistry;
use crate::statement::{ParserOptions, parse_blocks, parse_blocks_collecting};
use serde::Serialize;
use std::io::Read;
use utils::*;

/// Один тег с сырым значением
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub tag: String,
    pub value: String,
}

impl Block {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Block {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// Разбивает текст на блоки.
///
/// Блоки конверта `{1:...}`..`{3:...}` становятся тегами `1`..`3`,
/// `{4:` - тегом `4` с пустым значением. Внутри блока 4 каждая строка `:TAG:`
/// открывает новый блок, остальные строки дописываются к текущему через `\n`.
/// `-}` закрывает блок 4, за ним может идти `{5:...}`.
pub fn split_blocks(text: &str) -> Result<Vec<Block>, ParseError> {
    let text = text.replace('\r', "");
    let mut rest = text.as_str();
    let mut blocks = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if let Some((id, after)) = split_envelope_start(rest) {
            if id == "4" {
                blocks.push(Block::new("4", ""));
                let (body, tail) = split_text_block(after);
                split_text_lines(body, &mut blocks)?;
                rest = tail;
                continue;
            }

            let end = closing_brace(after)
                .ok_or_else(|| ParseError::BadInput(format!("unterminated block {{{id}:")))?;
            blocks.push(Block::new(id, &after[..end]));
            rest = &after[end + 1..];
        } else if rest.starts_with(':') {
            // сообщение без конверта
            let (body, tail) = split_text_block(rest);
            split_text_lines(body, &mut blocks)?;
            rest = tail;
        } else {
            let line = rest.lines().next().unwrap_or_default();
            return Err(ParseError::BadInput(format!(
                "unexpected content outside of a block: '{line}'"
            )));
        }
    }

    Ok(blocks)
}

fn split_text_lines(body: &str, blocks: &mut Vec<Block>) -> Result<(), ParseError> {
    let mut current: Option<Block> = None;
    // пустые строки внутри значения, пока не ясно, будет ли продолжение
    let mut pending_blank: Vec<&str> = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim_start();

        if let Some((tag, value)) = split_tag_line(trimmed) {
            pending_blank.clear();
            blocks.extend(current.take());
            current = Some(Block::new(tag, value));
        } else if trimmed.trim_end().is_empty() {
            if current.is_some() {
                pending_blank.push(line);
            }
        } else if let Some(block) = current.as_mut() {
            // продолжение значения предыдущего тега, пробелы сохраняются
            for blank in pending_blank.drain(..) {
                block.value.push('\n');
                block.value.push_str(blank);
            }
            block.value.push('\n');
            block.value.push_str(line);
        } else {
            return Err(ParseError::BadInput(format!(
                "text before the first tag: '{}'",
                line.trim()
            )));
        }
    }

    blocks.extend(current);
    Ok(())
}

/// Группирует блоки по сообщениям.
///
/// Новое сообщение начинается с тега `1`, если в текущем уже есть `1` или
/// `20`, и с тега `20`, если в текущем уже есть `20`.
pub fn split_messages(blocks: Vec<Block>) -> Vec<Vec<Block>> {
    let mut messages = Vec::new();
    let mut current: Vec<Block> = Vec::new();

    for block in blocks {
        let has = |tag: &str| current.iter().any(|b| b.tag == tag);
        let starts_new = match block.tag.as_str() {
            "1" => has("1") || has("20"),
            "20" => has("20"),
            _ => false,
        };
        if starts_new {
            messages.push(std::mem::take(&mut current));
        }
        current.push(block);
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

/// Сырые сообщения MT940 из файла.
///
/// Для парсинга используйте [`Mt940Data::parse`].
///
/// Пример:
/// ```rust
/// use std::io::Cursor;
/// use mt940_parser::{Mt940Data, NullSink, ParserOptions, TagRegistry};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = Cursor::new(b":20:ABC\n:25:ACCOUNT\n:60F:C240101EUR1,00\n:62F:C240101EUR1,00\n");
/// let data = Mt940Data::parse(reader)?;
/// let statements = data.statements(TagRegistry::standard(), ParserOptions::default(), NullSink)?;
/// assert_eq!(statements[0].account_identification.as_deref(), Some("ACCOUNT"));
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mt940Data {
    pub messages: Vec<Vec<Block>>,
}

impl Mt940Data {
    /// Читает всё из reader и разбивает на сообщения
    ///
    /// При ошибке возвращает [`ParseError`]
    pub fn parse<R: Read>(mut reader: R) -> Result<Self, ParseError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, ParseError> {
        let blocks = split_blocks(text)?;
        if blocks.is_empty() {
            return Err(ParseError::BadInput("0 mt940 messages detected".into()));
        }
        Ok(Mt940Data {
            messages: split_messages(blocks),
        })
    }

    /// Собирает все выписки, останавливаясь на первой ошибке
    pub fn statements<S: DiagnosticSink>(
        &self,
        registry: &TagRegistry,
        options: ParserOptions,
        mut sink: S,
    ) -> Result<Vec<Transactions>, TagError> {
        self.messages
            .iter()
            .map(|message| parse_blocks(registry, options, &mut sink, pairs(message)))
            .collect()
    }

    /// Собирает все выписки, для каждой - список ошибок
    pub fn statements_collecting<S: DiagnosticSink>(
        &self,
        registry: &TagRegistry,
        options: ParserOptions,
        mut sink: S,
    ) -> Vec<(Transactions, Vec<TagError>)> {
        self.messages
            .iter()
            .map(|message| parse_blocks_collecting(registry, options, &mut sink, pairs(message)))
            .collect()
    }
}

fn pairs(message: &[Block]) -> impl Iterator<Item = (&str, &str)> {
    message.iter().map(|b| (b.tag.as_str(), b.value.as_str()))
}
