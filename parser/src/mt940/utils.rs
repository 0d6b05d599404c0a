use lazy_regex::regex_captures;

/// Разделяет строку с тегом на сам тег и строку после него.
///
/// Тег - две цифры с необязательной буквой (`60F`) или `NS`.
pub(super) fn split_tag_line(line: &str) -> Option<(&str, &str)> {
    let (whole, tag) = regex_captures!(r"^:([0-9]{2}[A-Z]?|NS):", line)?;
    Some((tag, &line[whole.len()..]))
}

/// Начало блока конверта `{n:`, возвращает номер блока и остаток
pub(super) fn split_envelope_start(text: &str) -> Option<(&str, &str)> {
    let (whole, id) = regex_captures!(r"^\{([0-9]):", text)?;
    Some((id, &text[whole.len()..]))
}

/// Позиция закрывающей скобки блока с учётом вложенных `{...}`
pub(super) fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Делит текст блока 4 на тело и остаток после `-}`.
///
/// Если `-}` нет, тело - весь текст.
pub(super) fn split_text_block(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with("-}") {
            let marker = offset + (line.len() - trimmed.len());
            return (&text[..offset], &text[marker + 2..]);
        }
        offset += line.len();
    }
    (text, "")
}
