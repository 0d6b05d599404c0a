//! Грамматики значений тегов и их сопоставление.
//!
//! Грамматика тега - упорядоченный список компонентов фиксированной или
//! ограниченной длины. Список компилируется в один regex, привязанный к началу
//! и концу значения, без учёта регистра. При компиляции пробелы в самой
//! грамматике не значимы (`ignore_whitespace`), пробельные символы во входном
//! значении - значимы.

use regex::{Regex, RegexBuilder};
use std::fmt;

/// Класс символов компонента.
///
/// В скобках - обозначение из описаний формата SWIFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// цифры (`n`)
    Numeric,
    /// латинские буквы (`a`)
    Alpha,
    /// буквы и цифры (`c`)
    Alphanumeric,
    /// любой символ, кроме перевода строки (`x`)
    Text,
    /// любой символ, включая перевод строки
    Multiline,
    /// сумма: цифры и десятичная запятая (`d`)
    Decimal,
    /// один символ из набора, напр. `"DC"`
    OneOf(&'static str),
    /// одно из перечисленных значений целиком, напр. `["01", "21"]`
    Choice(&'static [&'static str]),
    /// признак дебет/кредит с необязательной буквой перед ним (`2a`)
    Mark,
    /// код типа операции: буква и три буквы/цифры (`1!a3!c`)
    TypeCode,
}

/// Длина компонента
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// ровно `n` символов (`n!`)
    Fixed(usize),
    /// от 0 до `n` символов
    UpTo(usize),
    /// от `min` до `max` символов
    Range(usize, usize),
    /// сколько угодно символов
    Unbounded,
}

/// Один компонент значения тега
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<&'static str>,
    pub charset: Charset,
    pub width: Width,
}

/// Элемент грамматики
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Field(Field),
    Literal(&'static str),
    Group {
        name: Option<&'static str>,
        optional: bool,
        repeated: bool,
        elements: Vec<Element>,
    },
}

/// Именованный компонент
pub fn field(name: &'static str, charset: Charset, width: Width) -> Element {
    Element::Field(Field {
        name: Some(name),
        charset,
        width,
    })
}

/// Безымянный компонент (участвует в сопоставлении, но не попадает в результат)
pub fn anon(charset: Charset, width: Width) -> Element {
    Element::Field(Field {
        name: None,
        charset,
        width,
    })
}

pub fn literal(text: &'static str) -> Element {
    Element::Literal(text)
}

/// Необязательная группа: совпадает целиком или отсутствует
pub fn optional(elements: Vec<Element>) -> Element {
    Element::Group {
        name: None,
        optional: true,
        repeated: false,
        elements,
    }
}

/// Группа, повторяющаяся ноль или более раз
pub fn repeated(elements: Vec<Element>) -> Element {
    Element::Group {
        name: None,
        optional: true,
        repeated: true,
        elements,
    }
}

/// Обязательная группа, совпавший текст которой доступен по имени
pub fn named(name: &'static str, elements: Vec<Element>) -> Element {
    Element::Group {
        name: Some(name),
        optional: false,
        repeated: false,
        elements,
    }
}

/// Скомпилированная грамматика значения тега
#[derive(Debug, Clone)]
pub struct Pattern {
    notation: &'static str,
    names: Vec<&'static str>,
    required: Vec<&'static str>,
    regex: Regex,
}

impl Pattern {
    /// Компилирует грамматику.
    ///
    /// `notation` - запись формата в нотации SWIFT (`1!a6!n3!a15d`),
    /// используется в сообщениях об ошибках.
    pub fn compile(notation: &'static str, elements: Vec<Element>) -> Result<Self, regex::Error> {
        let mut body = String::new();
        render(&elements, &mut body);

        let source = format!("\\A(?:\n{body})\\z");
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .ignore_whitespace(true)
            .build()?;

        let mut names = Vec::new();
        let mut required = Vec::new();
        collect_names(&elements, true, &mut names, &mut required);

        Ok(Pattern {
            notation,
            names,
            required,
            regex,
        })
    }

    pub fn notation(&self) -> &'static str {
        self.notation
    }

    /// Сопоставляет значение целиком.
    ///
    /// Возвращает `None`, если значение не подходит под грамматику или если
    /// не совпал какой-либо обязательный компонент.
    pub fn captures<'v>(&self, value: &'v str) -> Option<Components<'v>> {
        let caps = self.regex.captures(value)?;

        let mut values = Vec::with_capacity(self.names.len());
        for &name in &self.names {
            if let Some(m) = caps.name(name) {
                values.push((name, m.as_str()));
            }
        }

        let components = Components { values };
        if self.required.iter().all(|name| components.contains(name)) {
            Some(components)
        } else {
            None
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notation)
    }
}

/// Результат сопоставления: имя компонента -> совпавшая подстрока.
///
/// Порядок - порядок компонентов в грамматике. Необязательные компоненты,
/// которые не совпали, отсутствуют; совпавшие с пустой строкой - присутствуют.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Components<'v> {
    values: Vec<(&'static str, &'v str)>,
}

impl<'v> Components<'v> {
    pub fn get(&self, name: &str) -> Option<&'v str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Пары в порядке грамматики
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'v str)> + '_ {
        self.values.iter().copied()
    }
}

fn render(elements: &[Element], out: &mut String) {
    for element in elements {
        match element {
            Element::Field(f) => {
                let atom = render_field(f);
                match f.name {
                    Some(name) => out.push_str(&format!("(?P<{name}>{atom})")),
                    None => out.push_str(&atom),
                }
            }
            Element::Literal(text) => out.push_str(&escape_literal(text)),
            Element::Group {
                name,
                optional,
                repeated,
                elements,
            } => {
                match name {
                    Some(name) => out.push_str(&format!("(?P<{name}>\n")),
                    None => out.push_str("(?:\n"),
                }
                render(elements, out);
                out.push(')');
                if *repeated {
                    out.push('*');
                } else if *optional {
                    out.push('?');
                }
            }
        }
        out.push('\n');
    }
}

fn render_field(f: &Field) -> String {
    let class = match f.charset {
        Charset::Numeric => "[0-9]".to_string(),
        Charset::Alpha => "[A-Z]".to_string(),
        Charset::Alphanumeric => "[A-Z0-9]".to_string(),
        Charset::Text => ".".to_string(),
        Charset::Multiline => r"[\s\S]".to_string(),
        Charset::Decimal => "[0-9,]".to_string(),
        Charset::OneOf(set) => format!("[{}]", escape_literal(set)),
        // у составных классов длина задана самим классом
        Charset::Choice(options) => {
            let alternatives: Vec<String> = options.iter().map(|o| escape_literal(o)).collect();
            return format!("(?:{})", alternatives.join("|"));
        }
        Charset::Mark => return "[A-Z]?[DC]".to_string(),
        Charset::TypeCode => return "[A-Z][A-Z0-9]{3}".to_string(),
    };

    let quantifier = match f.width {
        Width::Fixed(1) => String::new(),
        Width::Fixed(n) => format!("{{{n}}}"),
        Width::UpTo(n) => format!("{{0,{n}}}"),
        Width::Range(min, max) => format!("{{{min},{max}}}"),
        Width::Unbounded => "*".to_string(),
    };

    format!("{class}{quantifier}")
}

/// Экранирует литерал. Пробельные символы записываются через `\x{..}`,
/// иначе `ignore_whitespace` их бы выбросил.
fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            out.push_str(&format!("\\x{{{:X}}}", c as u32));
        } else {
            out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        }
    }
    out
}

fn collect_names(
    elements: &[Element],
    mandatory: bool,
    names: &mut Vec<&'static str>,
    required: &mut Vec<&'static str>,
) {
    for element in elements {
        match element {
            Element::Field(Field {
                name: Some(name), ..
            }) => {
                names.push(*name);
                if mandatory {
                    required.push(*name);
                }
            }
            Element::Field(_) | Element::Literal(_) => {}
            Element::Group {
                name,
                optional,
                elements,
                ..
            } => {
                let inner_mandatory = mandatory && !optional;
                if let Some(name) = name {
                    names.push(*name);
                    if inner_mandatory {
                        required.push(*name);
                    }
                }
                collect_names(elements, inner_mandatory, names, required);
            }
        }
    }
}
