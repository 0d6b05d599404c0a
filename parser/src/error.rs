use thiserror::Error;

/// Ошибки разбора тегов MT940
#[derive(Debug, Error)]
pub enum ParseError {
    // ошибки реестра

    /// два определения с одинаковым идентификатором тега
    #[error("duplicate tag id in registry: {0}")]
    DuplicateTag(String),
    /// грамматика тега не скомпилировалась в regex
    #[error("invalid pattern for tag {tag}: {source}")]
    InvalidPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    // ошибки разбора значения

    /// тег отсутствует в реестре
    #[error("unknown tag: {0}")]
    UnknownTag(String),
    /// значение не соответствует грамматике тега
    #[error("unable to parse tag {tag} from {value:?} (pattern {pattern})")]
    PatternMismatch {
        tag: String,
        value: String,
        pattern: String,
    },
    /// компонент совпал, но не приводится к типу (дата, сумма)
    #[error("tag {tag}: cannot convert component {component} = {value:?}: {reason}")]
    FieldCoercion {
        tag: String,
        component: &'static str,
        value: String,
        reason: String,
    },
    /// тег пришёл в состоянии, где его не ждали
    #[error("tag {tag} is not expected in state {state}")]
    Ordering { tag: String, state: String },

    /// очень общая ошибка плохих входных данных (разбиение на блоки)
    #[error("bad input: {0}")]
    BadInput(String),
    /// обёртка std::io::Error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ошибка, привязанная к конкретному вхождению тега в потоке.
///
/// `position` считается с единицы, в порядке подачи тегов.
#[derive(Debug, Error)]
#[error("tag #{position} (:{tag}:): {kind}")]
pub struct TagError {
    pub position: usize,
    pub tag: String,
    #[source]
    pub kind: ParseError,
}

impl TagError {
    pub fn new(position: usize, tag: impl Into<String>, kind: ParseError) -> Self {
        TagError {
            position,
            tag: tag.into(),
            kind,
        }
    }
}
