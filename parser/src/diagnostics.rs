//! Приёмник диагностики для одного прохода разбора.
//!
//! Ядро не пишет в глобальный логгер само: приёмник передаётся в
//! [`crate::statement::StatementParser`]. [`LogSink`] перенаправляет всё в `log`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Warning,
}

/// Одно сообщение, привязанное к вхождению тега
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    /// номер тега в потоке, с единицы
    pub position: usize,
    pub tag: String,
    pub message: String,
}

impl Diagnostic {
    pub fn debug(position: usize, tag: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: Level::Debug,
            position,
            tag: tag.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(position: usize, tag: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: Level::Warning,
            position,
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag #{} (:{}:): {}", self.position, self.tag, self.message)
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Собирает всё в вектор
impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Перенаправляет диагностику в `log`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            Level::Debug => log::debug!(target: "mt940_parser", "{diagnostic}"),
            Level::Warning => log::warn!(target: "mt940_parser", "{diagnostic}"),
        }
    }
}

/// Отбрасывает всё
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}
