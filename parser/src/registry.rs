use crate::error::ParseError;
use crate::tags::{TagDefinition, standard_definitions};
use once_cell::sync::Lazy;
use std::collections::HashMap;

static STANDARD: Lazy<TagRegistry> = Lazy::new(|| {
    standard_definitions()
        .and_then(TagRegistry::new)
        .expect("built-in MT940 tag table must compile and have unique ids")
});

/// Таблица тегов: идентификатор -> определение.
///
/// Строится один раз, дальше только читается, поэтому одну таблицу можно
/// использовать из нескольких потоков для разных сообщений.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    tags: HashMap<String, TagDefinition>,
}

impl TagRegistry {
    /// Строит таблицу. Два определения с одним идентификатором - ошибка.
    pub fn new<I>(definitions: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = TagDefinition>,
    {
        let mut tags = HashMap::new();
        for definition in definitions {
            let id = definition.id().to_string();
            if tags.contains_key(&id) {
                return Err(ParseError::DuplicateTag(id));
            }
            tags.insert(id, definition);
        }
        Ok(TagRegistry { tags })
    }

    /// Встроенная таблица MT940
    pub fn standard() -> &'static TagRegistry {
        &STANDARD
    }

    /// Поиск с учётом регистра: `60F` и `60f` - разные теги
    pub fn get(&self, id: &str) -> Option<&TagDefinition> {
        self.tags.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tags.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagDefinition> {
        self.tags.values()
    }
}
