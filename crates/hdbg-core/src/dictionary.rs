//! Message and file dictionaries
//!
//! Records on the wire carry only a numeric message code; the dictionary maps
//! each code to a display template, a severity level, and the ordered schema
//! of typed context fields that follow the code in the byte stream. A second
//! table maps the trailing one-byte file code to a source file name.
//!
//! Both tables are immutable, loaded once at process start. A code absent
//! from its table is treated as data corruption; there is no fallback entry.

use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Severity Levels
// ----------------------------------------------------------------------------

/// Severity of a decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

// ----------------------------------------------------------------------------
// Field Schema
// ----------------------------------------------------------------------------

/// Primitive type of one context field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 4 bytes, signed.
    I32,
    /// 8 bytes, signed.
    I64,
    /// 4 bytes, IEEE 754.
    F32,
    /// 8 bytes, IEEE 754.
    F64,
    /// 1 byte, zero is false.
    Bool,
    /// 1-byte length prefix followed by UTF-8 bytes.
    Str,
    /// 2 bytes, unsigned.
    U16,
}

/// One named, typed context field in a message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

// ----------------------------------------------------------------------------
// Message Dictionary
// ----------------------------------------------------------------------------

/// Dictionary entry for one message code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSpec {
    /// Display template with `%field%` placeholders.
    pub template: &'static str,
    /// Severity this message is always reported at.
    pub level: Level,
    /// Context fields, in wire order.
    pub fields: &'static [FieldSpec],
}

/// Immutable mapping from numeric message code to its [`MessageSpec`].
#[derive(Debug, Clone)]
pub struct MessageDictionary {
    entries: HashMap<u16, MessageSpec>,
}

impl MessageDictionary {
    /// Build a dictionary from explicit entries, mainly for tests.
    pub fn from_entries(entries: impl IntoIterator<Item = (u16, MessageSpec)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The built-in dictionary shipped with this revision of the decoder.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_MESSAGES.iter().copied())
    }

    /// Look up a message code. `None` is a corruption signal for the caller.
    pub fn get(&self, code: u16) -> Option<&MessageSpec> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ----------------------------------------------------------------------------
// File Table
// ----------------------------------------------------------------------------

/// Immutable mapping from the one-byte trailing file code to a file name.
/// An unmapped code is a corruption signal, not silently tolerated.
#[derive(Debug, Clone)]
pub struct FileTable {
    entries: HashMap<u8, &'static str>,
}

impl FileTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (u8, &'static str)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The built-in file table for the current firmware layout.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_FILES.iter().copied())
    }

    pub fn get(&self, code: u8) -> Option<&'static str> {
        self.entries.get(&code).copied()
    }
}

// ----------------------------------------------------------------------------
// Built-in Tables
// ----------------------------------------------------------------------------

const SYNC_STARTED_FIELDS: &[FieldSpec] = &[FieldSpec::new("cache_size", FieldKind::I32)];
const SYNC_FINISHED_FIELDS: &[FieldSpec] = &[FieldSpec::new("elapsed_ms", FieldKind::I64)];
const SYNC_FAILED_FIELDS: &[FieldSpec] = &[FieldSpec::new("reason", FieldKind::Str)];
const RECONNECT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("host", FieldKind::Str),
    FieldSpec::new("attempt", FieldKind::U16),
];
const FREE_MEMORY_FIELDS: &[FieldSpec] = &[FieldSpec::new("free_bytes", FieldKind::I64)];
const SENSOR_TEMP_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("sensor", FieldKind::Str),
    FieldSpec::new("celsius", FieldKind::F32),
];
const BATTERY_FIELDS: &[FieldSpec] = &[FieldSpec::new("percent", FieldKind::U16)];
const POSITION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("lat", FieldKind::F64),
    FieldSpec::new("lon", FieldKind::F64),
];
const CACHE_CLEARED_FIELDS: &[FieldSpec] = &[FieldSpec::new("forced", FieldKind::Bool)];

/// Device firmware messages, dictionary revision 1.x. Templates are kept
/// verbatim from the firmware strings, including the legacy location suffix
/// on code 10 that the renderer strips.
const BUILTIN_MESSAGES: &[(u16, MessageSpec)] = &[
    (
        1,
        MessageSpec {
            template: "Синхронизация начата (размер кэша: %cache_size%)",
            level: Level::Info,
            fields: SYNC_STARTED_FIELDS,
        },
    ),
    (
        2,
        MessageSpec {
            template: "Синхронизация завершена за %elapsed_ms% мс",
            level: Level::Info,
            fields: SYNC_FINISHED_FIELDS,
        },
    ),
    (
        3,
        MessageSpec {
            template: "Ошибка синхронизации: %reason%",
            level: Level::Error,
            fields: SYNC_FAILED_FIELDS,
        },
    ),
    (
        4,
        MessageSpec {
            template: "Повторное подключение к %host% (попытка %attempt%)",
            level: Level::Warn,
            fields: RECONNECT_FIELDS,
        },
    ),
    (
        5,
        MessageSpec {
            template: "Свободная память: %free_bytes% байт",
            level: Level::Debug,
            fields: FREE_MEMORY_FIELDS,
        },
    ),
    (
        6,
        MessageSpec {
            template: "Температура датчика %sensor%: %celsius%",
            level: Level::Warn,
            fields: SENSOR_TEMP_FIELDS,
        },
    ),
    (
        7,
        MessageSpec {
            template: "Уровень заряда батареи: %percent%",
            level: Level::Info,
            fields: BATTERY_FIELDS,
        },
    ),
    (
        8,
        MessageSpec {
            template: "Координаты: %lat%, %lon%",
            level: Level::Debug,
            fields: POSITION_FIELDS,
        },
    ),
    (
        9,
        MessageSpec {
            template: "Кэш очищен (принудительно: %forced%)",
            level: Level::Info,
            fields: CACHE_CLEARED_FIELDS,
        },
    ),
    (
        10,
        MessageSpec {
            template: "Отказ записи в журнал (file %file%, line %line%)",
            level: Level::Error,
            fields: &[],
        },
    ),
];

const BUILTIN_FILES: &[(u8, &str)] = &[
    (1, "sync.c"),
    (2, "net.c"),
    (3, "sensors.c"),
    (4, "storage.c"),
    (5, "main.c"),
];

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
