use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::PreferenceError;

pub const THEME_KEY: &str = "theme";

/// Key-value settings storage. Each platform supplies its own adapter over
/// its native store; reading a key stored with a different type yields `None`.
pub trait PreferenceStore {
    fn get_string(&self, key: &str) -> Option<String>;
    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;

    fn get_bool(&self, key: &str) -> Option<bool>;
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError>;

    fn get_int(&self, key: &str) -> Option<i64>;
    fn put_int(&mut self, key: &str, value: i64) -> Result<(), PreferenceError>;
}

#[derive(Debug, Clone, PartialEq)]
enum PreferenceValue {
    String(String),
    Bool(bool),
    Int(i64),
}

/// Process lifetime store, nothing is persisted
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: HashMap<String, PreferenceValue>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key) {
            Some(PreferenceValue::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .insert(key.to_string(), PreferenceValue::String(value.to_string()));
        Ok(())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(PreferenceValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), PreferenceValue::Bool(value));
        Ok(())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(PreferenceValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    fn put_int(&mut self, key: &str, value: i64) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), PreferenceValue::Int(value));
        Ok(())
    }
}

/// Store backed by a json object on disk, rewritten on every put
#[derive(Debug, Clone)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFilePreferences {
    /// Opens the store at `path`. A missing file starts out empty.
    pub fn open(path: &Path) -> Result<Self, PreferenceError> {
        let values = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(values) => values,
                _ => return Err(PreferenceError::NotAnObject),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(JsonFilePreferences {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value);
        let raw = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.put(key, Value::from(value))
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.put(key, Value::from(value))
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    fn put_int(&mut self, key: &str, value: i64) -> Result<(), PreferenceError> {
        self.put(key, Value::from(value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn from_name(raw: &str) -> Option<Theme> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The saved theme, `System` when nothing usable is stored
pub fn load_theme(store: &dyn PreferenceStore) -> Theme {
    store
        .get_string(THEME_KEY)
        .and_then(|raw| Theme::from_name(&raw))
        .unwrap_or_default()
}

pub fn save_theme(store: &mut dyn PreferenceStore, theme: Theme) -> Result<(), PreferenceError> {
    store.put_string(THEME_KEY, theme.as_str())
}
