use crate::error::MonitorError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Buy and sell trigger prices for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPrice {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub buy_target: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sell_target: Decimal,
}

/// One market's list of target prices, backed by a JSON array document.
///
/// The raw entries are kept alongside the parsed index so that updating a
/// single symbol rewrites only that entry's target fields; every other entry,
/// any extra fields and the key order survive the round trip.
#[derive(Debug, Clone, Default)]
pub struct TargetBook {
    path: Option<PathBuf>,
    entries: Vec<Map<String, Value>>,
    index: HashMap<String, TargetPrice>,
}

impl TargetBook {
    /// An in-memory book that is never written to disk.
    pub fn from_targets(targets: impl IntoIterator<Item = TargetPrice>) -> Result<Self, MonitorError> {
        let mut book = Self::default();
        for target in targets {
            book.upsert(&target.symbol, target.buy_target, target.sell_target)?;
        }
        Ok(book)
    }

    /// Reads the target list at `path`. A missing file yields an empty book
    /// that will be created on the first update.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let path = path.as_ref();
        match Self::read(path)? {
            Some(book) => {
                tracing::info!(path = %path.display(), targets = book.len(), "Loaded target list.");
                Ok(book)
            }
            None => {
                tracing::warn!(path = %path.display(), "Target list not found, starting empty.");
                Ok(Self::empty_at(path))
            }
        }
    }

    /// Re-reads the backing document, replacing the in-memory targets.
    /// Returns whether the targets changed. On error the current targets are kept.
    pub fn reload(&mut self) -> Result<bool, MonitorError> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        let book = Self::read(&path)?.unwrap_or_else(|| Self::empty_at(&path));
        let changed = book.entries != self.entries;
        if changed {
            tracing::info!(path = %path.display(), targets = book.len(), "Target list changed, reloaded.");
        }
        *self = book;
        Ok(changed)
    }

    fn empty_at(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        }
    }

    fn read(path: &Path) -> Result<Option<Self>, MonitorError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut book = Self::empty_at(path);
        book.entries = serde_json::from_str(&data)?;
        book.rebuild_index()?;
        Ok(Some(book))
    }

    pub fn get(&self, symbol: &str) -> Option<&TargetPrice> {
        self.index.get(&symbol.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetPrice> {
        self.index.values()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Rewrites the targets of `symbol` in place and persists the document.
    /// An unknown symbol is appended as a new entry.
    pub fn update_target(
        &mut self,
        symbol: &str,
        buy_target: Decimal,
        sell_target: Decimal,
    ) -> Result<(), MonitorError> {
        self.upsert(symbol, buy_target, sell_target)?;
        self.save()
    }

    /// Writes the document back to its path, if it has one.
    pub fn save(&self) -> Result<(), MonitorError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn upsert(
        &mut self,
        symbol: &str,
        buy_target: Decimal,
        sell_target: Decimal,
    ) -> Result<(), MonitorError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(MonitorError::InvalidTarget("symbol cannot be empty".to_string()));
        }
        let target = TargetPrice {
            symbol: symbol.clone(),
            buy_target,
            sell_target,
        };
        let Value::Object(fresh) = serde_json::to_value(&target)? else {
            return Err(MonitorError::InvalidTarget(format!("{symbol} did not serialize to an object")));
        };

        let existing = self.entries.iter_mut().find(|entry| {
            entry
                .get("symbol")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case(&symbol))
        });
        match existing {
            Some(entry) => {
                for key in ["buyTarget", "sellTarget"] {
                    if let Some(value) = fresh.get(key) {
                        entry.insert(key.to_string(), value.clone());
                    }
                }
            }
            None => self.entries.push(fresh),
        }

        self.index.insert(symbol, target);
        Ok(())
    }

    fn rebuild_index(&mut self) -> Result<(), MonitorError> {
        self.index.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            let target: TargetPrice = serde_json::from_value(Value::Object(entry.clone()))
                .map_err(|e| MonitorError::InvalidTarget(format!("entry {position}: {e}")))?;
            let symbol = target.symbol.trim().to_uppercase();
            if target.buy_target > target.sell_target {
                // Buy wins on evaluation; flag it but keep the entry.
                tracing::warn!(%symbol, buy = %target.buy_target, sell = %target.sell_target,
                    "Buy target is above sell target.");
            }
            self.index.insert(symbol.clone(), TargetPrice { symbol, ..target });
        }
        Ok(())
    }
}
