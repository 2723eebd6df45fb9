//! Bot configuration document
//!
//! Read whole, change one key, write whole. There is no locking; two saves in
//! quick succession race and the last one wins.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use super::{read_json, write_json, ReadOutcome, StoreError};

pub type Document = Map<String, Value>;

pub const DRY_RUN_KEY: &str = "dry_run";

/// Host the bot container reaches the local proxy through
pub const PROXY_HOST: &str = "http://host.docker.internal";

/// Outcome of saving a proxy port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySave {
    Saved { url: String },
    /// Input was not a port number; nothing was written
    Ignored,
    Failed(String),
}

/// Read/modify/write access to `user_data/config.json`
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole document
    pub fn read(&self) -> ReadOutcome<Document> {
        match read_json::<Value>(&self.path) {
            ReadOutcome::Ok(Value::Object(map)) => ReadOutcome::Ok(map),
            ReadOutcome::Ok(other) => {
                tracing::warn!(
                    "{} holds a JSON {} instead of an object",
                    self.path.display(),
                    json_kind(&other)
                );
                ReadOutcome::Malformed("top level is not an object".to_string())
            }
            ReadOutcome::NotFound => ReadOutcome::NotFound,
            ReadOutcome::Malformed(msg) => ReadOutcome::Malformed(msg),
            ReadOutcome::Unreadable(msg) => ReadOutcome::Unreadable(msg),
        }
    }

    /// Value of a top-level key, or `default` when the key or document is missing
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.read()
            .ok()
            .and_then(|mut doc| doc.remove(key))
            .unwrap_or(default)
    }

    /// Overwrite one top-level key. Returns false on any failure.
    pub fn set(&self, key: &str, value: Value) -> bool {
        match self.update(|doc| {
            doc.insert(key.to_string(), value);
        }) {
            Ok(()) => {
                tracing::info!("Saved {} in {}", key, self.path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Could not save {}: {}", key, e);
                false
            }
        }
    }

    /// Apply one change to the whole document and write it back
    fn update(&self, change: impl FnOnce(&mut Document)) -> Result<(), StoreError> {
        let mut doc = self.read().into_result()?;
        change(&mut doc);
        write_json(&self.path, &doc)
    }

    /// Current dry-run flag; missing or unreadable documents count as dry-run
    pub fn dry_run(&self) -> bool {
        self.get(DRY_RUN_KEY, Value::Bool(true)).as_bool().unwrap_or(true)
    }

    pub fn set_dry_run(&self, enabled: bool) -> bool {
        self.set(DRY_RUN_KEY, Value::Bool(enabled))
    }

    /// Port of the configured HTTP proxy, if one is set
    pub fn proxy_port(&self) -> Option<String> {
        let doc = self.read().ok()?;
        let proxy = doc
            .get("exchange")?
            .get("ccxt_config")?
            .get("proxies")?
            .get("http")?
            .as_str()?;
        port_from_proxy_url(proxy)
    }

    /// Point both proxy entries at `host.docker.internal:<port>`.
    ///
    /// Non-numeric input is ignored without touching the file. Missing
    /// `exchange` and `ccxt_config` objects are created.
    pub fn set_proxy_port(&self, port: &str) -> ProxySave {
        let port = port.trim();
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!("Ignoring non-numeric proxy port {:?}", port);
            return ProxySave::Ignored;
        }

        let url = format!("{}:{}", PROXY_HOST, port);
        let result = self.update(|doc| {
            let mut exchange = take_object(doc, "exchange", Map::new);
            let mut ccxt = take_object(&mut exchange, "ccxt_config", || {
                let mut seed = Map::new();
                seed.insert("enableRateLimit".to_string(), Value::Bool(true));
                seed
            });
            ccxt.insert("proxies".to_string(), json!({ "http": url, "https": url }));
            // Re-inserting an existing key keeps its position
            exchange.insert("ccxt_config".to_string(), Value::Object(ccxt));
            doc.insert("exchange".to_string(), Value::Object(exchange));
        });

        match result {
            Ok(()) => {
                tracing::info!("Proxy set to {}", url);
                ProxySave::Saved { url }
            }
            Err(e) => {
                tracing::warn!("Could not save proxy port: {}", e);
                ProxySave::Failed(e.to_string())
            }
        }
    }
}

/// Take `key` out as an object, leaving `null` in its slot.
///
/// Absent keys yield `seed()`; non-object values are replaced by an empty object.
fn take_object(parent: &mut Document, key: &str, seed: impl FnOnce() -> Document) -> Document {
    match parent.get_mut(key).map(Value::take) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            tracing::warn!("Replacing {} {:?} with an object", json_kind(&other), key);
            Map::new()
        }
        None => seed(),
    }
}

/// `http://host:7890/` -> `7890`
fn port_from_proxy_url(url: &str) -> Option<String> {
    if !url.contains(':') {
        return None;
    }
    let last = url.rsplit(':').next()?;
    Some(last.replace('/', ""))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
