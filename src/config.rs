use crate::storage::BackendLocal;
use serde::{Deserialize, Serialize};

/// Default pattern for daily-note names (matched at the start of the name)
const DEFAULT_DAILY_NOTE_REGEX: &str = r"\d{4}-\d{2}-\d{2}";

/// Default listen address for the daemon (the obsidian-pylab port)
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";

/// Default semantic embedding model (bge-base offers +13% accuracy vs MiniLM)
const DEFAULT_SEMANTIC_MODEL: &str = "bge-base-en-v1.5";
/// Minimum plaintext length for a note to be semantically indexed
const DEFAULT_MIN_PLAINTEXT_CHARS: usize = 100;

/// Configuration for the optional semantic index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticIndexConfig {
    /// Enable or disable the semantic signal
    #[serde(default)]
    pub enabled: bool,

    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Notes with less plaintext than this are not embedded
    #[serde(default = "default_min_plaintext_chars")]
    pub min_plaintext_chars: usize,
}

impl Default for SemanticIndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_SEMANTIC_MODEL.to_string(),
            min_plaintext_chars: DEFAULT_MIN_PLAINTEXT_CHARS,
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_SEMANTIC_MODEL.to_string()
}

fn default_min_plaintext_chars() -> usize {
    DEFAULT_MIN_PLAINTEXT_CHARS
}

/// Per-category result limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryLimits {
    #[serde(default = "default_long_limit")]
    pub long: usize,
    #[serde(default = "default_short_limit")]
    pub short: usize,
    #[serde(default = "default_daily_limit")]
    pub daily: usize,
    #[serde(default = "default_nonexistent_limit")]
    pub nonexistent: usize,
    #[serde(default = "default_semantic_limit")]
    pub semantic: usize,
}

impl Default for CategoryLimits {
    fn default() -> Self {
        Self {
            long: 8,
            short: 8,
            daily: 5,
            nonexistent: 5,
            semantic: 10,
        }
    }
}

fn default_long_limit() -> usize {
    8
}

fn default_short_limit() -> usize {
    8
}

fn default_daily_limit() -> usize {
    5
}

fn default_nonexistent_limit() -> usize {
    5
}

fn default_semantic_limit() -> usize {
    10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root of the vault to index. May be empty; the daemon then takes the
    /// vault path from the first request.
    #[serde(default)]
    pub vault_path: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Pattern marking a note name as a daily/journal note
    #[serde(default = "default_daily_note_regex")]
    pub daily_note_regex: String,

    #[serde(default)]
    pub limits: CategoryLimits,

    #[serde(default)]
    pub semantic_index: SemanticIndexConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: String::new(),
            listen_addr: default_listen_addr(),
            daily_note_regex: default_daily_note_regex(),
            limits: CategoryLimits::default(),
            semantic_index: SemanticIndexConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_daily_note_regex() -> String {
    DEFAULT_DAILY_NOTE_REGEX.to_string()
}

/// Data directory: `$VREL_BASE_PATH` or `~/.local/share/vrel`.
pub fn default_base_path() -> String {
    std::env::var("VREL_BASE_PATH").unwrap_or_else(|_| {
        format!(
            "{}/.local/share/vrel",
            homedir::my_home()
                .expect("couldnt find home dir")
                .expect("couldnt find home dir")
                .to_string_lossy()
        )
    })
}

impl Config {
    fn validate(&mut self) {
        if let Err(err) = regex::Regex::new(&self.daily_note_regex) {
            panic!("daily_note_regex is not a valid regex: {err}");
        }

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            panic!("listen_addr must be host:port, got '{}'", self.listen_addr);
        }

        if self.semantic_index.min_plaintext_chars == 0 {
            panic!("semantic_index.min_plaintext_chars must be greater than 0");
        }
    }

    pub fn load() -> Self {
        Self::load_with(&default_base_path())
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("couldnt create data directory");

        // create new if does not exist
        if !store.exists("config.yaml") {
            store
                .write(
                    "config.yaml",
                    serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
                )
                .expect("couldnt write default config");
        }

        let config_str = String::from_utf8(store.read("config.yaml").expect("couldnt read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("couldnt create data directory");

        let config_str = serde_yml::to_string(&self).unwrap();
        store
            .write("config.yaml", config_str.as_bytes())
            .expect("couldnt write config");
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}
