//! Provider-keyed connection-string templates and data locations

use crate::{BudexError, Provider, Result, Source, quote_value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SQLITE_TEMPLATE: &str = "Data Source={path};Version=3;";
const SQLCE_TEMPLATE: &str = "Data Source={path};Persist Security Info=False;";
const SQLSERVER_TEMPLATE: &str =
    "Server=tcp:localhost,1433;Database=Budget;User Id=sa;Password=;TrustServerCertificate=true;";
const OLEDB_TEMPLATE: &str = "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={path};";
const EXCEL_TEMPLATE: &str = "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={path};Extended Properties=\"Excel 12.0 Xml;HDR=YES\";";
const CSV_TEMPLATE: &str = "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={directory};Extended Properties=\"text;HDR=YES;FMT=Delimited\";";

/// Name of the configuration file inside the budex config directory
pub const CONFIG_FILE_NAME: &str = "data.toml";

/// Connection configuration, loaded once at startup and never mutated afterwards.
///
/// Templates may contain `{path}` (the backing file) and `{directory}` (its
/// parent directory). `Access`, `Excel` and `CSV` fall back to the `OleDb`
/// template when they have no entry of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    data_dir: PathBuf,
    connection_strings: BTreeMap<Provider, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    data_dir: Option<PathBuf>,
    inherit_defaults: Option<bool>,
    connection_strings: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl DataConfig {
    /// Built-in templates rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let connection_strings = BTreeMap::from([
            (Provider::Sqlite, SQLITE_TEMPLATE.to_string()),
            (Provider::SqlCe, SQLCE_TEMPLATE.to_string()),
            (Provider::SqlServer, SQLSERVER_TEMPLATE.to_string()),
            (Provider::OleDb, OLEDB_TEMPLATE.to_string()),
            (Provider::Access, OLEDB_TEMPLATE.to_string()),
            (Provider::Excel, EXCEL_TEMPLATE.to_string()),
            (Provider::Csv, CSV_TEMPLATE.to_string()),
        ]);
        Self {
            data_dir: data_dir.into(),
            connection_strings,
        }
    }

    /// No templates at all; every provider must be configured explicitly
    pub fn empty(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            connection_strings: BTreeMap::new(),
        }
    }

    /// Move the data directory, keeping the templates
    pub fn set_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Replace the template of one provider
    pub fn set_template(mut self, provider: Provider, template: impl Into<String>) -> Self {
        self.connection_strings.insert(provider, template.into());
        self
    }

    /// Parse a TOML document. Entries overlay the built-in templates unless
    /// `inherit_defaults = false`.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let data_dir = raw.data_dir.unwrap_or_else(default_data_dir);
        let mut config = if raw.inherit_defaults.unwrap_or(true) {
            Self::with_data_dir(data_dir)
        } else {
            Self::empty(data_dir)
        };

        for (key, template) in raw.connection_strings {
            let provider = Provider::from_str(&key).map_err(|_| {
                BudexError::Configuration(format!("Unknown provider in connection_strings: {}", key))
            })?;
            if provider == Provider::None {
                return Err(BudexError::Configuration(
                    "Provider None cannot have a connection string".into(),
                ));
            }
            config.connection_strings.insert(provider, template);
        }

        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BudexError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), data_dir = %config.data_dir.display(), "loaded data configuration");
        Ok(config)
    }

    /// Load `path` if given, else the default config file if it exists, else the built-ins
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Template for a provider, after the OLE DB fallback
    pub fn template(&self, provider: Provider) -> Option<&str> {
        let own = self.connection_strings.get(&provider).map(String::as_str);
        match provider {
            Provider::None => None,
            Provider::Access | Provider::Excel | Provider::Csv => {
                own.or_else(|| self.connection_strings.get(&Provider::OleDb).map(String::as_str))
            }
            Provider::Sqlite | Provider::SqlServer | Provider::SqlCe | Provider::OleDb => own,
        }
    }

    /// Location of the file backing `source` for `provider`, `None` for servers
    pub fn database_path(&self, source: Source, provider: Provider) -> Option<PathBuf> {
        match provider {
            Provider::Sqlite => Some(self.data_dir.join("sqlite").join("Data.db")),
            Provider::SqlCe => Some(self.data_dir.join("sqlce").join("Data.sdf")),
            Provider::Access | Provider::OleDb => {
                Some(self.data_dir.join("access").join("Data.accdb"))
            }
            Provider::Excel => Some(
                self.data_dir
                    .join("excel")
                    .join(format!("{}.xlsx", source.table_name())),
            ),
            Provider::Csv => Some(
                self.data_dir
                    .join("csv")
                    .join(format!("{}.csv", source.table_name())),
            ),
            Provider::SqlServer | Provider::None => None,
        }
    }

    /// Fill a provider's template for a file.
    ///
    /// Substituted paths are quoted when they contain `;`, `"` or edge
    /// whitespace, so a template must leave `{path}` and `{directory}` bare.
    pub fn connection_string(&self, provider: Provider, path: Option<&Path>) -> Result<String> {
        let template = self.template(provider).ok_or_else(|| {
            BudexError::Configuration(format!("No connection string configured for {}", provider))
        })?;

        let needs_path = template.contains("{path}") || template.contains("{directory}");
        let resolved = match (needs_path, path) {
            (false, _) => template.to_string(),
            (true, Some(path)) => {
                let file = path.display().to_string();
                let directory = path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                template
                    .replace("{path}", &quote_value(&file))
                    .replace("{directory}", &quote_value(&directory))
            }
            (true, None) => {
                return Err(BudexError::Configuration(format!(
                    "Connection string for {} needs a file path",
                    provider
                )));
            }
        };

        if resolved.trim().is_empty() {
            return Err(BudexError::Configuration(format!(
                "Connection string for {} is empty",
                provider
            )));
        }
        Ok(resolved)
    }
}

/// `<local data dir>/budex/data`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("budex")
        .join("data")
}

/// `<config dir>/budex/data.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("budex").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_locations() {
        let config = DataConfig::with_data_dir("/srv/budex");
        assert_eq!(
            config.database_path(Source::Accounts, Provider::Sqlite),
            Some(PathBuf::from("/srv/budex/sqlite/Data.db"))
        );
        assert_eq!(
            config.database_path(Source::Outlays, Provider::Excel),
            Some(PathBuf::from("/srv/budex/excel/Outlays.xlsx"))
        );
        assert_eq!(
            config.database_path(Source::Divisions, Provider::Csv),
            Some(PathBuf::from("/srv/budex/csv/Divisions.csv"))
        );
        assert_eq!(config.database_path(Source::Accounts, Provider::SqlServer), None);
    }

    #[test]
    fn test_placeholders_are_filled() {
        let config = DataConfig::with_data_dir("/srv/budex");
        let path = config.database_path(Source::Funds, Provider::Csv);
        let cs = config
            .connection_string(Provider::Csv, path.as_deref())
            .unwrap();
        assert!(cs.contains("Data Source=/srv/budex/csv;"));
        assert!(!cs.contains('{'));
    }

    #[test]
    fn test_semicolon_in_data_dir_stays_in_data_source() {
        let config = DataConfig::with_data_dir("/srv/a;b");
        let path = config.database_path(Source::Accounts, Provider::Sqlite);
        let cs = config
            .connection_string(Provider::Sqlite, path.as_deref())
            .unwrap();
        assert_eq!(cs, "Data Source=\"/srv/a;b/sqlite/Data.db\";Version=3;");
        let parsed = crate::ConnectionString::parse(&cs);
        assert_eq!(parsed.data_source(), Some("/srv/a;b/sqlite/Data.db"));
        assert_eq!(parsed.get("Version"), Some("3"));

        let path = config.database_path(Source::Funds, Provider::Csv);
        let cs = config.connection_string(Provider::Csv, path.as_deref()).unwrap();
        let parsed = crate::ConnectionString::parse(&cs);
        assert_eq!(parsed.data_source(), Some("/srv/a;b/csv"));
        assert_eq!(parsed.get("Extended Properties"), Some("text;HDR=YES;FMT=Delimited"));
    }

    #[test]
    fn test_toml_overlays_defaults() {
        let config = DataConfig::from_toml_str(
            r#"
            data_dir = "/data"

            [connection_strings]
            SQLite = "Data Source={path};"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir(), Path::new("/data"));
        assert_eq!(config.template(Provider::Sqlite), Some("Data Source={path};"));
        assert_eq!(config.template(Provider::SqlServer), Some(SQLSERVER_TEMPLATE));
    }

    #[test]
    fn test_file_providers_fall_back_to_oledb() {
        let config = DataConfig::from_toml_str(
            r#"
            inherit_defaults = false

            [connection_strings]
            OleDb = "Provider=Ace;Data Source={path};"
            "#,
        )
        .unwrap();
        assert_eq!(config.template(Provider::Excel), Some("Provider=Ace;Data Source={path};"));
        assert_eq!(config.template(Provider::Access), Some("Provider=Ace;Data Source={path};"));
        assert_eq!(config.template(Provider::Sqlite), None);
        assert!(config.connection_string(Provider::Sqlite, None).is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = DataConfig::from_toml_str("[connection_strings]\nOracle = \"x\"\n").unwrap_err();
        assert!(matches!(err, BudexError::Configuration(_)));
    }

    #[test]
    fn test_none_has_no_template() {
        let config = DataConfig::default();
        assert_eq!(config.template(Provider::None), None);
        assert!(config.connection_string(Provider::None, None).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "data_dir = \"/elsewhere\"\n").unwrap();
        let config = DataConfig::load(&path).unwrap();
        assert_eq!(config.data_dir(), Path::new("/elsewhere"));
        assert!(DataConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_data_dir_override_keeps_templates() {
        let config = DataConfig::with_data_dir("/srv/budex")
            .set_template(Provider::Sqlite, "Data Source={path};")
            .set_data_dir("/mnt/other");
        assert_eq!(config.data_dir(), Path::new("/mnt/other"));
        assert_eq!(config.template(Provider::Sqlite), Some("Data Source={path};"));
        assert_eq!(
            config.database_path(Source::Accounts, Provider::Sqlite),
            Some(PathBuf::from("/mnt/other/sqlite/Data.db"))
        );
    }
}
