use std::{fs, path::{Path, PathBuf}};

use serde::Deserialize;

use crate::{error::ConfigError, policy::LoanPolicy, store::Store};

/// Runtime settings, read from an optional JSON file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding `books.txt`, `users.txt` and `authors.txt`
    pub data_dir: PathBuf,
    /// Days a borrower may keep a book
    pub loan_period_days: u32,
    /// Fine per whole day late, in currency units
    pub daily_fine: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("."), loan_period_days: 14, daily_fine: 1 }
    }
}

impl Config {
    /// Read a JSON config file; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&contents)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    /// Store rooted at the data directory
    #[must_use]
    pub fn store(&self) -> Store {
        Store::new(&self.data_dir)
    }

    /// Loan policy for these settings
    #[must_use]
    pub fn policy(&self) -> LoanPolicy {
        LoanPolicy::new(self.loan_period_days, self.daily_fine)
    }
}
