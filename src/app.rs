//! Wires configuration, credentials and backends into the three entity stores.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use fintrack_config::{BackendKind, Config, ConfigManager};
use fintrack_core::{
    ApiResult, AuthProvider, Backend, BudgetService, CategoryService, EntityStore, SessionAuth,
    TransactionService,
};
use fintrack_domain::{Category, Entity, Transaction};
use fintrack_http::{build_client, HttpBackend, HttpClient};
use fintrack_storage_json::JsonEntityStorage;
use tracing::info;

use crate::{
    errors::CliError,
    utils::{env_value, API_URL_ENV, HOME_ENV, TOKEN_ENV},
};

/// Client-side application state shared by every shell command.
pub struct FinanceApp {
    base_dir: PathBuf,
    config: Config,
    config_manager: ConfigManager,
    auth: Arc<SessionAuth>,
    budgets: BudgetService,
    categories: EntityStore<Category>,
    transactions: EntityStore<Transaction>,
}

impl FinanceApp {
    /// Loads settings under `base_dir`, applies environment overrides and opens the stores.
    pub fn open(base_dir: PathBuf) -> Result<Self, CliError> {
        let config_manager = ConfigManager::with_base_dir(base_dir.clone())?;
        let config = config_manager.load()?;
        let auth = match env_value(TOKEN_ENV) {
            Some(token) => SessionAuth::with_token(token),
            None => SessionAuth::persisted(config_manager.token_path())?,
        };
        Self::from_parts(base_dir, config, config_manager, Arc::new(auth))
    }

    pub fn from_parts(
        base_dir: PathBuf,
        config: Config,
        config_manager: ConfigManager,
        auth: Arc<SessionAuth>,
    ) -> Result<Self, CliError> {
        let effective = effective_config(&config);
        let source = BackendSource::from_config(&effective, &base_dir)?;
        let dyn_auth: Arc<dyn AuthProvider> = auth.clone();
        let budgets = BudgetService::new(source.backend()?, Arc::clone(&dyn_auth));
        let categories = CategoryService::open(source.backend()?, Arc::clone(&dyn_auth));
        let transactions = TransactionService::open(source.backend()?, dyn_auth);
        info!(
            backend = %effective.backend,
            api = %effective.api_base_url,
            "fintrack stores ready"
        );
        Ok(Self {
            base_dir,
            config,
            config_manager,
            auth,
            budgets,
            categories,
            transactions,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// Persists `config` and reopens the stores against it. Cached items are dropped.
    pub fn apply_config(&mut self, config: Config) -> Result<(), CliError> {
        self.config_manager.save(&config)?;
        let reopened = Self::from_parts(
            self.base_dir.clone(),
            config,
            self.config_manager.clone(),
            Arc::clone(&self.auth),
        )?;
        *self = reopened;
        Ok(())
    }

    pub fn auth(&self) -> &SessionAuth {
        &self.auth
    }

    pub fn budgets(&self) -> &BudgetService {
        &self.budgets
    }

    pub fn categories(&self) -> &EntityStore<Category> {
        &self.categories
    }

    pub fn transactions(&self) -> &EntityStore<Transaction> {
        &self.transactions
    }

    /// Directory the local backend writes to, whether or not it is active.
    pub fn data_dir(&self) -> PathBuf {
        local_data_dir(&self.config, &self.base_dir)
    }
}

fn effective_config(config: &Config) -> Config {
    let mut effective = config.clone();
    if let Some(url) = env_value(API_URL_ENV) {
        effective.api_base_url = url;
    }
    effective
}

// With FINTRACK_HOME set, local data stays under that directory.
fn local_data_dir(config: &Config, base_dir: &Path) -> PathBuf {
    match (&config.data_dir, env_value(HOME_ENV)) {
        (Some(dir), _) => dir.clone(),
        (None, Some(_)) => base_dir.join("data"),
        (None, None) => config.resolve_data_dir(),
    }
}

/// Where the three stores persist. HTTP backends share one client and connection pool.
enum BackendSource {
    Http { client: HttpClient, base_url: String },
    Local { data_dir: PathBuf },
}

impl BackendSource {
    fn from_config(config: &Config, base_dir: &Path) -> ApiResult<Self> {
        Ok(match config.backend {
            BackendKind::Http => BackendSource::Http {
                client: build_client(config.request_timeout())?,
                base_url: config.api_base_url.clone(),
            },
            BackendKind::Local => BackendSource::Local {
                data_dir: local_data_dir(config, base_dir),
            },
        })
    }

    fn backend<T: Entity>(&self) -> ApiResult<Arc<dyn Backend<T>>> {
        Ok(match self {
            BackendSource::Http { client, base_url } => {
                Arc::new(HttpBackend::<T>::with_client(client.clone(), base_url))
            }
            BackendSource::Local { data_dir } => {
                Arc::new(JsonEntityStorage::<T>::new(data_dir.clone())?)
            }
        })
    }
}
