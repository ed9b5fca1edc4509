//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::access::{AccessGate, NavigationAction};
use crate::cache::CacheService;
use crate::config::{ConfigLoader, ContextConfig};
use crate::error::{ApiError, StatusError};
use crate::identity::PermissionSet;
use crate::permissions::PermissionEvaluator;
use crate::resolver::{ContextResolver, ResolverPolicy};
use crate::session::IdentitySession;
use crate::status::{HttpStatusProvider, StatusPoller};
use crate::store::persistence::open_db;
use crate::store::{DelegateStore, Fixture, ProfileStore, SledDelegateStore, SledProfileStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::cli::parse::{Commands, DelegateCommands, StatusCommands};
use crate::cli::presentation::{
    format_check_result, format_context_json_output, format_context_text_output,
    format_decision_json, format_decision_text, format_import_summary, format_status_json,
    format_status_text,
};

/// Runtime context for CLI execution: config, stores and domain services.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: ContextConfig,
    runtime: Runtime,
    profiles: Arc<dyn ProfileStore>,
    delegates: Arc<dyn DelegateStore>,
    resolver: Arc<ContextResolver>,
    gate: AccessGate,
    evaluator: PermissionEvaluator,
    poller: Option<Arc<StatusPoller>>,
}

impl RunContext {
    /// Create run context from workspace root, optional config path and
    /// optional store directory override.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        store_path: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        if let Err(errors) = config.validate() {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(ApiError::ConfigError(joined.join("; ")));
        }

        let store_path = store_path.unwrap_or_else(|| config.storage.resolve_path());
        std::fs::create_dir_all(&store_path)
            .map_err(|e| ApiError::StorageError(crate::error::StoreError::IoError(e)))?;
        let db = open_db(&store_path)?;
        let profiles: Arc<dyn ProfileStore> = Arc::new(SledProfileStore::new(&db)?);
        let delegates: Arc<dyn DelegateStore> = Arc::new(SledDelegateStore::new(&db)?);
        debug!(store = %store_path.display(), "store opened");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;

        let cache = CacheService::new();
        let resolver = Arc::new(ContextResolver::new(
            cache.clone(),
            Arc::clone(&profiles),
            Arc::clone(&delegates),
            ResolverPolicy::from_config(&config.cache, &config.resolver),
        ));

        let poller = match &config.poller.endpoint {
            Some(endpoint) => {
                let provider =
                    HttpStatusProvider::new(endpoint.clone(), config.poller.request_timeout())?;
                Some(Arc::new(StatusPoller::new(
                    cache,
                    Arc::new(provider),
                    config.poller.clone(),
                )))
            }
            None => None,
        };

        Ok(Self {
            gate: AccessGate::new(config.routes.clone()),
            evaluator: PermissionEvaluator::new(),
            config,
            runtime,
            profiles,
            delegates,
            resolver,
            poller,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Execute a command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        self.runtime.block_on(self.dispatch(command))
    }

    async fn dispatch(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Import { path } => {
                let fixture = Fixture::load_from_file(path)?;
                let summary = fixture
                    .import_into(self.profiles.as_ref(), self.delegates.as_ref())
                    .await?;
                info!(
                    profiles = summary.profiles,
                    delegates = summary.delegates,
                    "fixture imported"
                );
                Ok(format_import_summary(&summary))
            }
            Commands::Resolve {
                principal,
                force,
                format,
            } => {
                let context = self.resolver.resolve_with_retry(principal, *force).await?;
                match format.as_str() {
                    "json" => format_context_json_output(&context),
                    "text" => Ok(format_context_text_output(&context)),
                    other => Err(unknown_format(other)),
                }
            }
            Commands::Gate {
                route,
                principal,
                bypass,
                format,
            } => {
                let action = self.gate_route(route, principal.as_deref(), *bypass).await;
                match format.as_str() {
                    "json" => format_decision_json(route, &action),
                    "text" => Ok(format_decision_text(route, &action)),
                    other => Err(unknown_format(other)),
                }
            }
            Commands::Can {
                principal,
                module,
                action,
            } => {
                let context = self.resolver.resolve_with_retry(principal, false).await?;
                let allowed = self.evaluator.has_permission(&context, module, action);
                Ok(format_check_result(
                    principal,
                    &format!("{}.{}", module, action),
                    allowed,
                ))
            }
            Commands::Sensitive {
                principal,
                category,
            } => {
                let context = self.resolver.resolve_with_retry(principal, false).await?;
                let allowed = self.evaluator.can_view_sensitive(&context, category);
                Ok(format_check_result(principal, category, allowed))
            }
            Commands::Delegate { command } => self.handle_delegate(command).await,
            Commands::Status { command } => self.handle_status(command).await,
        }
    }

    /// Decide a route through a session so resolution failures map to
    /// navigation the same way they do for a signed-in caller.
    async fn gate_route(&self, route: &str, principal: Option<&str>, bypass: bool) -> NavigationAction {
        let session = IdentitySession::new(Arc::clone(&self.resolver), self.gate.clone())
            .with_evaluator(self.evaluator.clone());
        let Some(principal) = principal else {
            return session.navigate(route, bypass);
        };
        match session.sign_in(principal, None, route).await {
            Ok(_) => session.navigate(route, bypass),
            Err(failure) => failure.action,
        }
    }

    async fn handle_delegate(&self, command: &DelegateCommands) -> Result<String, ApiError> {
        match command {
            DelegateCommands::SetActive { id, active } => {
                let record = self.resolver.set_delegate_active(id, *active).await?;
                Ok(format!(
                    "Delegate {} is now {}.",
                    record.id,
                    if record.active { "active" } else { "inactive" }
                ))
            }
            DelegateCommands::SetPermissions { id, permissions } => {
                let permissions = parse_permissions(permissions)?;
                let record = self.resolver.set_delegate_permissions(id, permissions).await?;
                Ok(format!("Permissions of delegate {} updated.", record.id))
            }
        }
    }

    async fn handle_status(&self, command: &StatusCommands) -> Result<String, ApiError> {
        let poller = self.poller.as_ref().ok_or_else(|| {
            StatusError::NotConfigured("set poller.endpoint to the status service URL".to_string())
        })?;
        match command {
            StatusCommands::Check {
                subject,
                force,
                format,
            } => {
                let status = poller.check(subject, *force).await?;
                match format.as_str() {
                    "json" => format_status_json(subject, &status, poller.config()),
                    "text" => Ok(format_status_text(subject, &status, poller.config())),
                    other => Err(unknown_format(other)),
                }
            }
            StatusCommands::Pair { subject } => {
                let artifact = poller.request_pairing(subject).await?;
                Ok(artifact)
            }
            StatusCommands::Disconnect { subject } => {
                poller.disconnect(subject).await?;
                Ok(format!("Session {} disconnected.", subject))
            }
        }
    }
}

/// `full` or a JSON module map such as `{"patients": {"view": true}}`.
fn parse_permissions(raw: &str) -> Result<PermissionSet, ApiError> {
    if raw.trim() == "full" {
        return Ok(PermissionSet::Full);
    }
    serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid permissions '{}': {}", raw, e)))
}

fn unknown_format(format: &str) -> ApiError {
    ApiError::InvalidInput(format!("Unknown format '{}' (expected text or json)", format))
}
