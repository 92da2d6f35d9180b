//! Startup orchestration: lifecycle hooks, model compilation, connect, serve.

use crate::api::{ApiSurface, ApiSurfaceBuilder, EndpointOptions};
use crate::config::StartupConfig;
use crate::error::{BoxError, StartupError};
use crate::model::compile_models;
use crate::routes::app_routes;
use crate::state::AppState;
use crate::store::{ConnectOptions, Connection};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupPhase {
    /// Before anything else; the database is not connected yet.
    BeforeInit,
    /// After the listener is accepting requests.
    AfterInit,
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StartupPhase::BeforeInit => "before-init",
            StartupPhase::AfterInit => "after-init",
        })
    }
}

type HookFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;
type LifecycleHook = Box<dyn Fn() -> HookFuture + Send + Sync>;

/// Builds the GraphQL CRUD server for a set of model definitions.
///
/// Startup order: before-init hooks, compile every model, connect, ensure collections,
/// build the schema, bind, serve, after-init hooks. Any failure before the listener
/// binds aborts startup.
pub struct Dryer {
    config: StartupConfig,
    before_init: Vec<LifecycleHook>,
    after_init: Vec<LifecycleHook>,
    endpoint_options: HashMap<String, EndpointOptions>,
    default_options: EndpointOptions,
}

impl Dryer {
    pub fn init(config: StartupConfig) -> Self {
        Dryer {
            config,
            before_init: Vec::new(),
            after_init: Vec::new(),
            endpoint_options: HashMap::new(),
            default_options: EndpointOptions::default(),
        }
    }

    pub fn before_application_init<F, Fut>(self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hook(StartupPhase::BeforeInit, f)
    }

    pub fn after_application_init<F, Fut>(self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hook(StartupPhase::AfterInit, f)
    }

    /// Hooks of one phase run in registration order; the first failure stops startup.
    pub fn hook<F, Fut>(mut self, phase: StartupPhase, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let hook: LifecycleHook = Box::new(move || Box::pin(f()) as HookFuture);
        match phase {
            StartupPhase::BeforeInit => self.before_init.push(hook),
            StartupPhase::AfterInit => self.after_init.push(hook),
        }
        self
    }

    /// Options for one model's endpoints, by model name.
    pub fn endpoint_options(mut self, model: impl Into<String>, options: EndpointOptions) -> Self {
        self.endpoint_options.insert(model.into(), options);
        self
    }

    /// Options for every model without its own.
    pub fn default_endpoint_options(mut self, options: EndpointOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn config(&self) -> &StartupConfig {
        &self.config
    }

    /// Compile all models against `connection` and collect their endpoints. No I/O.
    pub fn compile(&self, connection: &Connection) -> Result<ApiSurface, StartupError> {
        let models = compile_models(&self.config.model_definitions, connection)?;
        let mut builder = ApiSurfaceBuilder::new(self.config.collision_policy);
        for model in &models {
            let options = self
                .endpoint_options
                .get(&model.name)
                .unwrap_or(&self.default_options);
            builder.add_model(model, options)?;
        }
        Ok(builder.finish())
    }

    pub async fn start(self) -> Result<ServerHandle, StartupError> {
        run_hooks(StartupPhase::BeforeInit, &self.before_init).await?;

        let connection = Connection::new();
        let surface = self.compile(&connection)?;
        tracing::info!(
            models = surface.models().len(),
            queries = surface.query_fields().count(),
            mutations = surface.mutation_fields().count(),
            "compiled models"
        );

        let options = ConnectOptions {
            timeout: self.config.connect_timeout,
            max_connections: self.config.max_connections,
        };
        connection.connect(&self.config.database_url, &options).await?;
        for model in surface.models() {
            model.collection.ensure().await?;
        }

        let schema = surface.into_schema()?;
        let app = app_routes(AppState { schema, connection }, self.config.body_limit);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr()?;
        tracing::info!("listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // A dropped handle leaves the server running.
                    if shutdown_rx.await.is_err() {
                        std::future::pending::<()>().await;
                    }
                })
                .await
        });
        let handle = ServerHandle {
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
        };

        if let Err(e) = run_hooks(StartupPhase::AfterInit, &self.after_init).await {
            if let Err(stop) = handle.shutdown().await {
                tracing::error!(error = %stop, "server shutdown after failed hook");
            }
            return Err(e);
        }
        Ok(handle)
    }
}

async fn run_hooks(phase: StartupPhase, hooks: &[LifecycleHook]) -> Result<(), StartupError> {
    for hook in hooks {
        hook()
            .await
            .map_err(|source| StartupError::Hook { phase, source })?;
    }
    tracing::info!(%phase, count = hooks.len(), "lifecycle hooks done");
    Ok(())
}

/// Running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<(), StartupError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Wait until the server stops.
    pub async fn wait(self) -> Result<(), StartupError> {
        let ServerHandle { shutdown, task, .. } = self;
        let result = task.await;
        drop(shutdown);
        match result {
            Ok(served) => served.map_err(StartupError::Server),
            Err(e) => Err(StartupError::Server(std::io::Error::new(
                std::io::ErrorKind::Other,
                e,
            ))),
        }
    }

    pub fn abort(self) {
        self.task.abort();
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}
