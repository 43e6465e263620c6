//! Startup orchestration.
//!
//! # Responsibilities
//! - Build and publish the first route table
//! - Initialize the backend proxy and the refresher
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: a first table that cannot be loaded is fatal
//! - Listeners are bound only after the first table is live
//! - Later refresh failures never take the router down

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::RouterConfig;
use crate::http::server::serve;
use crate::http::{BackendProxy, Dispatcher, HttpServer, ProxyBuildError};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::reload::{ReloadHandle, Refresher};
use crate::routing::{load_table, TableHandle};
use crate::store::{RouteStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("initial route table could not be loaded: {0}")]
    InitialLoad(#[from] StoreError),

    #[error(transparent)]
    Proxy(#[from] ProxyBuildError),

    #[error("failed to bind {listener} listener on {address}: {source}")]
    Bind {
        listener: &'static str,
        address: String,
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// A router with its first table published and its listeners bound.
pub struct RouterApp {
    public: TcpListener,
    admin: TcpListener,
    server: HttpServer,
    admin_state: AdminState,
    refresher: Refresher,
    shutdown: Shutdown,
}

impl RouterApp {
    pub async fn start(config: RouterConfig, store: Arc<dyn RouteStore>) -> Result<Self, StartupError> {
        let proxy = BackendProxy::new(&config.backend)?;

        let (table, report) = load_table(store.as_ref()).await?;
        tracing::info!(
            routes = report.routes,
            backends = report.backends,
            skipped = report.skipped.len(),
            "Initial route table built"
        );
        metrics::set_table_size(table.route_count(), table.backend_count());
        let table = TableHandle::new(table);

        let (refresher, reload) = Refresher::new(store, table.clone(), config.store.poll_interval);

        let server = HttpServer::new(Dispatcher::new(table.clone(), proxy), &config.listener);
        let admin_state = AdminState {
            table,
            reload,
            reload_wait: config.admin.reload_wait,
            api_key: config.admin.api_key.as_deref().map(Arc::from),
        };

        let public = bind("public", &config.listener.public_address).await?;
        let admin = bind("admin", &config.listener.admin_address).await?;

        Ok(Self {
            public,
            admin,
            server,
            admin_state,
            refresher,
            shutdown: Shutdown::new(),
        })
    }

    pub fn public_addr(&self) -> io::Result<SocketAddr> {
        self.public.local_addr()
    }

    pub fn admin_addr(&self) -> io::Result<SocketAddr> {
        self.admin.local_addr()
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn reload_handle(&self) -> ReloadHandle {
        self.admin_state.reload.clone()
    }

    pub fn table(&self) -> TableHandle {
        self.admin_state.table.clone()
    }

    /// Serve both listeners until shutdown.
    pub async fn serve(self) -> Result<(), StartupError> {
        let refresher = tokio::spawn(self.refresher.run(self.shutdown.subscribe()));

        let admin_router = setup_admin_router(self.admin_state);
        let result = tokio::try_join!(
            self.server.run(self.public, self.shutdown.subscribe()),
            serve("admin", self.admin, admin_router, self.shutdown.subscribe()),
        );

        // Make sure the refresher stops even if a listener failed.
        self.shutdown.trigger();
        if let Err(e) = refresher.await {
            tracing::error!(error = %e, "Route refresher task failed");
        }

        result?;
        tracing::info!("Router stopped");
        Ok(())
    }
}

async fn bind(listener: &'static str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            listener,
            address: address.to_string(),
            source,
        })
}
