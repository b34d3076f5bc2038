use super::spawn_sweeper;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Composition root. Every repository and service handle is built here once
/// and shared by reference afterwards.
pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub user_service: Arc<dyn UserService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let op_timeout = Duration::from_secs(settings.store.op_timeout_secs);

        let (session_store, user_repo, pool) = match settings.store.backend.as_str() {
            "memory" => {
                warn!("using in-memory session store; sessions are lost on restart");
                let session_store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
                let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                (session_store, user_repo, None)
            }
            "mysql" => {
                let options = MySqlConnectOptions::from_str(&settings.store.database_url)?
                    .database(&settings.store.database_name);
                let pool = MySqlPoolOptions::new()
                    .max_connections(settings.store.max_connections)
                    .acquire_timeout(op_timeout)
                    .connect_with(options)
                    .await?;
                if settings.store.auto_migrate {
                    ensure_schema(&pool).await?;
                }
                let session_store: Arc<dyn SessionStore> =
                    Arc::new(MySqlSessionStore::new(pool.clone(), op_timeout));
                let user_repo: Arc<dyn UserRepo> =
                    Arc::new(MySqlUserRepo::new(pool.clone(), op_timeout));
                (session_store, user_repo, Some(pool))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs512Codec::new(TokenConfig {
            signing_key: settings.token.signing_key.clone().into_bytes(),
        })?);
        let refresh_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2CredentialHasher::new(settings.hasher.refresh)?);
        let password_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2CredentialHasher::new(settings.hasher.password)?);

        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            user_repo.clone(),
            session_store,
            refresh_hasher,
            token_codec,
        ));
        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, password_hasher));

        let cancel = CancellationToken::new();
        let sweeper_handle = if settings.sweeper.enabled {
            Some(spawn_sweeper(
                session_service.clone(),
                Duration::from_secs(settings.sweeper.interval_secs),
                cancel.clone(),
            ))
        } else {
            None
        };

        info!(backend = %settings.store.backend, "server started");

        Ok(Self {
            session_service,
            user_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.sweeper_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("sweeper handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
