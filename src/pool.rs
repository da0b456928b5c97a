use anyhow::anyhow;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::db;

/// Bounded set of SQLite connections shared by every request.
///
/// A semaphore caps how many connections are checked out at once; idle
/// connections are kept for reuse. Work runs on the blocking thread pool so
/// request tasks never block the runtime on SQLite I/O.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    busy_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl PoolInner {
    fn checkout(&self) -> anyhow::Result<Connection> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(conn) => Ok(conn),
            None => {
                debug!(path = %self.path.display(), "opening store connection");
                db::open_db(&self.path, self.busy_timeout)
            }
        }
    }

    fn checkin(&self, conn: Connection) {
        if self.permits.is_closed() {
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

impl Pool {
    /// Opens the store, applies the schema and seeds the fee schedule.
    pub async fn open(cfg: &StoreConfig) -> anyhow::Result<Self> {
        let path = cfg.path.clone();
        let busy_timeout = cfg.busy_timeout;
        let seed = cfg.seed_classes.clone();
        let conn = tokio::task::spawn_blocking(move || -> anyhow::Result<Connection> {
            let conn = db::open_db(&path, busy_timeout)?;
            db::apply_schema(&conn)?;
            let seeded = db::seed_classes(&conn, &seed)?;
            if seeded > 0 {
                info!(classes = seeded, "seeded fee schedule");
            }
            Ok(conn)
        })
        .await
        .map_err(|e| anyhow!("store open task failed: {e}"))??;

        let max = cfg.max_connections.max(1);
        info!(path = %cfg.path.display(), max_connections = max, "store pool ready");
        Ok(Self {
            inner: Arc::new(PoolInner {
                path: cfg.path.clone(),
                busy_timeout,
                idle: Mutex::new(vec![conn]),
                permits: Arc::new(Semaphore::new(max)),
            }),
        })
    }

    /// Runs `f` against a pooled connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| anyhow!("store pool is closed"))?;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut conn = inner.checkout()?;
            let out = f(&mut conn);
            inner.checkin(conn);
            out
        })
        .await
        .map_err(|e| anyhow!("store task failed: {e}"))?
    }

    /// Stops handing out connections and drops the idle ones.
    pub fn close(&self) {
        self.inner.permits.close();
        let dropped = {
            let mut idle = self
                .inner
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let n = idle.len();
            idle.clear();
            n
        };
        info!(closed_connections = dropped, "store pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }
}
