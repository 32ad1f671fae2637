use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

/// Owns the worker thread; the last `Database` clone to go away stops it.
struct Worker {
    sender: mpsc::Sender<DbCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.sender.send(DbCommand::Shutdown).is_err() {
            error!("Capture log thread already gone at shutdown");
        }
        if let Err(join_err) = handle.join() {
            error!("Capture log thread panicked: {join_err:?}");
        }
    }
}

/// Handle to the capture log.
///
/// All statements run on one dedicated thread that owns the SQLite
/// connection, so inserts from concurrent callers are serialized without any
/// extra locking on the caller side.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Opens (or creates) the log at `db_path` and brings its schema up to
    /// date before returning.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (sender, commands) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_path = db_path.clone();
        let handle = thread::Builder::new()
            .name("cardscan-db".into())
            .spawn(move || {
                let conn = match open_capture_log(&thread_path) {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                serve(conn, commands);
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Capture log opened at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                sender,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Runs `task` on the worker thread and waits for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.worker
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}

fn open_capture_log(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(mut conn: Connection, commands: mpsc::Receiver<DbCommand>) {
    for command in commands {
        match command {
            DbCommand::Execute(task) => task(&mut conn),
            DbCommand::Shutdown => break,
        }
    }
    info!("Capture log thread shutting down");
}
