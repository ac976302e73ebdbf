//! Data-plane transfer adapter.
//!
//! The object store is an external collaborator that only reports whether a
//! transfer worked. [`DataPlane`] turns those booleans into [`TransferError`]
//! straight away so nothing downstream inspects raw flags.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{debug, warn};

use crate::process::{CommandRunner, ProcessCommandRunner};

/// Future returned by object-store operations.
pub type TransferFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Upload, download, and delete against the object store.
pub trait ObjectStore: Send + Sync {
    /// Streams the volume data served on the data-plane listener into
    /// `remote_name`. Returns `false` on any failure.
    fn upload<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a>;

    /// Streams `remote_name` back out through the data-plane listener.
    fn download<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a>;

    /// Removes `remote_name`. Deleting an absent object succeeds.
    fn delete<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a>;
}

/// Errors raised by data-plane transfers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransferError {
    /// Raised when an upload fails.
    #[error("upload of {object} failed")]
    Upload {
        /// Remote object name.
        object: String,
    },
    /// Raised when a download fails.
    #[error("download of {object} failed")]
    Download {
        /// Remote object name.
        object: String,
    },
    /// Raised when a delete fails.
    #[error("delete of {object} failed")]
    Delete {
        /// Remote object name.
        object: String,
    },
}

/// Typed wrapper around an [`ObjectStore`].
#[derive(Clone, Debug)]
pub struct DataPlane<S> {
    store: S,
}

impl<S: ObjectStore> DataPlane<S> {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Uploads `object`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Upload`] when the store reports failure.
    pub async fn upload(&self, object: &str) -> Result<(), TransferError> {
        if self.store.upload(object).await {
            return Ok(());
        }
        Err(TransferError::Upload {
            object: object.to_owned(),
        })
    }

    /// Downloads `object`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Download`] when the store reports failure.
    pub async fn download(&self, object: &str) -> Result<(), TransferError> {
        if self.store.download(object).await {
            return Ok(());
        }
        Err(TransferError::Download {
            object: object.to_owned(),
        })
    }

    /// Deletes `object`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Delete`] when the store reports failure.
    pub async fn delete(&self, object: &str) -> Result<(), TransferError> {
        if self.store.delete(object).await {
            return Ok(());
        }
        Err(TransferError::Delete {
            object: object.to_owned(),
        })
    }
}

/// Object store driven by an external data-mover program.
///
/// Invocations take the form `<bin> upload <object> --listen <addr>`,
/// `<bin> download <object> --listen <addr>`, and `<bin> delete <object>`.
/// A zero exit status means success. Dropping a pending transfer stops the
/// mover through the runner.
#[derive(Debug)]
pub struct CommandObjectStore<R> {
    runner: R,
    transfer_bin: String,
    listen_addr: String,
}

impl CommandObjectStore<ProcessCommandRunner> {
    /// Creates a store wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(
        transfer_bin: impl Into<String>,
        listen_addr: impl Into<String>,
    ) -> Self {
        Self::new(ProcessCommandRunner, transfer_bin, listen_addr)
    }
}

impl<R> CommandObjectStore<R>
where
    R: CommandRunner,
{
    /// Creates a store running `transfer_bin` through `runner`.
    #[must_use]
    pub fn new(runner: R, transfer_bin: impl Into<String>, listen_addr: impl Into<String>) -> Self {
        Self {
            runner,
            transfer_bin: transfer_bin.into(),
            listen_addr: listen_addr.into(),
        }
    }

    fn args(&self, action: &str, object: &str, streams: bool) -> Vec<OsString> {
        let mut args = vec![OsString::from(action), OsString::from(object)];
        if streams {
            args.push(OsString::from("--listen"));
            args.push(OsString::from(&self.listen_addr));
        }
        args
    }

    async fn invoke(&self, action: &'static str, object: &str, streams: bool) -> bool {
        let args = self.args(action, object, streams);
        debug!(program = %self.transfer_bin, action, object, "running data mover");

        match self.runner.run(&self.transfer_bin, &args).await {
            Ok(output) if output.is_success() => true,
            Ok(output) => {
                warn!(
                    action,
                    object,
                    code = ?output.code,
                    stderr = %output.stderr.trim(),
                    "data mover reported failure"
                );
                false
            }
            Err(err) => {
                warn!(action, object, error = %err, "data mover could not start");
                false
            }
        }
    }
}

impl<R> ObjectStore for CommandObjectStore<R>
where
    R: CommandRunner,
{
    fn upload<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(self.invoke("upload", remote_name, true))
    }

    fn download<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(self.invoke("download", remote_name, true))
    }

    fn delete<'a>(&'a self, remote_name: &'a str) -> TransferFuture<'a> {
        Box::pin(self.invoke("delete", remote_name, false))
    }
}
