// pgbackup/src/utils/password.rs
use std::io;

use crate::config::{EnvSource, PASSWORD_ENV, Password};
use crate::errors::{BackupError, Result};

/// Decides where the database password comes from, asking for it at most once.
///
/// A `PGPASSWORD` that is already set, whatever its encoding, is left for the
/// dump tool to inherit and the prompt is not shown.
pub fn resolve_password<E, P>(env: &E, prompt: P) -> Result<Password>
where
    E: EnvSource + ?Sized,
    P: FnOnce() -> io::Result<String>,
{
    if env.is_set(PASSWORD_ENV) {
        log::debug!(target: "pgbackup::credentials", "Using password from {PASSWORD_ENV}");
        return Ok(Password::Inherited);
    }

    log::debug!(target: "pgbackup::credentials", "{PASSWORD_ENV} not set, prompting");
    prompt().map(Password::Entered).map_err(BackupError::Prompt)
}

/// Reads a password from the terminal without echo.
pub fn prompt_tty() -> io::Result<String> {
    rpassword::prompt_password("password: ")
}
