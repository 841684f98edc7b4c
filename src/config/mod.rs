// pgbackup/src/config/mod.rs
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use url::Url;

use crate::errors::{BackupError, Result};

/// Environment variable read by the dump tool for authentication.
pub const PASSWORD_ENV: &str = "PGPASSWORD";
pub const B2_KEY_ID_ENV: &str = "B2_KEY_ID";
pub const B2_APPLICATION_KEY_ENV: &str = "B2_APPLICATION_KEY";

const DEFAULT_B2_REGION: &str = "us-west-004";

/// Make postgres backups to cloud locations.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The hostname of the postgres server.
    #[arg(short = 'H', long, default_value = "localhost")]
    pub hostname: String,

    /// The port of the postgres server.
    #[arg(short, long, default_value_t = 5432)]
    pub port: u16,

    /// The postgres user.
    #[arg(short = 'U', long)]
    pub user: String,

    /// The postgres database to back up.
    #[arg(short, long)]
    pub database: String,

    /// The b2 bucket to upload to. Also accepted as `-b2`.
    #[arg(long)]
    pub b2_bucket: Option<String>,

    /// Key prefix inside the b2 bucket.
    #[arg(long, default_value = "")]
    pub b2_prefix: String,

    /// S3-compatible endpoint of the bucket's region.
    #[arg(long, env = "B2_ENDPOINT")]
    pub b2_endpoint: Option<String>,

    /// Region of the b2 account.
    #[arg(long, env = "B2_REGION", default_value = DEFAULT_B2_REGION)]
    pub b2_region: String,

    /// Path of the pg_dump executable. Looked up on PATH when omitted.
    #[arg(long, env = "PG_DUMP")]
    pub pg_dump: Option<PathBuf>,

    /// Parent directory for the temporary dump directory.
    #[arg(long, env = "TEMP_DUMP_ROOT")]
    pub temp_dump_root: Option<PathBuf>,

    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,
}

impl Cli {
    /// Parses the process arguments, accepting the legacy `-b2` flag.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_legacy_flags(std::env::args_os()))
    }

    pub fn connection_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            hostname: self.hostname.clone(),
            port: self.port,
            user: self.user.clone(),
            database: self.database.clone(),
        }
    }

    pub fn upload_target(&self) -> Option<UploadTarget> {
        self.b2_bucket.as_ref().map(|bucket| UploadTarget {
            bucket: bucket.clone(),
            prefix: self.b2_prefix.clone(),
        })
    }
}

/// Rewrites `-b2 <bucket>` and `-b2=<bucket>` into `--b2-bucket`, since clap
/// only knows single-character short flags.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-b2") => OsString::from("--b2-bucket"),
            Some(s) if s.starts_with("-b2=") => OsString::from(format!("--b2-bucket={}", &s[4..])),
            _ => arg,
        })
        .collect()
}

/// Read access to environment variables.
pub trait EnvSource {
    /// The raw value, which need not be valid unicode.
    fn var_os(&self, key: &str) -> Option<OsString>;

    fn is_set(&self, key: &str) -> bool {
        self.var_os(key).is_some()
    }

    /// The value as unicode. A value that is set but not unicode is an
    /// error, not an absent variable.
    fn var(&self, key: &str) -> Result<Option<String>> {
        self.var_os(key)
            .map(|value| {
                value.into_string().map_err(|_| {
                    BackupError::Config(format!("environment variable {key} is not valid unicode"))
                })
            })
            .transpose()
    }
}

/// The environment of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

impl EnvSource for HashMap<String, String> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).map(OsString::from)
    }
}

impl EnvSource for HashMap<String, OsString> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

/// Where to connect, before the password is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub database: String,
}

impl ConnectionTarget {
    pub fn with_password(self, password: Password) -> ConnectionParams {
        ConnectionParams {
            hostname: self.hostname,
            port: self.port,
            user: self.user,
            password,
            database: self.database,
        }
    }
}

/// Where the dump tool's password comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Password {
    /// `PGPASSWORD` is already exported; the dump tool inherits it untouched.
    Inherited,
    /// Typed at the prompt; handed to the dump tool as its `PGPASSWORD`.
    Entered(String),
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Password::Inherited => f.write_str("Inherited"),
            Password::Entered(_) => f.write_str("Entered(<redacted>)"),
        }
    }
}

/// Everything the dump tool needs to reach the database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub password: Password,
    pub database: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password)
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub prefix: String,
}

/// Endpoint settings for the S3-compatible b2 API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B2Settings {
    pub endpoint_url: String,
    pub region: String,
}

impl B2Settings {
    pub fn new(endpoint: Option<&str>, region: &str) -> Result<Self> {
        let region = region.trim();
        if region.is_empty() {
            return Err(BackupError::Config("b2 region cannot be empty".to_string()));
        }

        let endpoint_url = match endpoint.map(str::trim).filter(|e| !e.is_empty()) {
            Some(endpoint) => endpoint.to_string(),
            None => format!("https://s3.{region}.backblazeb2.com"),
        };
        let parsed = Url::parse(&endpoint_url)
            .map_err(|e| BackupError::Config(format!("Invalid b2 endpoint {endpoint_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackupError::Config(format!(
                "b2 endpoint must be http(s): {endpoint_url}"
            )));
        }

        Ok(Self {
            endpoint_url,
            region: region.to_string(),
        })
    }
}
