use std::path::PathBuf;
use structopt::StructOpt;

use crate::auth::AdminCredentials;
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{StoreError, Stores};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "md2txt",
    about = "A small web server that converts Markdown to plain text and keeps a history"
)]
pub struct Args {
    /// The host to serve the converter on
    #[structopt(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The port to serve the converter on
    #[structopt(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// The SQLite file the conversion history is kept in
    #[structopt(short, long, env = "MD2TXT_DATABASE", default_value = "md2txt.sqlite3")]
    pub database: PathBuf,

    /// Keep the history in memory only, it is lost on shutdown
    #[structopt(long)]
    pub in_memory: bool,

    /// The username for the admin pages
    #[structopt(long, env = "MD2TXT_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    /// The password for the admin pages, they stay locked without one
    #[structopt(long, env = "MD2TXT_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Args {
    /// Opens the store the arguments ask for.
    pub fn open_store(&self) -> Result<Stores, StoreError> {
        if self.in_memory {
            Ok(Stores::Memory(MemoryStore::new()))
        } else {
            SqliteStore::open(&self.database).map(Stores::Sqlite)
        }
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials::new(self.admin_user.clone(), self.admin_password.clone())
    }

    /// The address to listen on.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_flags() {
        let args = Args::from_iter(&[
            "md2txt",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--in-memory",
            "--admin-user",
            "ops",
            "--admin-password",
            "secret",
        ]);

        assert_eq!(args.addr(), "0.0.0.0:9000");
        assert!(args.in_memory);
        assert!(args.admin_credentials().is_enabled());
        match args.open_store() {
            Ok(Stores::Memory(_)) => {}
            _ => panic!("expected an in-memory store"),
        }
    }
}
