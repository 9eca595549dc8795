use crate::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Where log output goes. The TUI owns the terminal, so it logs to a file.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    pub fn default_file() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::File(dir.join("econews").join("econews.log")))
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logging(target: LogTarget) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let writer = match &target {
        LogTarget::Stderr => None,
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        }
    };

    INIT.call_once(|| match writer {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init();
        }
    });

    Ok(())
}
