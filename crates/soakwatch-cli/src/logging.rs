//! env_logger setup: `info` by default, `RUST_LOG` overrides.

use std::fs::File;
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Log to stderr.
pub fn init_stderr() {
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}

/// Log to `path` so records do not tear up the dashboard.
/// Falls back to stderr if the file cannot be created.
pub fn init_file(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match File::create(path) {
        Ok(file) => {
            let _ = Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .try_init();
        }
        Err(e) => {
            init_stderr();
            log::warn!("cannot open log file {}: {e}", path.display());
        }
    }
}
