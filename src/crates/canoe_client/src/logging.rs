use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence when set. Returns `false` if another subscriber
/// was already installed, which is left untouched.
pub fn init(level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        let _ = init(Level::DEBUG);
        assert!(!init(Level::INFO));
    }
}
