use once_cell::sync::OnceCell;

use crate::config::EngineConfig;
use crate::engine::Engine;

static GLOBAL: OnceCell<Engine> = OnceCell::new();

/// The process-wide engine, built on first use.
///
/// Reads `TYPECONV_CONFIG` if set. Concurrent first callers block until a
/// single build finishes and all see the same engine.
pub fn global() -> &'static Engine {
    GLOBAL.get_or_init(default_engine)
}

/// Replace the engine `global()` would build. Fails, handing the engine
/// back, once the global engine exists.
pub fn install(engine: Engine) -> Result<(), Engine> {
    GLOBAL.set(engine)
}

fn default_engine() -> Engine {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "using default engine configuration");
            EngineConfig::default()
        }
    };
    let builder = Engine::builder().config(config);
    #[cfg(feature = "builtins")]
    let builder = builder.with_builtins();
    builder.build()
}
