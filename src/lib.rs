//! SHELF Application Library
//!
//! Book catalog and review service: users register, log in, browse and
//! search the catalog, and submit star-rating reviews. Modules are wired
//! here and served through the SHELF kernel and HTTP crates.

pub mod modules;
pub mod utils;

pub use modules::build_registry;

use shelf_kernel::settings::Settings;
use shelf_kernel::InitCtx;

/// Boot the application: run the module lifecycle and serve HTTP until
/// shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    shelf_http::start_server(&registry, &settings).await?;

    registry.stop_all().await?;
    Ok(())
}
