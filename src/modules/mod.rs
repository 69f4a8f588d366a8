pub mod publishing;

use hotelpress_kernel::{ModuleRegistry, Settings};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    registry.register(publishing::create_module(settings)?);
    Ok(())
}
