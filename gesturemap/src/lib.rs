use std::sync::Arc;

use log::warn;

pub use gesturemap_core::*;
pub use gesturemap_types::*;

/**
 * Builds a router from a profile document
 *
 * Every profile gets a registry over the same `targets`, continuous mappings ask `move_handler_factory` for their
 * output by profile and mapping name. The default profile is selected before returning.
 */
pub fn load_router<M>(
    file_name: &str,
    text: &str,
    targets: Vec<Arc<dyn Target>>,
    move_handler_factory: M,
) -> Result<Router, ConfigError>
where
    M: FnMut(&str, &str) -> Option<axis::MoveHandler>,
{
    let config = ProfileConfig::parse(file_name, text)?;
    let bindings = build_binding_set(
        &config,
        |_| CapabilityRegistry::new(targets.clone()),
        move_handler_factory,
    )?;

    let mut router = Router::new(bindings);
    if let Err(err) = router.select_default() {
        warn!("No profile selected: {err}");
    }
    Ok(router)
}

/// [`load_router`] over the built-in profiles
pub fn load_default_router<M>(
    targets: Vec<Arc<dyn Target>>,
    move_handler_factory: M,
) -> Result<Router, ConfigError>
where
    M: FnMut(&str, &str) -> Option<axis::MoveHandler>,
{
    load_router("profiles.kdl", DEFAULT_PROFILES, targets, move_handler_factory)
}

/// Applies every stored button map and selects the stored profile, if it still exists
pub fn restore_from_store(router: &mut Router, store: &MappingStore) -> Result<(), RouterError> {
    for binding in router.bindings_mut().iter_mut() {
        store.apply(binding);
    }

    match store.selected_profile() {
        Some(name) => router.select_binding(name),
        None => Ok(()),
    }
}

/// Captures every button map and the active profile
pub fn save_to_store(router: &Router, store: &mut MappingStore) {
    for binding in router.bindings().iter() {
        store.capture(binding);
    }
    store.set_selected_profile(
        router
            .active_binding()
            .map(|binding| binding.name().to_owned()),
    );
}
