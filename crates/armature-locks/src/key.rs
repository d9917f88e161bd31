//! Lock key conventions

/// Build the lock key for a named remote object of the given resource type.
///
/// Keys have the form `<resource-type>:<resource-name>`. ARM resource names
/// are case-insensitive, so the name is lower-cased; `VNet-A` and `vnet-a`
/// address the same remote object and must serialize.
pub fn lock_key(resource_type: &str, name: &str) -> String {
    format!("{}:{}", resource_type, name.to_lowercase())
}
