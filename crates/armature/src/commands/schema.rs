use armature_cloud_arm::{ArmClient, NetworkContext, network_provider};
use std::sync::Arc;

pub fn handle(resource_type: Option<&str>) -> anyhow::Result<()> {
    // Schemas are static; the client is never called.
    let ctx = NetworkContext::new("", Arc::new(ArmClient::new(String::new())));
    let provider = network_provider(ctx);

    let json = match resource_type {
        Some(resource_type) => {
            let resource = provider.resource(resource_type)?;
            serde_json::to_string_pretty(&resource.schema())?
        }
        None => serde_json::to_string_pretty(&provider.schemas())?,
    };
    println!("{}", json);

    Ok(())
}
