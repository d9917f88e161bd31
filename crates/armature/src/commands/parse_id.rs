use armature_cloud::ResourceId;
use colored::Colorize;

pub fn handle(id: &str) -> anyhow::Result<()> {
    let id = ResourceId::parse(id)?;

    println!("{}", "✓ Valid resource ID".green().bold());
    println!("  subscription:   {}", id.subscription_id().cyan());
    if let Some(resource_group) = id.resource_group() {
        println!("  resource group: {}", resource_group.cyan());
    }
    if let Some(provider) = id.provider() {
        println!("  provider:       {}", provider.cyan());
    }
    for (resource_type, name) in id.segments() {
        println!("  {}: {}", resource_type, name.cyan());
    }

    Ok(())
}
