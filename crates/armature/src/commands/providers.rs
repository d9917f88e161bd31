use armature_cloud::{
    ProviderRegistrar, RegistrationState, ensure_registered, required_resource_providers,
};
use armature_cloud_arm::ArmClient;
use armature_config::ProviderConfig;
use colored::Colorize;

pub async fn handle(register: bool) -> anyhow::Result<()> {
    let config = ProviderConfig::load()?;
    let token = config.access_token.clone().ok_or_else(|| {
        anyhow::anyhow!("ARM_ACCESS_TOKEN is not set (try `az account get-access-token`)")
    })?;

    let mut client = ArmClient::new(token);
    if let Some(endpoint) = &config.endpoint {
        client = client.with_endpoint(endpoint);
    }
    let registrar = client.providers(config.subscription_id()?);
    let required = required_resource_providers();

    println!("{}", "Checking resource provider registration...".blue());
    let states = registrar.list_states().await?;
    for namespace in &required {
        let state = states
            .iter()
            .find(|s| s.namespace.eq_ignore_ascii_case(namespace))
            .map(|s| s.registration_state.clone())
            .unwrap_or(RegistrationState::NotRegistered);
        let label = match &state {
            RegistrationState::Registered => state.to_string().green(),
            RegistrationState::Registering => state.to_string().yellow(),
            _ => state.to_string().red(),
        };
        println!("  {:<28} {}", namespace, label);
    }

    if !register {
        return Ok(());
    }
    if config.skip_provider_registration {
        println!(
            "{}",
            "skip_provider_registration is set, not registering anything".yellow()
        );
        return Ok(());
    }

    let registered = ensure_registered(&registrar, &required).await?;
    if registered.is_empty() {
        println!("{}", "✓ All resource providers are registered".green().bold());
    } else {
        for namespace in registered {
            println!("{} {}", "✓ Registered".green(), namespace);
        }
    }

    Ok(())
}
