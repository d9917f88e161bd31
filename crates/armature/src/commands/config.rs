use armature_cloud_arm::DEFAULT_ENDPOINT;
use armature_config::ProviderConfig;
use colored::Colorize;

pub fn handle() -> anyhow::Result<()> {
    let config = ProviderConfig::load()?;

    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(environment only)".to_string());
    println!("Config: {}", source.cyan());
    println!();

    println!("  subscription_id:            {}", config.subscription_id()?);
    println!(
        "  endpoint:                   {}",
        config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    );
    println!(
        "  skip_provider_registration: {}",
        config.skip_provider_registration
    );

    let token = if config.access_token.is_some() {
        "set (redacted)".green()
    } else {
        "not set".yellow()
    };
    println!("  access token:               {}", token);

    let poll = config.poll_config();
    println!(
        "  poll interval:              {:?} .. {:?}",
        poll.initial_interval, poll.max_interval
    );

    let timeouts = config.timeouts();
    println!(
        "  timeouts:                   create {:?}, read {:?}, update {:?}, delete {:?}",
        timeouts.create, timeouts.read, timeouts.update, timeouts.delete
    );

    Ok(())
}
