use anyhow::{bail, Context, Result};
use coze_token::{ApiProbe, Config, ConfigSummary, ModuleIdentity, TokenService};
use rust_common::init_tracing;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: coze-token-service <status | token <module> [session] | probe <module>>";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.tracing_config());

    let store = config
        .load_key_store(|name| std::env::var(name).ok())
        .context("failed to load key material")?;
    let service = TokenService::from_config(&config, Arc::new(store))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["status"] => status(&config, &service),
        ["token", module] => token(&service, module.parse()?, None).await,
        ["token", module, session] => token(&service, module.parse()?, Some(*session)).await,
        ["probe", module] => probe(&config, &service, module.parse()?).await,
        _ => bail!(USAGE),
    }
}

fn status(config: &Config, service: &TokenService) -> Result<()> {
    let summary = ConfigSummary::new(config, service.store());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let report = service.all_module_status();
    println!("{}", serde_json::to_string_pretty(&report)?);

    let invalid = report.iter().filter(|s| !s.valid).count();
    if invalid > 0 {
        bail!("{invalid} module(s) are not usable");
    }
    Ok(())
}

async fn token(service: &TokenService, module: ModuleIdentity, session: Option<&str>) -> Result<()> {
    let grant = service.get_grant(module, session).await?;
    println!(
        "{} ({}): {} expires_in={:?} source={:?}",
        module,
        module.display_name(),
        coze_token::mask_secret(&grant.access_token),
        grant.expires_in,
        grant.source
    );
    Ok(())
}

async fn probe(config: &Config, service: &TokenService, module: ModuleIdentity) -> Result<()> {
    let bot_id = service
        .store()
        .widget_app_id(module)
        .with_context(|| format!("no widget app id configured for module {module}"))?
        .to_string();

    let access_token = service.get_token(module, None).await?;
    let probe = ApiProbe::new(&config.api_base_url, &config.http_config())?;
    let info = probe.bot_online_info(&access_token, &bot_id).await?;

    info!(%module, code = info.code, "Probe completed");
    println!("{}", serde_json::to_string_pretty(&info.data)?);
    Ok(())
}
