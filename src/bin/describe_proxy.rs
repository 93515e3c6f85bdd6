use image_describer::{config, proxy, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let settings = config::get_configuration()?;
    telemetry::init_tracing(settings.log_level);

    proxy::serve(settings.proxy, config::provider_api_key()).await
}
