use image_describer::{config, telemetry, ui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let settings = config::get_configuration()?;
    telemetry::init_tracing(settings.log_level);

    ui::server::serve(settings.app).await
}
