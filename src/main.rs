/// Entry point of the CPU Warden.
///
/// Logging defaults to `info` and can be tuned with `RUST_LOG`. All other settings are read
/// from the environment, see [`cpu_warden::config::Config`].
///
/// # Examples
///
/// ```bash
/// CADVISOR_ADDR=http://localhost:8080 LISTEN_ADDR=0.0.0.0:8088 cpu-warden
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    cpu_warden::run().await
}
