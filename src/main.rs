#![deny(unused)]
//! Workbox - run a shell command inside a throwaway sandbox.
//!
//! Uses a Docker container when the daemon is reachable, otherwise a private
//! host directory. Configuration comes from `config/` files and `WORKBOX__*`
//! environment variables.

use futures::FutureExt;

use workbox_core::AppConfig;
use workbox_sandbox::Sandbox;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    workbox_core::configure_tracing(config.logging.json)?;

    tracing::info!("Starting Workbox v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = if args.is_empty() {
        "uname -a".to_string()
    } else {
        args.join(" ")
    };

    let mut sandbox = Sandbox::new(config.sandbox.clone(), config.volume_bindings()).await?;
    tracing::info!(
        backend = %sandbox.kind(),
        image = %sandbox.config().image,
        work_dir = %sandbox.config().work_dir,
        command = %command,
        "Running command in sandbox"
    );

    let result = sandbox
        .scoped(|sb| {
            let command = command.clone();
            async move { sb.exec(&command, None).await }.boxed()
        })
        .await?;

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);

    if !result.success() {
        tracing::warn!(exit_code = result.exit_code, "Command exited with failure");
        std::process::exit(i32::try_from(result.exit_code).unwrap_or(1));
    }
    Ok(())
}
