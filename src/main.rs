use clap::Parser;
use mobile_agent::cli::commands::{cmd_repl, cmd_run};
use mobile_agent::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // Resolve Ollama settings: CLI > config > defaults
    let ollama_endpoint = cli
        .ollama_endpoint
        .as_deref()
        .or(config.ollama.endpoint.as_deref());
    let ollama_model = cli
        .ollama_model
        .as_deref()
        .or(config.ollama.model.as_deref());

    match &cli.command {
        Commands::Run {
            prompt,
            platform,
            device,
            debug,
        } => {
            cmd_run(
                prompt,
                platform,
                device.as_deref(),
                *debug,
                cli.verbose,
                &config,
                ollama_endpoint,
                ollama_model,
            )?;
        }
        Commands::Repl { platform, device } => {
            cmd_repl(
                platform,
                device.as_deref(),
                &config,
                ollama_endpoint,
                ollama_model,
            )?;
        }
    }

    Ok(())
}
