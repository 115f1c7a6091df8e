use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "condor",
    about = "Generate Deployment Manager manifests for HTCondor clusters",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the cluster manifest.
    ///
    /// Parameters are read from the context file, then overridden by any
    /// flags given. Every field must be set by one or the other.
    Render {
        /// Context file (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        context: Option<String>,
        #[arg(long)]
        zone: Option<String>,
        /// Number of compute nodes
        #[arg(long)]
        count: Option<u32>,
        /// Administrator email written into the condor config
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        instance_type: Option<String>,
        #[arg(long)]
        project: Option<String>,
        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        /// Name the output `condor-submit-host-ip,` as older deployments did
        #[arg(long)]
        legacy_output_name: bool,
    },
    /// Write a starter context file
    Init {
        #[arg(short, long, default_value = "condor.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("condor=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            context,
            zone,
            count,
            email,
            instance_type,
            project,
            output,
            legacy_output_name,
        } => {
            let overrides = commands::render::Overrides {
                zone,
                count,
                email,
                instance_type,
                project,
            };
            commands::render::render(
                context.as_deref(),
                overrides,
                output.as_deref(),
                legacy_output_name,
            )
        }
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
