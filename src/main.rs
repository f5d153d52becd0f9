pub mod classify;
pub mod colormap;
pub mod config;
pub mod data;
pub mod error;
pub mod html;
pub mod map;
pub mod render;
pub mod selector;
pub mod server;
pub mod session;
pub mod style;
pub mod types;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::{Parser, Subcommand};
use selector::{VisualizationRequest, VizMode};
use session::Session;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the upload and visualization web app
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the summary and column schema of a GeoJSON file
    Inspect {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Render one layer of a GeoJSON file to HTML and/or PNG
    Render {
        #[arg(value_name = "FILE")]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = VizMode::Geometry)]
        mode: VizMode,
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        scheme: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        classes: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,
        #[arg(long)]
        cmap: Option<String>,
        /// Show only these categories (repeatable)
        #[arg(long = "category", value_name = "VALUE")]
        categories: Vec<String>,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        layer_name: Option<String>,
        /// Write the map page here; without --html or --png it goes to the configured map directory
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "geoviz=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_or_default(&config)?;
            server::start_server(app_config).await?;
        }
        Commands::Inspect { input } => {
            let dataset = data::load_geojson_file("gdf_0", &input)?;
            println!("{}", serde_json::to_string_pretty(&dataset.summary())?);
        }
        Commands::Render {
            input,
            mode,
            column,
            scheme,
            classes,
            min,
            max,
            cmap,
            categories,
            caption,
            layer_name,
            html,
            png,
            config,
        } => {
            let app_config = config::AppConfig::load_or_default(&config)?;
            let mut session = Session::new(&app_config);

            let filename = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let bytes = fs::read(&input).with_context(|| format!("Failed to read {:?}", input))?;
            session.load_dataset(&filename, &bytes)?;

            let request = VisualizationRequest {
                mode,
                column,
                scheme,
                classes,
                min,
                max,
                colormap: cmap,
                categories: (!categories.is_empty()).then_some(categories),
                legend_caption: caption,
            };
            let record = session.visualize(None, layer_name.as_deref(), request)?;

            if let Some(path) = &html {
                fs::write(path, session.map_html()).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote {}", path.display());
            }
            if let Some(path) = &png {
                let bytes = session.layer_png(&record.name)?;
                fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote {}", path.display());
            }
            if html.is_none() && png.is_none() {
                let path = session.export_html()?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}
