use anyhow::{Context, Result};
use blog_core::{CloudflareClient, CloudflareConfig, SiteSettings, WorkerScript};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "publish-blog")]
#[command(about = "Render the post collection as a Cloudflare worker and deploy it")]
struct Args {
    /// Worker name (overrides CLOUDFLARE_WORKER_NAME)
    #[arg(short, long)]
    worker_name: Option<String>,

    /// Write the worker script to this file instead of deploying
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Post collection file (defaults to the local data directory)
    #[arg(long)]
    posts_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    blog_core::logging::init();
    let args = Args::parse();

    let posts_path = match args.posts_file {
        Some(path) => path,
        None => blog_core::default_posts_path()?,
    };

    println!("📖 Reading posts: {}", posts_path.display());
    let posts = blog_core::load_posts(&posts_path)?;

    if posts.is_empty() {
        println!("⚠ No posts to publish. Create one with write-post or `manage-posts add`.");
        return Ok(());
    }
    println!("✓ Loaded {} posts", posts.len());

    let site = SiteSettings::from_env();

    println!("\n📝 Rendering worker script...");
    let script = WorkerScript::render(posts.list(), &site).context("Failed to render worker")?;
    println!("✓ Rendered {} KB", script.len() / 1024);

    if let Some(output) = args.output {
        let path = WorkerScript::save(&script, &output)?;
        println!("\n✅ Worker script saved to: {}", path.display());
        return Ok(());
    }

    let mut config = CloudflareConfig::from_env()?;
    if let Some(worker_name) = args.worker_name {
        config.worker_name = worker_name;
    }

    println!("\n🔐 Connecting to Cloudflare...");
    let client = CloudflareClient::new(config.api_token.clone())?;
    let connection = client
        .connect(&config)
        .await
        .context("Failed to connect to Cloudflare")?;
    println!("✓ Account: {}", connection.account_name);

    println!("\n🚀 Deploying worker '{}'...", connection.worker_name);
    client
        .deploy(&connection, &script)
        .await
        .context("Failed to deploy worker")?;

    println!("\n✅ Blog is live at: {}", connection.worker_url());

    Ok(())
}
