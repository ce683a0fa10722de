use anyhow::{Context, Result};
use blog_core::{
    BingImageClient, GeminiClient, GeminiConfig, GenerationSettings, Language, PostBuilder,
    PostComposer, PostRequest,
};
use clap::Parser;
use std::io::{self as stdio, Write};
use std::path::PathBuf;

const PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "write-post")]
#[command(about = "Generate a blog post with Gemini and add it to the post collection")]
struct Args {
    /// Topic or keyword for the article (prompted for when omitted)
    #[arg(short, long)]
    topic: Option<String>,

    /// Article language, id or en [default: id]
    #[arg(short, long)]
    language: Option<String>,

    /// Author shown on the post
    #[arg(short, long, default_value = "AI Assistant")]
    author: String,

    /// Number of images to search for and insert, 0-5 [default: 3]
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    images: Option<u8>,

    /// Skip image search entirely
    #[arg(long)]
    no_images: bool,

    /// Search terms for images (defaults to the topic)
    #[arg(long)]
    image_query: Option<String>,

    /// Custom post id / slug (defaults to one derived from the title)
    #[arg(long)]
    id: Option<String>,

    /// Post collection file (defaults to the local data directory)
    #[arg(long)]
    posts_file: Option<PathBuf>,
}

fn prompt_topic() -> Result<String> {
    print!("Topic or keyword for the article: ");
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;

    let topic = input.trim();
    if topic.is_empty() {
        anyhow::bail!("A topic is required to generate a post.");
    }
    Ok(topic.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    blog_core::logging::init();
    let args = Args::parse();

    let settings = GenerationSettings::default();
    let language = match args.language.as_deref() {
        Some(code) => code.parse::<Language>()?,
        None => settings.default_language,
    };
    let topic = match args.topic {
        Some(topic) if !topic.trim().is_empty() => topic.trim().to_string(),
        _ => prompt_topic()?,
    };

    let gemini_config = GeminiConfig::from_env()?;

    let posts_path = match args.posts_file {
        Some(path) => path,
        None => blog_core::default_posts_path()?,
    };
    let mut posts = blog_core::load_posts(&posts_path)?;

    let max_images = if args.no_images {
        0
    } else {
        args.images.map(usize::from).unwrap_or(settings.max_images)
    };

    let mut request = PostRequest::new(&topic, &args.author, language);
    request.max_images = max_images;
    request.image_query = args.image_query;
    request.custom_id = args.id;

    let generator = GeminiClient::new(&gemini_config, &settings)?;
    let mut composer = PostComposer::new(PostBuilder::new(&settings)).with_generator(generator);
    if max_images > 0 {
        composer = composer.with_image_source(BingImageClient::new()?);
    }

    println!("\n✓ Topic: {}", topic);
    println!("✓ Language: {}", language.display_name());

    if max_images > 0 {
        println!("\n🖼  Will search for up to {} images: \"{}\"", max_images, request.image_query());
    }

    println!("\n🤖 Generating article with Gemini...");
    println!("  (This may take a minute...)");
    let post = composer
        .compose(&request)
        .await
        .context("Failed to generate post")?;

    let image_count = post.content.matches("<img ").count();
    println!("✓ Generated \"{}\"", post.title);
    if max_images > 0 {
        if image_count == 0 {
            println!("⚠ No images were found; the post has text only");
        } else {
            println!("✓ Inserted {} images", image_count);
        }
    }

    let id = post.id.clone();
    let title = post.title.clone();
    let excerpt = post.excerpt.clone();
    let preview: String = post.content.chars().take(PREVIEW_CHARS).collect();
    let truncated = post.content.chars().count() > PREVIEW_CHARS;

    posts
        .push(post)
        .with_context(|| format!("Could not add post '{}'. Use --id to choose another id.", id))?;
    let saved_path = blog_core::save_posts(&posts, &posts_path)?;

    println!("\n📝 Preview");
    println!("  Title:   {}", title);
    println!("  Id:      {}", id);
    println!("  Excerpt: {}", excerpt);
    println!();
    println!("{}{}", preview, if truncated { "..." } else { "" });

    println!(
        "\n✅ Post saved to {} ({} posts total)",
        saved_path.display(),
        posts.len()
    );

    Ok(())
}
