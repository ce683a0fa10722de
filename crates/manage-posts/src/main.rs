use anyhow::{Context, Result};
use blog_core::excerpt::DEFAULT_EXCERPT_LENGTH;
use blog_core::slug::resolve_post_id;
use blog_core::{extract_excerpt, truncate_text, Post, PostCollection};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write as _};
use std::path::{Path, PathBuf};

const LIST_EXCERPT_CHARS: usize = 100;

#[derive(Parser)]
#[command(name = "manage-posts")]
#[command(about = "List, add, delete, export and import blog posts")]
struct Args {
    /// Post collection file (defaults to the local data directory)
    #[arg(long, global = true)]
    posts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all posts with their index
    List,

    /// Print one post in full
    Show {
        /// Position shown by `list` (starting at 1)
        index: usize,
    },

    /// Add a hand-written post
    Add(AddArgs),

    /// Delete a post
    Delete {
        /// Position shown by `list` (starting at 1)
        index: usize,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write all posts to a JSON file
    Export { path: PathBuf },

    /// Replace all posts with the contents of a JSON file
    Import {
        path: PathBuf,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Args)]
struct AddArgs {
    #[arg(short, long)]
    title: String,

    /// Post id / slug (defaults to one derived from the title)
    #[arg(long)]
    id: Option<String>,

    #[arg(short, long, default_value = "Admin")]
    author: String,

    /// Publication date as YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    date: Option<String>,

    /// Short summary (defaults to the opening sentences of the content)
    #[arg(short, long)]
    excerpt: Option<String>,

    /// Post body (read from stdin when omitted)
    #[arg(short, long)]
    content: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
}

fn main() -> Result<()> {
    blog_core::logging::init();
    let args = Args::parse();

    let posts_path = match args.posts_file {
        Some(path) => path,
        None => blog_core::default_posts_path()?,
    };
    let mut posts = blog_core::load_posts(&posts_path)?;

    match args.command {
        Command::List => list_posts(&posts),
        Command::Show { index } => show_post(&posts, index)?,
        Command::Add(add) => {
            let content = match &add.content {
                Some(content) => content.clone(),
                None => read_content_from_stdin()?,
            };
            let post = manual_post(&add, &content)?;
            let (id, title) = (post.id.clone(), post.title.clone());

            posts
                .push(post)
                .with_context(|| format!("Could not add post '{}'", id))?;
            save(&posts, &posts_path)?;
            println!("✅ Added \"{}\" ({} posts total)", title, posts.len());
        }
        Command::Delete { index, yes } => {
            let position = to_position(index, &posts)?;
            let title = posts.get(position).map(|p| p.title.clone()).unwrap_or_default();

            if !yes && !confirm(&format!("Delete \"{}\"?", title))? {
                println!("Cancelled.");
                return Ok(());
            }

            posts.remove(position)?;
            save(&posts, &posts_path)?;
            println!("✅ Deleted \"{}\" ({} posts left)", title, posts.len());
        }
        Command::Export { path } => {
            let written = blog_core::export_posts(&posts, &path)?;
            println!("✅ Exported {} posts to {}", posts.len(), written.display());
        }
        Command::Import { path, yes } => {
            let imported = blog_core::import_posts(&path)?;

            if !yes
                && !posts.is_empty()
                && !confirm(&format!(
                    "Replace {} existing posts with {} imported posts?",
                    posts.len(),
                    imported.len()
                ))?
            {
                println!("Cancelled.");
                return Ok(());
            }

            posts.replace_all(imported);
            save(&posts, &posts_path)?;
            println!("✅ Imported {} posts from {}", posts.len(), path.display());
        }
    }

    Ok(())
}

/// Build the post described by `add` around an already-read body
fn manual_post(add: &AddArgs, content: &str) -> Result<Post> {
    let date = parse_date(add.date.as_deref())?;
    let id = resolve_post_id(add.id.as_deref(), &add.title);
    let excerpt = match add.excerpt.as_deref().map(str::trim) {
        Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
        _ => extract_excerpt(content, DEFAULT_EXCERPT_LENGTH),
    };

    let mut post = Post::manual(&id, &add.title, &add.author, date, &excerpt, content)?;
    post.category = add
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    post.tags = add
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(post)
}

fn list_posts(posts: &PostCollection) {
    if posts.is_empty() {
        println!("No posts yet. Create one with write-post or `manage-posts add`.");
        return;
    }

    println!("📚 {} posts\n", posts.len());
    for (i, post) in posts.iter().enumerate() {
        let origin = if post.is_generated() { " 🤖" } else { "" };
        println!("  {}) {}{}", i + 1, post.title, origin);
        println!("     id: {} | {} | {}", post.id, post.date, post.author);
        println!("     {}", truncate_text(&post.excerpt, LIST_EXCERPT_CHARS));
    }
}

fn show_post(posts: &PostCollection, index: usize) -> Result<()> {
    let position = to_position(index, posts)?;
    let post = posts
        .get(position)
        .with_context(|| format!("No post at position {}", index))?;

    println!("Title:    {}", post.title);
    println!("Id:       {}", post.id);
    println!("Author:   {}", post.author);
    println!("Date:     {}", post.date);
    if let Some(category) = &post.category {
        println!("Category: {}", category);
    }
    if !post.tags.is_empty() {
        println!("Tags:     {}", post.tags.join(", "));
    }
    if let Some(keyword) = &post.keyword {
        println!("Keyword:  {}", keyword);
    }
    if let Some(language) = &post.language {
        println!("Language: {}", language);
    }
    println!("Excerpt:  {}", post.excerpt);
    println!("\n{}", post.content);

    Ok(())
}

/// Convert the 1-based index shown to the operator into a collection position
fn to_position(index: usize, posts: &PostCollection) -> Result<usize> {
    if index == 0 || index > posts.len() {
        anyhow::bail!(
            "Invalid post number {}. Choose between 1 and {}.",
            index,
            posts.len()
        );
    }
    Ok(index - 1)
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(date) => NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD.", date)),
        None => Ok(Local::now().date_naive()),
    }
}

fn read_content_from_stdin() -> Result<String> {
    println!("Enter the post content, then press Ctrl-D:");
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read content from stdin")?;
    Ok(content)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn save(posts: &PostCollection, path: &Path) -> Result<()> {
    blog_core::save_posts(posts, path).context("Failed to save posts")?;
    Ok(())
}
