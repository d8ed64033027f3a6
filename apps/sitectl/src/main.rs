use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    forms::{LinkDraft, PostDraft},
    info_panel::InfoView,
    load_settings, HttpRemoteService, InMemoryService, RemoteService, Settings, SiteClient,
};
use shared::domain::{format_principal, BlogPostId, Principal, WebLinkId};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Inspect and administer the site through its backend")]
struct Cli {
    /// Run against a seeded in-memory backend instead of the configured one.
    #[arg(long)]
    demo: bool,
    /// Print results as JSON.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Links {
        /// List in creation order instead of the saved arrangement.
        #[arg(long)]
        created: bool,
    },
    Posts,
    Info,
    Heading,
    Visits,
    Admins,
    Whoami,
    /// Show another user's profile (admins only).
    Profile {
        principal: String,
    },
    AddLink {
        title: String,
        url: String,
        #[arg(default_value = "")]
        description: String,
    },
    EditLink {
        id: u64,
        title: String,
        url: String,
        #[arg(default_value = "")]
        description: String,
    },
    DeleteLink {
        id: u64,
    },
    /// Rearrange links, e.g. `reorder --ids 2,3,1`.
    Reorder {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },
    AddPost {
        title: String,
        content: String,
    },
    DeletePost {
        id: u64,
    },
    SetInfo {
        content: String,
    },
    SetHeading {
        text: String,
        #[arg(long, default_value = "cursive")]
        font: String,
        #[arg(long, default_value = "#f1f5f9")]
        color: String,
    },
    AddAdmin {
        principal: String,
    },
    RemoveAdmin {
        principal: String,
    },
    SetName {
        name: String,
    },
    /// Count a visit for this session.
    Visit,
    InitAccess,
}

fn demo_backend(settings: &Settings) -> Arc<dyn RemoteService> {
    let admin = settings
        .default_admin()
        .unwrap_or_else(Principal::anonymous);
    Arc::new(
        InMemoryService::new(admin.clone())
            .with_admin(admin)
            .with_link("Rust", "https://www.rust-lang.org", "The Rust language")
            .with_link("Tokio", "https://tokio.rs", "Async runtime")
            .with_link("Docs", "https://docs.rs", "Crate documentation")
            .with_post("Hello", "First post on the new site.")
            .with_visit_count(100),
    )
}

fn remote_backend(settings: &Settings) -> Result<Arc<dyn RemoteService>> {
    let Some((host, canister_id)) = settings.backend() else {
        bail!("backend host and canister id are not configured; set them in site.toml or via BACKEND_HOST and BACKEND_CANISTER_ID");
    };
    let service = HttpRemoteService::new(host, canister_id)?;
    info!(endpoint = %service.endpoint(), "sitectl: using remote backend");
    Ok(Arc::new(service))
}

async fn reorder(client: &SiteClient, ids: &[u64]) -> Result<()> {
    client.enter_reordering().await?;
    for (target, id) in ids.iter().enumerate() {
        let id = WebLinkId(*id);
        if !client.drag_start(id).await? {
            bail!("link {id} cannot be moved right now");
        }
        client.drag_over(target).await?;
        client.drop_at(target).await?;
    }
    let saved = client.save_order().await;
    if saved.is_err() {
        client
            .cancel_reordering()
            .await
            .context("restoring the original order")?;
    }
    for link in saved? {
        println!("{}\t{}", link.id, link.title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();
    let settings = load_settings();

    let remote = if cli.demo {
        demo_backend(&settings)
    } else {
        remote_backend(&settings)?
    };
    let client = SiteClient::new(remote, settings);

    match cli.command {
        Command::Links { created } => {
            let links = if created {
                client.links_by_creation().await?
            } else {
                client.web_links().await?
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else {
                for link in links {
                    println!("{}\t{}\t{}", link.id, link.title, link.url);
                }
            }
        }
        Command::Posts => {
            let posts = client.blog_posts().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                for post in posts {
                    println!("{}\t{}\t{}", post.id, post.timestamp, post.title);
                }
            }
        }
        Command::Info => {
            client.bootstrap().await;
            client
                .inspect_info_panel(|panel| match panel.view() {
                    InfoView::Legacy(info) => println!("{}", info.content),
                    InfoView::Screen { section_title, .. } => {
                        println!("{section_title}");
                        for screen in panel.draft().screens() {
                            println!("  [{}] {}: {}", screen.id, screen.title, screen.content);
                        }
                    }
                    InfoView::Empty => println!("(no info screens)"),
                })
                .await;
        }
        Command::Heading => {
            let heading = client.heading_config().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&heading)?);
            } else {
                println!("{} ({}, {})", heading.text, heading.font.name(), heading.color);
            }
        }
        Command::Visits => println!("{}", client.visit_count().await?),
        Command::Admins => {
            let admins = client.admins().await?;
            if admins.is_empty() {
                println!("(admin list is only visible to admins)");
            }
            for admin in admins {
                let marker = if admin.removable { "" } else { " (default)" };
                println!("{}{marker}", format_principal(admin.principal.as_str()));
            }
        }
        Command::Whoami => {
            let profile = client.caller_profile().await?;
            let affordances = client.affordances().await;
            println!(
                "name: {}",
                profile.map(|p| p.name).unwrap_or_else(|| "(none)".into())
            );
            println!("role: {:?}", client.caller_role().await?);
            println!("admin: {}", affordances.any());
        }
        Command::Profile { principal } => {
            let principal: Principal = principal.parse()?;
            match client.user_profile(&principal).await? {
                Some(profile) => println!("{}\t{}", principal.short(), profile.name),
                None => println!("{} has no profile", principal.short()),
            }
        }
        Command::AddLink {
            title,
            url,
            description,
        } => {
            client.start_add_link().await?;
            client
                .set_link_draft(LinkDraft {
                    title,
                    url,
                    description,
                })
                .await;
            client.submit_link().await?;
            println!("link added");
        }
        Command::EditLink {
            id,
            title,
            url,
            description,
        } => {
            client.start_edit_link(WebLinkId(id)).await?;
            client
                .set_link_draft(LinkDraft {
                    title,
                    url,
                    description,
                })
                .await;
            client.submit_link().await?;
            println!("link {id} updated");
        }
        Command::DeleteLink { id } => {
            client.delete_link(WebLinkId(id)).await?;
            println!("link {id} deleted");
        }
        Command::Reorder { ids } => reorder(&client, &ids).await?,
        Command::AddPost { title, content } => {
            client.start_add_post().await?;
            client.set_post_draft(PostDraft { title, content }).await;
            client.submit_post().await?;
            println!("post added");
        }
        Command::DeletePost { id } => {
            client.delete_post(BlogPostId(id)).await?;
            println!("post {id} deleted");
        }
        Command::SetInfo { content } => {
            client.start_info_edit().await?;
            client.set_info_draft(&content).await;
            client.save_info().await?;
            println!("info updated");
        }
        Command::SetHeading { text, font, color } => {
            let heading = client.update_heading_config(&text, &font, &color).await?;
            println!("heading set to {}", heading.text);
        }
        Command::AddAdmin { principal } => {
            let principal = client.add_admin(&principal).await?;
            println!("{} is now an admin", principal.short());
        }
        Command::RemoveAdmin { principal } => {
            let principal: Principal = principal.parse()?;
            client.remove_admin(&principal).await?;
            println!("{} is no longer an admin", principal.short());
        }
        Command::SetName { name } => {
            client.save_profile(&name).await?;
            println!("profile saved");
        }
        Command::Visit => {
            let counted = client.record_session_start().await?;
            println!(
                "{} (total {})",
                if counted { "visit counted" } else { "already counted" },
                client.visit_count().await?
            );
        }
        Command::InitAccess => {
            client.initialize_access_control().await?;
            println!("access control initialized");
        }
    }

    Ok(())
}
