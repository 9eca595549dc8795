use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use econews::api::{ApiClient, NewsApi, NewsCategory, NewsId, TermId};
use econews::config::Config;
use econews::logging::{init_logging, LogTarget};
use econews::session::{Credentials, Session, SessionContext, SessionStore, SignupForm};
use econews::terms::{HighlightedDocument, PollEvent, Segment, TermPoller};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "econews",
    about = "Economics news reader with AI term highlighting and quizzes",
    version
)]
struct Cli {
    /// Backend base URL, overriding config and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to a config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List news articles.
    News {
        /// Category code such as FINANCE or REAL_ESTATE.
        #[arg(short, long, default_value = "MAIN")]
        category: String,
        /// Zero-based page number.
        #[arg(short, long, default_value_t = 0)]
        page: u32,
    },
    /// Print an article with its terms highlighted.
    Show {
        id: NewsId,
        /// Request term extraction and poll until it settles first.
        #[arg(short, long)]
        watch: bool,
        /// Print the body as HTML markup instead of terminal text.
        #[arg(long)]
        html: bool,
    },
    /// List dictionary terms.
    Terms {
        /// Only terms whose name contains this text.
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show a term's full explanation.
    Term { id: TermId },
    /// Log in with email and password, or store the session from a social
    /// login redirect URL.
    Login {
        /// Redirect URL carrying `token` and `memberId`.
        #[arg(conflicts_with = "email", required_unless_present = "email")]
        redirect_url: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Read from stdin when omitted.
        #[arg(long, requires = "email")]
        password: Option<String>,
    },
    /// Create an account, then log in with it.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        nickname: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = if cli.command.is_none() {
        LogTarget::default_file().unwrap_or(LogTarget::Stderr)
    } else {
        LogTarget::Stderr
    };
    init_logging(target)?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.override_base_url(cli.base_url);

    let store = SessionStore::default_path().map(SessionStore::new);
    let session = match &store {
        Some(store) => store.load().unwrap_or_else(|e| {
            warn!("ignoring unreadable session file: {}", e);
            None
        }),
        None => None,
    };
    let client = Arc::new(ApiClient::new(
        &config.api,
        &config.news,
        SessionContext::new(session),
    )?);
    info!(
        base_url = %client.base_url(),
        authenticated = client.session().is_authenticated(),
        "backend client ready"
    );
    let api: Arc<dyn NewsApi> = client.clone();

    match cli.command {
        None => econews::ui::run_tui(api, config.polling.clone()).await?,
        Some(Command::News { category, page }) => {
            let category = NewsCategory::from_code(&category)
                .with_context(|| format!("unknown category: {}", category))?;
            list_news(api.as_ref(), category, page).await?;
        }
        Some(Command::Show { id, watch, html }) => show(api, &config, id, watch, html).await?,
        Some(Command::Terms { filter }) => list_terms(api.as_ref(), filter.as_deref()).await?,
        Some(Command::Term { id }) => {
            let detail = api.term_detail(id).await?;
            println!("{}", detail.term_name.bold());
            println!();
            println!("{}", detail.detailed_explanation);
        }
        Some(Command::Login {
            redirect_url,
            email,
            password,
        }) => {
            let store = store.ok_or_else(|| anyhow!("no config directory for the session"))?;
            let session = match (redirect_url, email) {
                (Some(url), _) => Session::from_redirect_url(&url)?,
                (None, Some(email)) => {
                    let password = password_or_prompt(password)?;
                    api.login(&Credentials { email, password }).await?
                }
                (None, None) => return Err(anyhow!("pass a redirect URL or --email")),
            };
            save_session(&store, &client, session)?;
        }
        Some(Command::Signup {
            email,
            name,
            nickname,
            password,
        }) => {
            let store = store.ok_or_else(|| anyhow!("no config directory for the session"))?;
            let form = SignupForm {
                email,
                password: password_or_prompt(password)?,
                name,
                nickname,
            };
            api.signup(&form).await?;
            println!("Account created for {}", form.email);
            let session = api.login(&form.credentials()).await?;
            save_session(&store, &client, session)?;
        }
        Some(Command::Logout) => {
            if let Some(store) = store {
                store.clear()?;
            }
            println!("Logged out");
        }
    }

    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(anyhow!("empty password"));
    }
    Ok(password)
}

fn save_session(store: &SessionStore, client: &ApiClient, session: Session) -> Result<()> {
    store
        .save(&session)
        .with_context(|| format!("saving session to {}", store.path().display()))?;
    match &session.member_id {
        Some(member) => println!("Logged in as member {}", member),
        None => println!("Logged in"),
    }
    client.session().init(session);
    Ok(())
}

async fn list_news(api: &dyn NewsApi, category: NewsCategory, page: u32) -> Result<()> {
    let news = api.news_list(category, page).await?;
    println!("{} (page {})", category.label().bold(), page + 1);
    if news.is_empty() {
        println!("{}", "No news on this page".dark_grey());
    }
    for item in news {
        let published = item
            .published_at
            .as_deref()
            .map(econews::api::format_timestamp)
            .unwrap_or_default();
        println!(
            "{:>6}  {}  {}",
            item.news_id,
            published.yellow(),
            item.title
        );
    }
    Ok(())
}

async fn list_terms(api: &dyn NewsApi, filter: Option<&str>) -> Result<()> {
    let needle = filter.map(str::to_lowercase).unwrap_or_default();
    let terms = api.term_list().await?;
    for term in terms
        .iter()
        .filter(|t| t.term_name.to_lowercase().contains(&needle))
    {
        let brief = term.brief_explanation.as_deref().unwrap_or_default();
        println!("{:>6}  {}  {}", term.term_id, term.term_name.as_str().bold(), brief.dark_grey());
    }
    Ok(())
}

async fn show(
    api: Arc<dyn NewsApi>,
    config: &Config,
    news_id: NewsId,
    watch: bool,
    html: bool,
) -> Result<()> {
    let article = api.news_detail(news_id).await?;
    let mut terms = api.news_terms(news_id).await?;

    if watch {
        if let Err(e) = api.generate_terms(news_id).await {
            warn!(news_id, "term generation request failed: {}", e);
        }
        let (tx, mut events) = mpsc::unbounded_channel();
        let mut poller = TermPoller::new(api.clone(), config.polling.clone(), tx);
        poller.start(news_id);
        eprintln!("{}", "Waiting for term extraction...".dark_grey());

        while let Some(event) = events.recv().await {
            match event {
                PollEvent::Terms {
                    attempt,
                    terms: latest,
                    ..
                } => {
                    eprintln!("  attempt {}: {} terms", attempt, latest.len());
                    terms = latest;
                }
                PollEvent::Finished {
                    attempts, reason, ..
                } => {
                    eprintln!("  finished after {} attempts ({:?})", attempts, reason);
                    break;
                }
            }
        }
    }

    let document = HighlightedDocument::render(&article.full_content, &terms);
    if html {
        println!("{}", document.to_html());
        return Ok(());
    }

    println!("{}", article.title.as_str().bold());
    println!(
        "{}  {}  {}",
        article.category_label().cyan(),
        article.source,
        article.published_display()
    );
    println!();

    let mut body = String::new();
    for segment in document.segments() {
        match segment {
            Segment::Text(text) => body.push_str(text),
            Segment::Marker { text, .. } => {
                body.push_str(&text.as_str().black().on_yellow().to_string())
            }
        }
    }
    println!("{}", body);

    if !terms.is_empty() {
        println!();
        println!("{}", "Terms".bold());
        for term in &terms {
            println!("{:>6}  {}", term.term_id, term.term_name);
        }
    }
    Ok(())
}
