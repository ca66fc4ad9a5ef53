//! CRM bridge CLI - one-shot CRM operations and catalog checks.
//!
//! # Usage
//!
//! ```bash
//! # List the first 20 contacts matching "silva"
//! crm-cli contacts list --limit 20 --query silva
//!
//! # Create an opportunity by names, falling back to the default pipeline
//! crm-cli opportunity create --title "Venda Maria" --contact-name "Maria Santos" \
//!     --pipeline vendas --stage proposta --value 1800
//!
//! # Show the catalog, then check it against the CRM
//! crm-cli catalog show
//! crm-cli catalog verify
//!
//! # Run a chat command (or read commands from stdin when none is given)
//! crm-cli chat '/venda "Consultoria" "Ana Lima" 2500'
//! ```
//!
//! # Commands
//!
//! - `contacts list|create` - Contact listing and creation
//! - `sms send` - SMS with the conversation fallback
//! - `opportunity create` - Opportunity creation in any resolution mode
//! - `pipelines list` - Pipelines and stages from the CRM
//! - `catalog show|verify` - Inspect the pipeline/stage catalog
//! - `chat` - Chat commands, one-shot or from stdin

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "crm-cli")]
#[command(author, version, about = "CRM bridge CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
    /// Text messages
    Sms {
        #[command(subcommand)]
        action: SmsAction,
    },
    /// Opportunities
    Opportunity {
        #[command(subcommand)]
        action: OpportunityAction,
    },
    /// Pipelines as the CRM reports them
    Pipelines {
        #[command(subcommand)]
        action: PipelinesAction,
    },
    /// Pipeline/stage catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Run a chat command line; reads lines from stdin when omitted
    Chat {
        /// The command line, e.g. `/buscar_contatos 5`
        line: Option<String>,
    },
}

#[derive(Subcommand)]
enum ContactsAction {
    /// List contacts
    List {
        /// Maximum number of contacts (1-100)
        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one contact
    Get {
        /// Contact ID
        contact_id: String,
    },
    /// Create a contact
    Create {
        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short = 'L', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Change the given fields of a contact
    Update {
        /// Contact ID
        contact_id: String,

        /// First name
        #[arg(short, long)]
        first_name: Option<String>,

        /// Last name
        #[arg(short = 'L', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Comma-separated tags, replacing the current ones
        #[arg(short, long)]
        tags: Option<String>,
    },
}

#[derive(Subcommand)]
enum SmsAction {
    /// Send an SMS to a contact
    Send {
        /// Contact ID
        #[arg(short, long)]
        contact_id: String,

        /// Message text
        #[arg(short, long)]
        message: String,
    },
}

#[derive(Subcommand)]
enum OpportunityAction {
    /// Create an opportunity
    Create(OpportunityArgs),
}

#[derive(Args)]
pub struct OpportunityArgs {
    /// Resolution mode (`ids_required`, `names_resolved`, `natural_language`)
    #[arg(short, long, default_value = "names_resolved")]
    pub mode: String,

    /// Opportunity title (generated in `natural_language` mode when omitted)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Contact ID
    #[arg(long)]
    pub contact_id: Option<String>,

    /// Contact name to find or create
    #[arg(long)]
    pub contact_name: Option<String>,

    /// Contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Contact phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Always create a new contact instead of searching
    #[arg(long)]
    pub force_new: bool,

    /// Pipeline ID
    #[arg(long)]
    pub pipeline_id: Option<String>,

    /// Pipeline name or synonym
    #[arg(long)]
    pub pipeline: Option<String>,

    /// Stage ID
    #[arg(long)]
    pub stage_id: Option<String>,

    /// Stage name or synonym
    #[arg(long)]
    pub stage: Option<String>,

    /// Monetary value, e.g. `2500` or `1.500,00`
    #[arg(short, long)]
    pub value: Option<String>,

    /// Status (`open`, `won`, `lost`, `abandoned`)
    #[arg(short, long)]
    pub status: Option<String>,
}

#[derive(Subcommand)]
enum PipelinesAction {
    /// List pipelines and their stages
    List,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print the catalog in effect
    Show {
        /// Catalog file (defaults to `CRM_CATALOG_PATH`, then the built-in catalog)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Compare the catalog with the CRM's pipelines
    Verify,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_bridge=warn,crm_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Contacts { action } => {
            let ctx = commands::Context::load()?;
            match action {
                ContactsAction::List { limit, query } => {
                    commands::crm::list_contacts(&ctx, limit, query).await?;
                }
                ContactsAction::Get { contact_id } => {
                    commands::crm::get_contact(&ctx, &contact_id).await?;
                }
                ContactsAction::Create {
                    first_name,
                    last_name,
                    email,
                    phone,
                    tags,
                } => {
                    let contact = commands::crm::ContactArgs {
                        first_name,
                        last_name,
                        email,
                        phone,
                        tags,
                    };
                    commands::crm::create_contact(&ctx, contact).await?;
                }
                ContactsAction::Update {
                    contact_id,
                    first_name,
                    last_name,
                    email,
                    phone,
                    tags,
                } => {
                    let changes = commands::crm::ContactChanges {
                        first_name,
                        last_name,
                        email,
                        phone,
                        tags,
                    };
                    commands::crm::update_contact(&ctx, &contact_id, changes).await?;
                }
            }
        }
        Commands::Sms {
            action: SmsAction::Send {
                contact_id,
                message,
            },
        } => {
            let ctx = commands::Context::load()?;
            commands::crm::send_sms(&ctx, &contact_id, &message).await?;
        }
        Commands::Opportunity {
            action: OpportunityAction::Create(args),
        } => {
            let ctx = commands::Context::load()?;
            commands::crm::create_opportunity(&ctx, args).await?;
        }
        Commands::Pipelines {
            action: PipelinesAction::List,
        } => {
            let ctx = commands::Context::load()?;
            commands::crm::list_pipelines(&ctx).await?;
        }
        Commands::Catalog { action } => match action {
            CatalogAction::Show { path } => commands::catalog::show(path)?,
            CatalogAction::Verify => {
                let ctx = commands::Context::load()?;
                commands::catalog::verify(&ctx).await?;
            }
        },
        Commands::Chat { line } => {
            let ctx = commands::Context::load()?;
            commands::chat::run(&ctx, line).await?;
        }
    }
    Ok(())
}
