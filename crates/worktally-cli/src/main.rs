mod app;
mod display;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use worktally_core::CategoryKey;

use crate::app::{App, CatalogKind, DeleteKind, Period, Registration};

#[derive(Parser)]
#[command(name = "worktally", version, about = "Tap-to-count work sampling surveys")]
struct Cli {
    /// Base URL of the worktally API.
    #[arg(long, env = "WORKTALLY_API_URL", default_value = "http://localhost:5000", global = true)]
    api_url: String,

    /// Where drafts, the active survey and the login token are kept.
    #[arg(long, env = "WORKTALLY_DATA_DIR", default_value = ".worktally", global = true)]
    data_dir: PathBuf,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the token.
    Login {
        #[arg(long)]
        company: String,
        #[arg(long = "user")]
        user_id: String,
        /// Prompted for when not given.
        #[arg(long, env = "WORKTALLY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    /// Show the logged-in user and what they may do.
    Whoami,
    /// List survey templates.
    Templates,
    /// List presets.
    Presets,
    /// Register (or with --update, replace) a template or preset.
    Register {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        no: Option<String>,
        /// Comma-separated real work items.
        #[arg(long, value_delimiter = ',')]
        real: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        incidental: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        wasteful: Vec<String>,
        /// Start from a preset's item lists.
        #[arg(long)]
        from_preset: Option<String>,
        /// Id of the entry to replace.
        #[arg(long)]
        update: Option<String>,
    },
    /// Bulk-delete templates, presets or results by id.
    Delete {
        #[arg(value_enum)]
        kind: DeleteArg,
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Start a new survey from a template.
    Start {
        template_id: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// List in-progress surveys, or resume one by instance id.
    Resume { instance_id: Option<String> },
    /// Tap an item of the active survey.
    Count {
        /// real, incidental or wasteful
        category: CategoryKey,
        item: String,
        /// Take back instead of add.
        #[arg(short, long)]
        subtract: bool,
        #[arg(short = 'n', long, default_value_t = 1)]
        times: u32,
    },
    /// Show the active survey's counts and metrics.
    Show,
    /// Save the active survey's result.
    Finish,
    /// Abandon the active survey.
    Discard {
        #[arg(short, long)]
        yes: bool,
    },
    /// Results of a day or a date range, re-scored against current templates.
    Results {
        /// Show one saved result item by item.
        #[arg(long, value_name = "RESULT_ID", conflicts_with_all = ["day", "from", "to", "all"])]
        show: Option<String>,
        #[arg(long, conflicts_with_all = ["from", "to", "all"])]
        day: Option<NaiveDate>,
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Template,
    Preset,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeleteArg {
    Templates,
    Presets,
    Results,
}

impl Command {
    fn period(day: Option<NaiveDate>, from: Option<NaiveDate>, to: Option<NaiveDate>, all: bool) -> Period {
        match (day, from, to) {
            _ if all => Period::All,
            (Some(day), _, _) => Period::Day(day),
            (None, Some(from), Some(to)) => Period::Range(from, to),
            _ => Period::Day(chrono::Local::now().date_naive()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();
    tracing::debug!("worktally v{}", env!("CARGO_PKG_VERSION"));

    let mut app = App::open(cli.api_url, cli.data_dir)?;
    match cli.command {
        Command::Login {
            company,
            user_id,
            password,
        } => app.login(&company, &user_id, password).await,
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami().await,
        Command::Templates => app.templates().await,
        Command::Presets => app.presets().await,
        Command::Register {
            kind,
            name,
            no,
            real,
            incidental,
            wasteful,
            from_preset,
            update,
        } => {
            let kind = match kind {
                KindArg::Template => CatalogKind::Template,
                KindArg::Preset => CatalogKind::Preset,
            };
            let reg = Registration {
                name,
                no,
                real,
                incidental,
                wasteful,
                from_preset,
                update,
            };
            app.register(kind, reg).await
        }
        Command::Delete { kind, ids, yes } => {
            let kind = match kind {
                DeleteArg::Templates => DeleteKind::Templates,
                DeleteArg::Presets => DeleteKind::Presets,
                DeleteArg::Results => DeleteKind::Results,
            };
            app.delete(kind, &ids, yes).await
        }
        Command::Start { template_id, yes } => app.start(&template_id, yes).await,
        Command::Resume { instance_id } => app.resume(instance_id.as_deref()).await,
        Command::Count {
            category,
            item,
            subtract,
            times,
        } => app.count(category, &item, subtract, times),
        Command::Show => app.show(),
        Command::Finish => app.finish().await,
        Command::Discard { yes } => app.discard(yes).await,
        Command::Results { show: Some(id), .. } => app.result_detail(&id).await,
        Command::Results {
            show: None,
            day,
            from,
            to,
            all,
        } => app.results(Command::period(day, from, to, all)).await,
    }
}
