mod cli;

use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use agenda::config::Config;
use agenda::model::Priority;
use agenda::ops::{self, NewTask, TaskEdit};
use agenda::pomodoro::{self, Format, SessionRecord};
use agenda::output;
use agenda::store::{self, HttpGraphApi, LocalStore, StorageMode};
use cli::{Cli, Command, PomoCommand, SessionArgs};

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

/// Config file values overridden by command-line flags and env vars.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };
    if let Some(db) = &cli.db {
        config.storage.db = Some(db.clone());
    }
    if let Some(mode) = &cli.mode {
        config.storage.mode = Some(mode.clone());
    }
    if let Some(token) = &cli.token {
        config.logseq.token = Some(token.clone());
    }
    Ok(config)
}

fn parse_priority(priority: Option<String>) -> Result<Option<Priority>> {
    priority.map(|p| Priority::parse(&p)).transpose()
}

fn session_record(args: SessionArgs) -> SessionRecord {
    let start = args
        .start
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    if args.partial {
        SessionRecord::partial(start, args.length, args.remark)
    } else {
        SessionRecord::full(start, args.length)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = load_config(&cli)?;

    match cli.command {
        Command::List { tree, all, json } => {
            let store = store::create(config.mode(), &config)?;
            let tasks = ops::list_tasks(store.as_ref(), all || json)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tree {
                print!("{}", output::format_task_tree(&tasks));
            } else {
                print!("{}", output::format_task_list(&tasks));
            }
        }

        Command::Show { id, json } => {
            let store = store::create(config.mode(), &config)?;
            let task = ops::get_task(store.as_ref(), &id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                print!("{}", output::format_task_detail(&task));
            }
        }

        Command::Add {
            title,
            id,
            desc,
            start,
            end,
            priority,
            tags,
            parent,
        } => {
            let mode = StorageMode::parse(config.mode())?;
            let store = store::open(mode, &config)?;
            let new = NewTask {
                id,
                title,
                description: desc,
                start_date: start,
                end_date: end,
                priority: parse_priority(priority)?,
                tags,
                parent_id: parent,
            };
            let task = ops::add_task(store.as_ref(), new, mode == StorageMode::Local)?;
            if !task.id.is_empty() {
                println!("{}", task.id);
            }
            eprintln!("Added task '{}'", task.title);
        }

        Command::Edit {
            id,
            title,
            desc,
            start,
            end,
            priority,
            parent,
        } => {
            let store = store::create(config.mode(), &config)?;
            let edit = TaskEdit {
                title,
                description: desc,
                start_date: start,
                end_date: end,
                priority: parse_priority(priority)?,
                parent_id: parent,
            };
            ops::edit_task(store.as_ref(), &id, edit)?;
            eprintln!("Updated task '{id}'");
        }

        Command::Done { id } => {
            let store = store::create(config.mode(), &config)?;
            ops::mark_done(store.as_ref(), &id)?;
            eprintln!("Marked '{id}' as done");
        }

        Command::Reopen { id } => {
            let store = store::create(config.mode(), &config)?;
            ops::reopen_task(store.as_ref(), &id)?;
            eprintln!("Reopened '{id}'");
        }

        Command::Rm { id } => {
            let store = store::create(config.mode(), &config)?;
            ops::remove_task(store.as_ref(), &id)?;
            eprintln!("Removed task '{id}'");
        }

        Command::Export { dir } => {
            let store = LocalStore::open(&config.db_path())?;
            match store.export_to(Path::new(&dir))? {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("Nothing to export"),
            }
        }

        Command::Import { file } => {
            let store = LocalStore::open(&config.db_path())?;
            store.import_file(Path::new(&file))?;
            eprintln!("Imported '{file}'");
        }

        Command::Migrate { from, to } => {
            let source = store::create(&from, &config)?;
            let destination = store::create(&to, &config)?;
            let count = store::migrate(source.as_ref(), destination.as_ref())?;
            info!("migration {from} -> {to} finished");
            eprintln!("Migrated {count} tasks from {from} to {to}");
        }

        Command::ShareUrl => {
            let store = LocalStore::open(&config.db_path())?;
            let data = store.load()?.unwrap_or_default();
            match data.ics_settings().share_url() {
                Some(url) => println!("{url}"),
                None => bail!("ics.repo and ics.token must both be set in settings"),
            }
        }

        Command::Pomo(command) => run_pomo(command, &config)?,
    }

    Ok(())
}

fn run_pomo(command: PomoCommand, config: &Config) -> Result<()> {
    match command {
        PomoCommand::Show { text, format, json } => {
            let format = Format::parse(&format)?;
            let records = pomodoro::parse(&text, format).unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                eprintln!("No sessions");
            } else {
                print!("{}", output::format_sessions(&records));
            }
        }

        PomoCommand::Add {
            text,
            session,
            format,
        } => {
            let format = Format::parse(&format)?;
            println!("{}", pomodoro::append(&text, format, session_record(session)));
        }

        PomoCommand::Strip { text, format } => {
            let format = Format::parse(&format)?;
            println!("{}", pomodoro::remove(&text, format));
        }

        PomoCommand::Record { uuid, session } => {
            let api = HttpGraphApi::from_config(&config.logseq)?;
            match store::record_session(&api, &uuid, session_record(session))? {
                Some(content) => println!("{content}"),
                None => bail!("block '{uuid}' not found"),
            }
        }
    }
    Ok(())
}
