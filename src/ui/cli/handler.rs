// Wed Jan 15 2026 - Alex

use super::args::{Args, CheckArgs, Command, DatabaseArgs, DeclareArgs, ShowArgs, SyncArgs};
use crate::config::{Config, OverwritePolicy};
use crate::host::{ConfirmationProvider, Decision, FixedAnswer, InMemoryDatabase, TerminalConfirm, TypeDatabase};
use crate::typelib::{BaseStruct, Reconciliation, SchemaFile, StructSchema, TypelibError};
use crate::ui::{print_error, print_info, print_success, print_warning};
use crate::utils::{format_duration, measure_time, LoggingUtils};
use anyhow::{anyhow, Context};
use colored::Colorize;
use std::path::PathBuf;

pub struct CommandHandler {
    config: Config,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(mut self, args: Args) -> anyhow::Result<()> {
        if let Some(path) = &args.config {
            self.config = Config::load(path).with_context(|| format!("loading config {}", path.display()))?;
        }
        if let Some(level) = &args.log_level {
            self.config = self.config.with_log_level(level);
        }
        if args.log_file.is_some() {
            self.config.log_file = args.log_file.clone();
        }
        if args.no_color {
            self.config.color = false;
        }

        self.setup_logging(args.verbose, args.log_level.is_some())?;
        crate::utils::logging::install_panic_hook();

        let (result, elapsed) = measure_time(|| match args.command {
            Command::Sync(sync_args) => self.handle_sync(sync_args),
            Command::Check(check_args) => self.handle_check(check_args),
            Command::Show(show_args) => self.handle_show(show_args),
            Command::Declare(declare_args) => self.handle_declare(declare_args),
        });
        log::debug!("Finished in {}", format_duration(elapsed));
        result
    }

    fn setup_logging(&self, verbose: u8, explicit_level: bool) -> anyhow::Result<()> {
        if !self.config.color {
            colored::control::set_override(false);
        }

        if verbose == 0 && !explicit_level && self.config.log_file.is_none() && std::env::var_os("RUST_LOG").is_some() {
            crate::utils::logging::init_from_env();
            return Ok(());
        }

        let level = if verbose > 0 {
            LoggingUtils::level_from_verbosity(verbose)
        } else {
            LoggingUtils::level_from_str(&self.config.log_level)
        };

        LoggingUtils::init_logger(level, self.config.log_file.as_deref(), self.config.color)
            .context("opening log file")?;
        Ok(())
    }

    fn apply_db_args(&mut self, args: &DatabaseArgs) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        if let Some(database) = &args.database {
            config = config.with_database(database.clone());
        }
        if let Some(pointer_size) = args.pointer_size {
            config = config.with_pointer_size(pointer_size);
        }
        config.validate().map_err(|e| anyhow!(e))?;
        self.config = config;
        Ok(())
    }

    fn load_database(&self) -> anyhow::Result<InMemoryDatabase> {
        InMemoryDatabase::load_or_default(&self.config.database, self.config.pointer_size)
            .with_context(|| format!("loading database {}", self.config.database.display()))
    }

    fn save_database(&self, db: &InMemoryDatabase) -> anyhow::Result<()> {
        db.save(&self.config.database)
            .with_context(|| format!("saving database {}", self.config.database.display()))
    }

    fn load_schema(&mut self, schema: Option<PathBuf>) -> anyhow::Result<SchemaFile> {
        if let Some(path) = schema {
            self.config = std::mem::take(&mut self.config).with_schema(path);
        }
        let path = self
            .config
            .schema
            .as_deref()
            .ok_or_else(|| anyhow!("no schema given (use --schema or set 'schema' in the config)"))?;
        Ok(SchemaFile::load(path)?)
    }

    fn confirmation(&self) -> Box<dyn ConfirmationProvider> {
        match self.config.overwrite {
            OverwritePolicy::Ask => Box::new(TerminalConfirm::new()),
            OverwritePolicy::Always => Box::new(FixedAnswer(Decision::Yes)),
            OverwritePolicy::Never => Box::new(FixedAnswer(Decision::No)),
        }
    }

    fn handle_sync(&mut self, args: SyncArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow!(e))?;
        self.apply_db_args(&args.db)?;
        let forced = match (args.yes, args.no) {
            (true, _) => Some(OverwritePolicy::Always),
            (_, true) => Some(OverwritePolicy::Never),
            _ => None,
        };
        if let Some(policy) = forced {
            self.config = std::mem::take(&mut self.config).with_overwrite(policy);
        }

        let schema = self.load_schema(args.schema.clone())?;
        let selected = select(&schema, &args.only)?;
        let mut db = self.load_database()?;
        let mut confirm = self.confirmation();

        print_info(&format!("Syncing {} struct(s) into {}", selected.len(), self.config.database.display()));

        for entry in selected {
            match sync_one(entry, &mut db, confirm.as_mut()) {
                Ok((built, outcome)) => {
                    let line = format!("{} ({} bytes, {} members): {}", built.name(), built.size(), built.member_count(), outcome);
                    if outcome.is_mutation() {
                        print_success(&line);
                    } else {
                        print_info(&line);
                    }
                }
                Err(e) => {
                    if e.is_user_abort() {
                        print_warning(&format!("{}: {}", entry.name, e));
                    } else {
                        print_error(&format!("{}: {}", entry.name, e));
                    }
                    print_warning(&format!("{} left unchanged", self.config.database.display()));
                    return Err(e.into());
                }
            }
        }

        self.save_database(&db)
    }

    fn handle_check(&mut self, args: CheckArgs) -> anyhow::Result<()> {
        self.apply_db_args(&args.db)?;
        let schema = self.load_schema(args.schema.clone())?;
        let selected = select(&schema, &args.only)?;
        let db = self.load_database()?;

        let mut drifted = 0usize;
        for entry in selected {
            let mut it = BaseStruct::new(&entry.name);
            it.parse_schema(&entry.fields, &db)?;

            match db.find_struct_by_name(it.name()) {
                None => {
                    print_warning(&format!("{}: not present in database", it.name()));
                    drifted += 1;
                }
                Some(sid) => {
                    let report = it.validate(&db, sid)?;
                    if report.is_match() {
                        print_success(&report.to_string());
                    } else {
                        print_warning(&report.to_string());
                        drifted += 1;
                    }
                }
            }
        }

        if drifted > 0 {
            return Err(anyhow!("{} struct(s) do not match the schema", drifted));
        }
        Ok(())
    }

    fn handle_show(&mut self, args: ShowArgs) -> anyhow::Result<()> {
        self.apply_db_args(&args.db)?;
        let db = self.load_database()?;

        let mut shown = 0usize;
        for stored in db.structs() {
            if args.name.as_deref().map_or(false, |n| n != stored.name) {
                continue;
            }
            shown += 1;
            println!("{} {} ({} bytes)", stored.name.cyan().bold(), stored.id, stored.size());
            for member in &stored.members {
                println!(
                    "  0x{:04X} {:<24} {:>4}  {}",
                    member.offset,
                    member.name,
                    member.size,
                    member.type_name.as_deref().unwrap_or("?").dimmed()
                );
            }
        }

        if let (Some(name), 0) = (&args.name, shown) {
            return Err(anyhow!("no struct named '{}' in {}", name, self.config.database.display()));
        }
        Ok(())
    }

    fn handle_declare(&mut self, args: DeclareArgs) -> anyhow::Result<()> {
        self.apply_db_args(&args.db)?;
        let schema = self.load_schema(args.schema.clone())?;

        // Scratch copy so `struct X` references to earlier schema entries resolve.
        let mut scratch = self.load_database()?;
        let mut overwrite = FixedAnswer(Decision::Yes);

        for entry in &schema.structs {
            let built = BaseStruct::build(&entry.name, &entry.fields, &mut scratch, &mut overwrite)?;
            if args.name.as_deref().map_or(true, |n| n == entry.name) {
                println!("{}", built.to_c_declaration());
            }
        }
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn sync_one(
    entry: &StructSchema,
    db: &mut InMemoryDatabase,
    confirm: &mut dyn ConfirmationProvider,
) -> Result<(BaseStruct, Reconciliation), TypelibError> {
    let mut it = BaseStruct::new(&entry.name);
    it.parse_schema(&entry.fields, &*db)?;
    let outcome = it.materialize(db, confirm)?;
    Ok((it, outcome))
}

fn select<'a>(schema: &'a SchemaFile, only: &[String]) -> anyhow::Result<Vec<&'a StructSchema>> {
    if only.is_empty() {
        return Ok(schema.structs.iter().collect());
    }
    only.iter()
        .map(|name| schema.get(name).ok_or_else(|| anyhow!("schema has no struct named '{}'", name)))
        .collect()
}
