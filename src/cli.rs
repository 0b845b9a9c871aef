//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::console_confirm_adapter::ConsoleConfirmAdapter;
use crate::adapters::csv_sheet_adapter::CsvSheetAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store_adapter::JsonStoreAdapter;
use crate::domain::calculation::{CalcInputs, CalcResult, ChargeBasis};
use crate::domain::editor::{self, RouteField};
use crate::domain::error::RatesheetError;
use crate::domain::model_key::ModelKey;
use crate::domain::rate_table::{Client, Profile};
use crate::domain::settings::Settings;
use crate::domain::sheet::{self, ExportMeta};
use crate::domain::workspace::Workspace;
use crate::ports::confirm_port::ConfirmPort;
use crate::ports::sheet_port::SheetPort;

pub const DEFAULT_CATEGORY: &str = "AIR";
pub const DEFAULT_SERVICE_MODE: &str = "DOOR TO DOOR";

#[derive(Parser, Debug)]
#[command(name = "ratesheet", about = "Freight rate tables and charge calculator")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Data file, overriding [storage] data_file
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,
    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage clients
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Show the active client's tables for a model
    Tables {
        #[arg(short, long)]
        model: Option<ModelKey>,
    },
    /// Show every table of every model for a client
    View {
        /// Client id; defaults to the active client
        #[arg(long)]
        client: Option<String>,
    },
    /// Price a shipment against the saved tables
    Calc {
        #[arg(short, long)]
        model: Option<ModelKey>,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        dest: String,
        /// Actual weight in kg
        #[arg(short, long)]
        weight: f64,
        /// Length in cm
        #[arg(long, default_value_t = 0.0)]
        length: f64,
        #[arg(long, default_value_t = 0.0)]
        width: f64,
        #[arg(long, default_value_t = 0.0)]
        height: f64,
        #[arg(long)]
        divisor: Option<f64>,
        #[arg(long, default_value = "actual")]
        basis: ChargeBasis,
    },
    /// Edit the active table of a model and commit the result
    Edit {
        #[arg(short, long)]
        model: Option<ModelKey>,
        #[command(subcommand)]
        action: EditAction,
    },
    /// Export the active table to a CSV sheet
    Export {
        #[arg(short, long)]
        model: Option<ModelKey>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,
        #[arg(long, default_value = DEFAULT_SERVICE_MODE)]
        service_mode: String,
    },
    /// Replace the active table's rows from a CSV sheet
    Import {
        #[arg(short, long)]
        model: Option<ModelKey>,
        input: PathBuf,
    },
    /// Write a client backup
    Backup {
        /// Client id; defaults to the active client
        #[arg(long)]
        client: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a client backup as a new client
    Restore { input: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ClientAction {
    /// List clients; the active one is starred
    List,
    Add { name: String },
    Rename { id: String, name: String },
    Describe { id: String, description: String },
    Delete { id: String },
    Switch { id: String },
}

/// Row and column indices are zero-based, as listed by `tables`.
#[derive(Subcommand, Debug)]
pub enum EditAction {
    AddRow,
    DeleteRow { row: usize },
    AddColumn,
    DeleteColumn { column: usize },
    SetLimit { column: usize, value: f64 },
    /// Set a rate; an empty value clears the cell
    SetRate {
        row: usize,
        column: usize,
        #[arg(default_value = "")]
        value: String,
    },
    SetRoute {
        row: usize,
        #[arg(long, required_unless_present = "dest")]
        origin: Option<String>,
        #[arg(long)]
        dest: Option<String>,
    },
    AddTable { name: String },
    RenameTable { name: String },
    DeleteTable,
    SelectTable { id: String },
}

struct Context {
    settings: Settings,
    workspace: Workspace<JsonStoreAdapter>,
    confirm: ConsoleConfirmAdapter,
}

impl Context {
    fn model(&self, requested: Option<ModelKey>) -> ModelKey {
        requested.unwrap_or(self.settings.default_model)
    }

    fn active_client(&self) -> Result<&Client, RatesheetError> {
        self.workspace
            .active_client()
            .ok_or_else(|| RatesheetError::UnknownClient { id: String::new() })
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = open_context(&cli).and_then(|mut ctx| match cli.command {
        Command::Client { action } => run_client(&mut ctx, action),
        Command::Tables { model } => run_tables(&ctx, model),
        Command::View { client } => run_view(&ctx, client),
        Command::Calc {
            model,
            origin,
            dest,
            weight,
            length,
            width,
            height,
            divisor,
            basis,
        } => {
            let inputs = CalcInputs {
                origin,
                dest,
                length,
                width,
                height,
                volumetric_divisor: divisor.unwrap_or(ctx.settings.volumetric_divisor),
                actual_weight: weight,
                charge_basis: basis,
                ..CalcInputs::default()
            };
            run_calc(&ctx, model, &inputs)
        }
        Command::Edit { model, action } => run_edit(&mut ctx, model, action),
        Command::Export {
            model,
            output,
            category,
            service_mode,
        } => run_export(&ctx, model, output, &category, &service_mode),
        Command::Import { model, input } => run_import(&mut ctx, model, &input),
        Command::Backup { client, output } => run_backup(&ctx, client, output),
        Command::Restore { input } => run_restore(&mut ctx, &input),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RatesheetError> {
    FileConfigAdapter::from_file(path).map_err(|e| RatesheetError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolves settings from the optional config file and the `--data` override.
pub fn resolve_settings(
    config: Option<&Path>,
    data: Option<&Path>,
) -> Result<Settings, RatesheetError> {
    let adapter = match config {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    let mut settings = Settings::from_config(&adapter)?;
    if let Some(data) = data {
        settings.data_file = data.to_path_buf();
    }
    Ok(settings)
}

fn open_context(cli: &Cli) -> Result<Context, RatesheetError> {
    let settings = resolve_settings(cli.config.as_deref(), cli.data.as_deref())?;
    debug!("using data file {}", settings.data_file.display());
    let workspace = Workspace::open(JsonStoreAdapter::new(settings.data_file.clone()))?;
    Ok(Context {
        settings,
        workspace,
        confirm: ConsoleConfirmAdapter::new(cli.yes),
    })
}

fn run_client(ctx: &mut Context, action: ClientAction) -> Result<(), RatesheetError> {
    let confirm = &ctx.confirm;
    let workspace = &mut ctx.workspace;
    match action {
        ClientAction::List => {
            let active = workspace.state().active_client_id.as_deref();
            for (id, client) in &workspace.state().clients {
                let marker = if Some(id.as_str()) == active { '*' } else { ' ' };
                println!("{marker} {id}  {}", client.name);
                if !client.description.is_empty() {
                    println!("    {}", client.description);
                }
            }
        }
        ClientAction::Add { name } => {
            let id = workspace.add_client(&name, confirm)?;
            println!("{id}");
        }
        ClientAction::Rename { id, name } => workspace.rename_client(&id, &name)?,
        ClientAction::Describe { id, description } => {
            workspace.set_description(&id, &description)?
        }
        ClientAction::Delete { id } => {
            let question = format!("Delete client {id} and all of its tables?");
            if !confirm.confirm(&question) {
                eprintln!("Cancelled");
                return Ok(());
            }
            workspace.delete_client(&id, confirm)?;
        }
        ClientAction::Switch { id } => workspace.switch_client(&id, confirm)?,
    }
    Ok(())
}

fn run_tables(ctx: &Context, model: Option<ModelKey>) -> Result<(), RatesheetError> {
    let model = ctx.model(model);
    let client = ctx.active_client()?;
    println!("{} / {} ({})", client.name, model.label(), model.key());

    let Some(bucket) = client.store.bucket(model) else {
        println!("  no tables");
        return Ok(());
    };
    for (id, profile) in &bucket.profiles {
        let marker = if bucket.active_profile_id.as_deref() == Some(id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {id}  {}", profile.name);
    }
    if let Some(profile) = bucket.active_profile() {
        println!();
        print!("{}", render_profile(profile));
        println!();
        println!("Origins:      {}", profile.origins().join(", "));
        println!("Destinations: {}", profile.destinations().join(", "));
    }
    Ok(())
}

fn run_view(ctx: &Context, client: Option<String>) -> Result<(), RatesheetError> {
    let client = match client {
        Some(id) => ctx.workspace.client(&id)?,
        None => ctx.active_client()?,
    };
    print!("{}", render_client(client));
    Ok(())
}

/// Every model section of a client in declaration order, each listing all
/// of its tables with the active one starred.
pub fn render_client(client: &Client) -> String {
    let mut out = format!("{} ({})\n", client.name, client.id);
    for model in ModelKey::ALL {
        out.push_str(&format!("\n== {} ({})\n", model.label(), model.key()));
        let Some(bucket) = client.store.bucket(model).filter(|b| !b.profiles.is_empty()) else {
            out.push_str("  no tables\n");
            continue;
        };
        for (id, profile) in &bucket.profiles {
            let marker = if bucket.active_profile_id.as_deref() == Some(id.as_str()) {
                '*'
            } else {
                ' '
            };
            out.push_str(&format!("\n{marker} {id}  {}\n", profile.name));
            out.push_str(&render_profile(profile));
        }
    }
    out
}

/// Plain text grid of a table: header of bracket labels, then one line per
/// route prefixed with its row index.
pub fn render_profile(profile: &Profile) -> String {
    let mut out = String::from("#\tOrigin\tDestination");
    for i in 0..profile.limits.len() {
        out.push('\t');
        out.push_str(&sheet::bracket_label(&profile.limits, i));
    }
    out.push('\n');
    for (index, route) in profile.rows.iter().enumerate() {
        out.push_str(&format!("{index}\t{}\t{}", route.origin, route.dest));
        for rate in &route.rates {
            out.push('\t');
            if let Some(rate) = rate {
                out.push_str(&rate.to_string());
            } else {
                out.push('-');
            }
        }
        out.push('\n');
    }
    out
}

fn run_calc(
    ctx: &Context,
    model: Option<ModelKey>,
    inputs: &CalcInputs,
) -> Result<(), RatesheetError> {
    let model = ctx.model(model);
    let result = ctx
        .workspace
        .calculate(model, inputs, &ctx.settings.tariff())?;
    print!("{}", render_result(&result, inputs.charge_basis));
    Ok(())
}

pub fn render_result(result: &CalcResult, basis: ChargeBasis) -> String {
    let mut out = format!(
        "Actual weight:     {:.2} kg\nVolumetric weight: {:.2} kg\nCBM:               {:.4}\n",
        result.actual_weight, result.volumetric_weight, result.cbm
    );
    out.push_str(&format!(
        "Chargeable weight: {:.2} kg\n",
        result.chargeable_weight(basis)
    ));
    if let Some(row) = result.matched_route {
        out.push_str(&format!("Route row:         {row}\n"));
    }
    out.push_str(&format!("Total:             {result}\n"));
    out
}

fn run_edit(
    ctx: &mut Context,
    model: Option<ModelKey>,
    action: EditAction,
) -> Result<(), RatesheetError> {
    let model = ctx.model(model);
    let session = ctx.workspace.begin_edit()?;
    match action {
        EditAction::AddRow => session.edit_profile(model, |p| Ok(editor::add_row(p)))?,
        EditAction::DeleteRow { row } => {
            session.edit_profile(model, |p| editor::delete_row(p, row))?
        }
        EditAction::AddColumn => session.edit_profile(model, |p| Ok(editor::add_column(p)))?,
        EditAction::DeleteColumn { column } => {
            session.edit_profile(model, |p| editor::delete_column(p, column))?
        }
        EditAction::SetLimit { column, value } => {
            session.edit_profile(model, |p| editor::set_limit(p, column, value))?
        }
        EditAction::SetRate { row, column, value } => {
            session.edit_profile(model, |p| editor::set_rate(p, row, column, &value))?
        }
        EditAction::SetRoute { row, origin, dest } => session.edit_profile(model, |p| {
            let mut next = p.clone();
            if let Some(origin) = &origin {
                next = editor::set_route_field(&next, row, RouteField::Origin, origin)?;
            }
            if let Some(dest) = &dest {
                next = editor::set_route_field(&next, row, RouteField::Dest, dest)?;
            }
            Ok(next)
        })?,
        EditAction::AddTable { name } => {
            let mut created = None;
            session.edit_bucket(model, |bucket| {
                let (next, id) = editor::add_profile(bucket, &name)?;
                created = Some(id);
                Ok(next)
            })?;
            if let Some(id) = created {
                println!("{id}");
            }
        }
        EditAction::RenameTable { name } => {
            session.edit_bucket(model, |bucket| editor::rename_profile(bucket, &name))?
        }
        EditAction::DeleteTable => session.edit_bucket(model, editor::delete_profile)?,
        EditAction::SelectTable { id } => {
            session.edit_bucket(model, |bucket| editor::select_profile(bucket, &id))?
        }
    }
    ctx.workspace.commit()
}

fn run_export(
    ctx: &Context,
    model: Option<ModelKey>,
    output: Option<PathBuf>,
    category: &str,
    service_mode: &str,
) -> Result<(), RatesheetError> {
    let model = ctx.model(model);
    let client = ctx.active_client()?;
    let profile = client
        .store
        .active_profile(model)
        .ok_or(RatesheetError::NoActiveProfile { model })?;
    let meta = ExportMeta {
        client: client.name.clone(),
        table: profile.name.clone(),
        category: category.to_string(),
        service_mode: service_mode.to_string(),
        exported_at: Local::now().naive_local(),
    };
    let path = output.unwrap_or_else(|| default_export_name(&meta));
    CsvSheetAdapter::new().write_sheet(&path, &sheet::export_profile(&meta, profile))?;
    eprintln!("Exported {} rows to {}", profile.rows.len(), path.display());
    Ok(())
}

pub fn default_export_name(meta: &ExportMeta) -> PathBuf {
    PathBuf::from(format!(
        "{}_{}_{}_{}.csv",
        meta.client, meta.category, meta.service_mode, meta.table
    ))
}

fn run_import(
    ctx: &mut Context,
    model: Option<ModelKey>,
    input: &Path,
) -> Result<(), RatesheetError> {
    let model = ctx.model(model);
    let grid = CsvSheetAdapter::new().read_sheet(input)?;
    let session = ctx.workspace.begin_edit()?;
    session.import_sheet(model, &grid, &ctx.confirm)?;
    ctx.workspace.commit()?;
    eprintln!("Imported {}", input.display());
    Ok(())
}

fn run_backup(
    ctx: &Context,
    client: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), RatesheetError> {
    let client = match client {
        Some(id) => ctx.workspace.client(&id)?,
        None => ctx.active_client()?,
    };
    let json = ctx.workspace.backup_client(&client.id)?;
    let path = output.unwrap_or_else(|| default_backup_name(&client.name));
    fs::write(&path, json)?;
    eprintln!("Backup of {} written to {}", client.name, path.display());
    Ok(())
}

pub fn default_backup_name(client_name: &str) -> PathBuf {
    PathBuf::from(format!("backup_{}.json", client_name.replace(' ', "_")))
}

fn run_restore(ctx: &mut Context, input: &Path) -> Result<(), RatesheetError> {
    let json = fs::read_to_string(input)?;
    match ctx.workspace.restore_backup(&json, &ctx.confirm)? {
        Some(id) => println!("{id}"),
        None => eprintln!("Restore cancelled"),
    }
    Ok(())
}
