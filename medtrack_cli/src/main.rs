use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use medtrack_core::export::{export_document, share, write_history_csv};
use medtrack_core::report::{render_history_report, render_medication_report};
use medtrack_core::screens::MedicationForm;
use medtrack_core::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication schedule and dose tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a medication
    Add {
        #[arg(long)]
        name: String,

        /// Dosage, e.g. 250
        #[arg(long)]
        amount: String,

        /// Scheduled time (HH:mm), repeatable
        #[arg(long = "time")]
        times: Vec<String>,

        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Calendar colour (defaults to the configured palette colour)
        #[arg(long)]
        color: Option<String>,
    },

    /// Edit a medication; omitted fields keep their value
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        /// Replaces all scheduled times when given, repeatable
        #[arg(long = "time")]
        times: Vec<String>,

        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a medication (its dose history is kept)
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List all medications
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show medications and doses for a day
    Today {
        /// Day to show instead of today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },

    /// Mark a scheduled time as taken
    Take {
        medication_id: i64,

        /// Scheduled time (HH:mm)
        time: String,

        /// Day to record instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove a dose entry
    Untake { entry_id: i64 },

    /// Change the status of a dose entry
    SetStatus { entry_id: i64, status: String },

    /// Show calendar markings
    Calendar {
        /// Selected day instead of today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Show the period picker of one medication instead
        #[arg(long, conflicts_with = "date")]
        medication: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Export a printable report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,

        /// Output file (defaults to <data-dir>/reports/)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Open the report with the default application
        #[arg(long)]
        open: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    /// Every medication
    Meds,
    /// Every taken dose, newest first
    History,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Html,
    Csv,
}

fn main() -> ExitCode {
    // Initialize logging
    medtrack_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_user_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let data_dir = config.data.data_dir.clone();
    tracing::debug!("Using data directory {:?}", data_dir);

    let store = SqliteStore::open(&config.data.database_path())?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Add {
            name,
            amount,
            times,
            from,
            to,
            color,
        } => cmd_add(&store, &config, name, amount, &times, from, to, color),
        Commands::Edit {
            id,
            name,
            amount,
            times,
            from,
            to,
            color,
        } => cmd_edit(&store, &config, id, name, amount, &times, from.zip(to), color),
        Commands::Delete { id, yes } => cmd_delete(&store, &config, id, yes),
        Commands::List { json } => cmd_list(&store, &config, json),
        Commands::Today { date, json } => cmd_today(&store, date.unwrap_or(today), json),
        Commands::Take {
            medication_id,
            time,
            date,
        } => cmd_take(&store, date.unwrap_or(today), medication_id, &time),
        Commands::Untake { entry_id } => cmd_untake(&store, today, entry_id),
        Commands::SetStatus { entry_id, status } => {
            cmd_set_status(&store, today, entry_id, &status)
        }
        Commands::Calendar {
            date,
            medication,
            json,
        } => match medication {
            Some(id) => cmd_period_picker(&store, &config, id, json),
            None => cmd_calendar(&store, date.unwrap_or(today), json),
        },
        Commands::Report {
            kind,
            format,
            out,
            open,
        } => cmd_report(&store, &config, &data_dir, kind, format, out, open),
    }
}

/// Add whole `HH:mm` arguments to a form
///
/// Arguments are complete values, not keystrokes, so the input mask is not
/// applied and anything but an exact `HH:mm` is rejected as typed.
fn enter_times(form: &mut MedicationForm, times: &[String]) -> Result<()> {
    for raw in times {
        form.time_entry = raw.clone();
        form.add_time()?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_add(
    store: &SqliteStore,
    config: &Config,
    name: String,
    amount: String,
    times: &[String],
    from: NaiveDate,
    to: NaiveDate,
    color: Option<String>,
) -> Result<()> {
    let mut screen = MedicationsScreen::mount(store, &config.palette.default_color)?;
    screen.start_create();

    if let Some(form) = screen.form_mut() {
        form.name = name;
        form.amount = amount;
        enter_times(form, times)?;
        form.pick_date(from);
        form.pick_date(to);
        if let Some(color) = color {
            form.color = color;
        }
    }

    let saved = screen.save()?;
    println!("✓ Added medication #{} {}", saved.id, saved.name);
    println!("  Period: {}", saved.period);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_edit(
    store: &SqliteStore,
    config: &Config,
    id: i64,
    name: Option<String>,
    amount: Option<String>,
    times: &[String],
    period: Option<(NaiveDate, NaiveDate)>,
    color: Option<String>,
) -> Result<()> {
    let mut screen = MedicationsScreen::mount(store, &config.palette.default_color)?;
    screen.start_edit(id)?;

    if let Some(form) = screen.form_mut() {
        if let Some(name) = name {
            form.name = name;
        }
        if let Some(amount) = amount {
            form.amount = amount;
        }
        if !times.is_empty() {
            form.times.clear();
            enter_times(form, times)?;
        }
        if let Some((from, to)) = period {
            form.pick_date(from);
            form.pick_date(to);
        }
        if let Some(color) = color {
            form.color = color;
        }
    }

    let saved = screen.save()?;
    println!("✓ Updated medication #{} {}", saved.id, saved.name);
    Ok(())
}

fn cmd_delete(store: &SqliteStore, config: &Config, id: i64, yes: bool) -> Result<()> {
    let mut screen = MedicationsScreen::mount(store, &config.palette.default_color)?;
    screen.request_delete(id)?;

    let name = screen
        .medications()
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.name.clone())
        .unwrap_or_default();

    if !yes && !confirm(&format!("Delete #{} {}? Are you sure?", id, name))? {
        screen.cancel();
        println!("Cancelled.");
        return Ok(());
    }

    screen.confirm_delete()?;
    println!("✓ Deleted medication #{} {}", id, name);
    Ok(())
}

fn cmd_list(store: &SqliteStore, config: &Config, json: bool) -> Result<()> {
    let screen = MedicationsScreen::mount(store, &config.palette.default_color)?;
    let medications = screen.medications();

    if json {
        println!("{}", serde_json::to_string_pretty(medications)?);
        return Ok(());
    }

    if medications.is_empty() {
        println!("No medications found.");
        return Ok(());
    }

    for med in medications {
        display_medication(med);
        if med.date_range().is_err() {
            println!("    (period is malformed; never active)");
        }
    }
    Ok(())
}

fn cmd_today(store: &SqliteStore, date: NaiveDate, json: bool) -> Result<()> {
    let screen = TodayScreen::mount(store, date)?;
    let active = screen.active_medications();
    let checklist = screen.checklist();

    if json {
        let value = serde_json::json!({
            "date": date,
            "medications": active,
            "checklist": checklist,
            "entries": screen.entries(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    report_warnings(&screen.marking_map());

    println!("Medications on {}", date);
    if active.is_empty() {
        println!("  No medications for selected date.");
        return Ok(());
    }

    for med in active {
        println!();
        println!("  #{} {}  (Amount: {} mg)", med.id, med.name, med.amount);
        for slot in checklist.iter().filter(|s| s.medication_id == med.id) {
            match slot.taken_by {
                Some(entry_id) => println!("    [x] {}  entry {}", slot.time, entry_id),
                None => println!("    [ ] {}", slot.time),
            }
        }
    }

    let others: Vec<_> = screen
        .entries()
        .iter()
        .filter(|e| !checklist.iter().any(|s| s.taken_by == Some(e.id)))
        .collect();
    if !others.is_empty() {
        println!();
        println!("  Other entries:");
        for entry in others {
            println!(
                "    entry {}: medication #{} {} - {}",
                entry.id, entry.medication_id, entry.time_taken, entry.status
            );
        }
    }
    Ok(())
}

fn cmd_take(store: &SqliteStore, date: NaiveDate, medication_id: i64, time: &str) -> Result<()> {
    let time: TimeOfDay = time.parse()?;
    let mut screen = TodayScreen::mount(store, date)?;
    let name = screen.open_medication(medication_id)?.name.clone();
    let event = screen.mark_taken(time)?;

    println!(
        "✓ Marked {} {} as taken on {} (entry {})",
        name, event.time_taken, event.date, event.id
    );
    Ok(())
}

fn cmd_untake(store: &SqliteStore, today: NaiveDate, entry_id: i64) -> Result<()> {
    let mut screen = TodayScreen::mount(store, today)?;
    if !screen.delete_entry(entry_id)? {
        return Err(Error::NotFound {
            entity: "dose entry",
            id: entry_id,
        });
    }
    println!("✓ Removed dose entry {}", entry_id);
    Ok(())
}

fn cmd_set_status(store: &SqliteStore, today: NaiveDate, entry_id: i64, status: &str) -> Result<()> {
    let status: DoseStatus = status
        .parse()
        .unwrap_or_else(|never: std::convert::Infallible| match never {});
    let mut screen = TodayScreen::mount(store, today)?;
    screen.update_entry_status(entry_id, &status)?;
    println!("✓ Dose entry {} is now '{}'", entry_id, status);
    Ok(())
}

fn cmd_calendar(store: &SqliteStore, date: NaiveDate, json: bool) -> Result<()> {
    let screen = TodayScreen::mount(store, date)?;
    let map = screen.marking_map();

    if json {
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    report_warnings(&map);

    for (day, marking) in &map.days {
        let dots: Vec<String> = marking
            .dots
            .iter()
            .map(|dot| format!("●#{}({})", dot.medication_id, dot.color))
            .collect();
        let selected = if marking.selected { "  <- selected" } else { "" };
        println!("{}  {}{}", day, dots.join(" "), selected);
    }
    Ok(())
}

fn cmd_period_picker(store: &SqliteStore, config: &Config, id: i64, json: bool) -> Result<()> {
    let mut screen = MedicationsScreen::mount(store, &config.palette.default_color)?;
    screen.start_edit(id)?;
    let marks = screen
        .form_mut()
        .map(|form| form.period_marking())
        .unwrap_or_default();
    screen.cancel();

    if json {
        println!("{}", serde_json::to_string_pretty(&marks)?);
        return Ok(());
    }

    if marks.is_empty() {
        println!("No period selected for medication #{}.", id);
        return Ok(());
    }

    for (day, mark) in &marks {
        let ends = match (mark.starting_day, mark.ending_day) {
            (true, true) => "  start, end",
            (true, false) => "  start",
            (false, true) => "  end",
            (false, false) => "",
        };
        println!("{}  ■({}){}", day, mark.color, ends);
    }
    Ok(())
}

fn cmd_report(
    store: &SqliteStore,
    config: &Config,
    data_dir: &std::path::Path,
    kind: ReportKind,
    format: ReportFormat,
    out: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let base_name = match kind {
        ReportKind::Meds => "medication_report",
        ReportKind::History => "taken_medication_report",
    };
    let extension = match format {
        ReportFormat::Html => "html",
        ReportFormat::Csv => "csv",
    };
    let path =
        out.unwrap_or_else(|| data_dir.join("reports").join(format!("{}.{}", base_name, extension)));

    match (kind, format) {
        (ReportKind::Meds, ReportFormat::Html) => {
            let medications = store.list_medications()?;
            let html = render_medication_report(&medications, &config.report);
            export_document(&html, &path)?;
            println!("✓ Wrote medication report ({} rows)", medications.len());
        }
        (ReportKind::History, ReportFormat::Html) => {
            let rows = store.list_taken_history()?;
            let html = render_history_report(&rows, &config.report);
            export_document(&html, &path)?;
            println!("✓ Wrote taken medication report ({} rows)", rows.len());
        }
        (ReportKind::History, ReportFormat::Csv) => {
            let rows = store.list_taken_history()?;
            let count = write_history_csv(&rows, &path)?;
            println!("✓ Wrote taken medication history ({} rows)", count);
        }
        (ReportKind::Meds, ReportFormat::Csv) => {
            return Err(Error::Validation(
                "CSV export is only available for the history report".into(),
            ));
        }
    }
    println!("  File: {}", path.display());

    if open {
        share(&path)?;
    }
    Ok(())
}

fn display_medication(med: &Medication) {
    println!("#{}  {}", med.id, med.name);
    println!("    Amount: {} mg", med.amount);
    println!("    Times:  {}", medtrack_core::time::encode_times(&med.times));
    println!("    Period: {}", med.period);
    println!("    Color:  {}", med.color);
}

fn report_warnings(map: &MarkingMap) {
    for warning in &map.warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
