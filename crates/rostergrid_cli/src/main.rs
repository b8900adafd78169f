//! Operator CLI for the RosterGrid availability core.
//!
//! # Responsibility
//! - Load config, start logging and open the availability database.
//! - Expose week views, availability writes and account creation for local
//!   operation and smoke checks.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use log::info;
use rostergrid_core::api::{self, AvailabilityBody, CreateUserBody, WeekQuery};
use rostergrid_core::calendar::grid::WeekGrid;
use rostergrid_core::{
    open_db, week_window, AvailabilityService, CoreConfig, Identity, NewUser, PreferenceStore,
    Role, SlotSelection, SqliteIntervalRepository, SqliteUserRepository, StaticIdentityProvider,
    SystemClock, UserId, UserRepository, UserService, ViewerContext, WeekWindow,
};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "rostergrid.toml";
const CELL_WIDTH: usize = 12;

/// RosterGrid - weekly staff availability
#[derive(Parser)]
#[command(name = "rostergrid")]
#[command(about = "RosterGrid - weekly staff availability")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage info
    Ping,
    /// Show the week grid
    Week {
        /// Any date inside the week (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Weeks to move from `date` (negative goes back)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
        /// Viewer user id; loads their time format and marks their cells
        #[arg(long)]
        viewer: Option<UserId>,
        /// Print the raw `{ blocks }` response instead of the grid
        #[arg(long)]
        json: bool,
    },
    /// Mark `[start, end)` available, replacing overlapping blocks
    Set {
        #[arg(long)]
        as_user: UserId,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Remove blocks touching `[start, end)`
    Clear {
        #[arg(long)]
        as_user: UserId,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Book or clear starting from one grid cell
    Slot {
        #[arg(long)]
        as_user: UserId,
        /// Cell start, e.g. 2024-06-10T09:00
        #[arg(long)]
        cell: String,
        /// 0 same day, 1 next day, 2 in two days
        #[arg(long, default_value_t = 0)]
        end_day: u32,
        /// End hour 0-23 (defaults to the following hour)
        #[arg(long)]
        end_hour: Option<u32>,
        /// Clear the one-hour cell instead of booking
        #[arg(long)]
        clear: bool,
    },
    /// Create an account (admin only)
    CreateUser {
        #[arg(long)]
        as_user: UserId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// `ADMIN` for an admin account
        #[arg(long)]
        role: Option<String>,
    },
    /// Create the first admin account in an empty database
    BootstrapAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Show or toggle a viewer's 12h/24h preference
    TimeFormat {
        #[arg(long)]
        viewer: UserId,
        #[arg(long)]
        toggle: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Ping = cli.command {
        println!("rostergrid_core ping={}", rostergrid_core::ping());
        println!("rostergrid_core version={}", rostergrid_core::core_version());
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = CoreConfig::load(&config_path)
        .with_context(|| format!("loading config `{}`", config_path.display()))?;
    rostergrid_core::init_from_config(&config.logging).map_err(anyhow::Error::msg)?;

    let prefs = PreferenceStore::new(&config.preferences.path);
    let conn = open_db(&config.database.path)
        .with_context(|| format!("opening `{}`", config.database.path.display()))?;

    run(cli.command, &conn, &prefs)
}

fn run(command: Commands, conn: &Connection, prefs: &PreferenceStore) -> Result<()> {
    let users = SqliteUserRepository::try_new(conn)?;
    let availability = AvailabilityService::new(
        SqliteIntervalRepository::try_new(conn)?,
        SqliteUserRepository::try_new(conn)?,
        SystemClock,
    );

    match command {
        Commands::Ping => Ok(()),
        Commands::Week {
            date,
            offset,
            viewer,
            json,
        } => {
            let window = shift_week(resolve_week(date, &availability)?, offset)
                .with_context(|| format!("week offset {offset} runs past the calendar"))?;
            if json {
                let query = WeekQuery {
                    week_start: Some(window.day(0).format("%Y-%m-%d").to_string()),
                };
                return print_response(api::respond(api::get_availability(&availability, &query)));
            }

            let viewer_ctx = ViewerContext {
                viewer_id: viewer,
                time_format: viewer
                    .map(|id| prefs.load_time_format(id))
                    .unwrap_or_default(),
            };
            let intervals = availability.list_week(window)?;
            let grid = WeekGrid::project(window, &intervals, &viewer_ctx, availability.now());
            print!("{}", render_week(&grid));
            Ok(())
        }
        Commands::Set {
            as_user,
            start,
            end,
        } => {
            let caller = caller_identity(&users, as_user)?;
            let body = AvailabilityBody {
                start: Some(start),
                end: Some(end),
            };
            print_response(api::respond(api::post_availability(
                &availability,
                &caller,
                &body,
            )))
        }
        Commands::Clear {
            as_user,
            start,
            end,
        } => {
            let caller = caller_identity(&users, as_user)?;
            let body = AvailabilityBody {
                start: Some(start),
                end: Some(end),
            };
            print_response(api::respond(api::delete_availability(
                &availability,
                &caller,
                &body,
            )))
        }
        Commands::Slot {
            as_user,
            cell,
            end_day,
            end_hour,
            clear,
        } => {
            let caller = caller_identity(&users, as_user)?;
            let Some(cell_start) = api::parse_instant(&cell) else {
                bail!("invalid cell start `{cell}`");
            };
            let mut selection = SlotSelection::new(cell_start).with_end_day_offset(end_day);
            if let Some(hour) = end_hour {
                selection = selection.with_end_hour(hour);
            }

            if clear {
                let range = selection
                    .clear_range()
                    .context("cell hour runs past the calendar")?;
                let removed = availability.clear_for_caller(&caller, range.start(), range.end())?;
                println!("removed {removed} block(s)");
            } else {
                let range = selection.range()?;
                let created = availability.set_for_caller(&caller, range.start(), range.end())?;
                println!("{}", serde_json::to_string(&created)?);
            }
            Ok(())
        }
        Commands::CreateUser {
            as_user,
            name,
            email,
            role,
        } => {
            let caller = caller_identity(&users, as_user)?;
            let body = CreateUserBody {
                name: Some(name),
                email: Some(email),
                role,
            };
            print_response(api::respond(api::create_user(
                &UserService::new(users),
                &caller,
                &body,
            )))
        }
        Commands::BootstrapAdmin { name, email } => {
            let service = UserService::new(users);
            if !service.list_users()?.is_empty() {
                bail!("database already has accounts; use create-user as an admin");
            }
            let admin = service.create_bootstrap_user(&NewUser {
                name,
                email,
                role: Role::Admin,
            })?;
            info!(
                "event=bootstrap_admin module=cli status=ok user_id={}",
                admin.id
            );
            println!("{}", serde_json::to_string(&admin)?);
            Ok(())
        }
        Commands::TimeFormat { viewer, toggle } => {
            let format = if toggle {
                prefs.toggle_time_format(viewer)?
            } else {
                prefs.load_time_format(viewer)
            };
            println!("viewer={} timeFormat={}", viewer, format.as_pref_str());
            Ok(())
        }
    }
}

fn resolve_week<I, U, C>(
    date: Option<NaiveDate>,
    service: &AvailabilityService<I, U, C>,
) -> Result<WeekWindow>
where
    I: rostergrid_core::IntervalRepository,
    U: rostergrid_core::UserDirectory,
    C: rostergrid_core::Clock,
{
    let reference = match date {
        Some(date) => date.and_time(NaiveTime::MIN),
        None => service.now(),
    };
    week_window(reference).with_context(|| format!("no full week contains {reference}"))
}

/// Moves `offset` whole weeks; `None` when the target week leaves the
/// calendar.
fn shift_week(window: WeekWindow, offset: i32) -> Option<WeekWindow> {
    let shift = Duration::try_weeks(i64::from(offset))?;
    week_window(window.start().checked_add_signed(shift)?)
}

fn caller_identity(users: &SqliteUserRepository<'_>, user_id: UserId) -> Result<StaticIdentityProvider> {
    let Some(user) = users.get_user(user_id)? else {
        bail!("unknown user id {user_id}");
    };
    Ok(StaticIdentityProvider(Some(Identity::from(&user))))
}

fn print_response<T: Serialize>((status, body): (u16, T)) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&body)?);
    if status >= 400 {
        bail!("request failed with status {status}");
    }
    Ok(())
}

fn render_week(grid: &WeekGrid) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", grid.title));
    out.push_str(&format!("Now: {}\n\n", grid.current_time));

    out.push_str(&format!("{:<8}", ""));
    for header in &grid.headers {
        let label = if header.is_today {
            format!("{}*", header.label)
        } else {
            header.label.clone()
        };
        out.push_str(&format!("{label:<CELL_WIDTH$}"));
    }
    out.push('\n');

    for row in &grid.rows {
        let marker = if row.is_now_hour { '>' } else { ' ' };
        out.push_str(&format!("{marker}{:<7}", row.label));
        for cell in &row.cells {
            let owners: Vec<String> = cell
                .occupants
                .iter()
                .map(|occupant| {
                    if occupant.is_viewer {
                        format!("{}!", occupant.owner_id)
                    } else {
                        occupant.owner_id.to_string()
                    }
                })
                .collect();
            let mut text = if owners.is_empty() {
                ".".to_string()
            } else {
                owners.join(",")
            };
            if cell.is_now {
                text = format!("[{text}]");
            }
            out.push_str(&format!("{text:<CELL_WIDTH$}"));
        }
        out.push('\n');
    }

    out.push('\n');
    for entry in &grid.legend {
        out.push_str(&format!(
            "  {} {} ({})\n",
            entry.color, entry.display_name, entry.owner_id
        ));
    }
    out.push_str(&format!("{}\n", grid.available_now_summary));
    out
}

#[cfg(test)]
mod tests {
    use super::{render_week, shift_week};
    use chrono::NaiveDate;
    use rostergrid_core::calendar::grid::WeekGrid;
    use rostergrid_core::{week_window, ViewerContext, WeekWindow};

    fn window() -> WeekWindow {
        NaiveDate::from_ymd_opt(2024, 6, 12)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .and_then(week_window)
            .expect("fixture week should be representable")
    }

    #[test]
    fn shift_week_moves_whole_weeks() {
        let base = window();
        assert_eq!(shift_week(base, 0), Some(base));
        assert_eq!(shift_week(base, 1), base.next());
        assert_eq!(
            shift_week(base, -2),
            base.previous().and_then(|week| week.previous())
        );
    }

    #[test]
    fn shift_week_stops_at_the_calendar_edge() {
        assert_eq!(shift_week(window(), i32::MAX), None);
        assert_eq!(shift_week(window(), i32::MIN), None);
    }

    #[test]
    fn empty_week_renders_summary() {
        let base = window();
        let now = base.start();
        let grid = WeekGrid::project(base, &[], &ViewerContext::default(), now);
        let text = render_week(&grid);
        assert!(text.starts_with("Week of Jun 9"));
        assert!(text.contains("No one is marked available right now."));
        assert!(text.contains("[.]"));
        assert_eq!(text.lines().count(), 30);
    }
}
