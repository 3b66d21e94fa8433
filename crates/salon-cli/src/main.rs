//! `salon` CLI — query availability and admit bookings against a salon data file.
//!
//! ## Usage
//!
//! ```sh
//! # Pure slot grid for one day, no data file involved
//! salon slots --date 2024-06-04 --open 09:00 --close 12:00 --duration 30 \
//!     --booked 2024-06-04T10:00:00Z/2024-06-04T10:30:00Z
//!
//! # Availability for a service, every eligible stylist
//! salon --data salon.json availability --service 1 --date 2024-06-04
//!
//! # Book a slot (re-checked against the file's current bookings)
//! salon book --service 1 --staff 2 --start 2024-06-04T09:00:00Z \
//!     --name "Alice Example" --email alice@example.com --phone "+49 30 123456"
//!
//! # Administration
//! salon hours set 6 10:00 14:00
//! salon bookings --day 2024-06-04
//! salon bookings cancel 3
//! ```
//!
//! Every flag under "Configuration" can also come from the environment or a
//! `.env` file. Set `RUST_LOG` to adjust log output (stderr).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use fs2::FileExt;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use salon_engine::booking::DEFAULT_SALON_ADDRESS;
use salon_engine::memory::BookingPatch;
use salon_engine::notify::TracingNotifier;
use salon_engine::slots::{DEFAULT_BUFFER_MINUTES, DEFAULT_INTERVAL_MINUTES};
use salon_engine::{
    generate_slots, AvailabilityQuery, BookedInterval, BookingDesk, BookingId, BookingRequest,
    BookingStatus, Customer, InMemorySalon, OpeningWindow, SalonError, SalonSnapshot, ServiceId,
    SlotPolicy, StaffId,
};

#[derive(Parser)]
#[command(
    name = "salon",
    version,
    about = "Salon appointment availability and booking"
)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(next_help_heading = "Configuration")]
struct Config {
    /// Salon data file (services, staff, opening hours, bookings)
    #[arg(long, global = true, env = "SALON_DATA", default_value = "salon.json")]
    data: PathBuf,

    /// Minutes kept free around every booking
    #[arg(long, global = true, env = "SALON_BUFFER_MINUTES", default_value_t = DEFAULT_BUFFER_MINUTES)]
    buffer_minutes: u32,

    /// Spacing of offered start times in minutes
    #[arg(long, global = true, env = "SALON_INTERVAL_MINUTES", default_value_t = DEFAULT_INTERVAL_MINUTES)]
    interval_minutes: u32,

    /// Sender and inbox for booking notifications
    #[arg(long, global = true, env = "SALON_EMAIL_FROM", default_value = DEFAULT_SALON_ADDRESS)]
    email_from: String,
}

impl Config {
    fn policy(&self) -> Result<SlotPolicy> {
        SlotPolicy::new(self.buffer_minutes, self.interval_minutes)
            .context("Invalid slot policy")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate slots for one day from explicit inputs
    Slots {
        #[arg(long)]
        date: NaiveDate,
        /// Opening time, HH:MM (omit for a closed day)
        #[arg(long, requires = "close")]
        open: Option<String>,
        /// Closing time, HH:MM (24:00 for midnight)
        #[arg(long, requires = "open")]
        close: Option<String>,
        /// Service duration in minutes
        #[arg(long)]
        duration: u32,
        /// Existing booking as START/END (RFC 3339), repeatable
        #[arg(long, value_parser = parse_booked)]
        booked: Vec<BookedInterval>,
    },
    /// Show bookable slots for a service
    Availability {
        #[arg(long)]
        service: u32,
        /// Restrict to one staff member
        #[arg(long)]
        staff: Option<u32>,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Book a slot for a customer
    Book {
        #[arg(long)]
        service: u32,
        #[arg(long)]
        staff: u32,
        /// Slot start (RFC 3339), must match an offered slot exactly
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List services
    Services {
        /// Include inactive services
        #[arg(long)]
        all: bool,
    },
    /// List staff members
    Staff,
    /// List or change opening hours
    Hours {
        #[command(subcommand)]
        action: Option<HoursAction>,
    },
    /// List or change bookings
    Bookings {
        /// Only bookings starting on this day
        #[arg(long)]
        day: Option<NaiveDate>,
        #[command(subcommand)]
        action: Option<BookingsAction>,
    },
}

#[derive(Subcommand)]
enum HoursAction {
    /// Set opening hours for a weekday (0 = Sunday)
    Set {
        weekday: u8,
        open: String,
        /// HH:MM, or 24:00 to stay open until midnight
        close: String,
    },
    /// Close a weekday
    Remove { weekday: u8 },
}

#[derive(Subcommand)]
enum BookingsAction {
    /// Mark a booking as cancelled, freeing its time
    Cancel { id: u32 },
    /// Change a booking's status (confirmed, completed, cancelled, no_show)
    Status { id: u32, status: BookingStatus },
    /// Delete a booking
    Delete { id: u32 },
}

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "salon=info,salon_engine=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config;

    match cli.command {
        Commands::Slots {
            date,
            open,
            close,
            duration,
            booked,
        } => {
            let opening = match (open, close) {
                (Some(open), Some(close)) => Some(opening_for(date, &open, &close)?),
                _ => None,
            };
            let slots = generate_slots(date, duration, opening.as_ref(), &booked, config.policy()?);
            print_json(&slots)
        }
        Commands::Availability {
            service,
            staff,
            date,
        } => {
            let desk = open_desk(&config)?;
            let query = AvailabilityQuery {
                service_id: ServiceId(service),
                staff_id: staff.map(StaffId),
                date,
            };
            let availability = desk
                .availability(&query)
                .context("Failed to compute availability")?;
            print_json(&availability)
        }
        Commands::Book {
            service,
            staff,
            start,
            name,
            email,
            phone,
            notes,
        } => {
            let _lock = lock_data(&config.data)?;
            let desk = open_desk(&config)?;
            let booking = desk
                .book(BookingRequest {
                    service_id: ServiceId(service),
                    staff_id: StaffId(staff),
                    starts_at: start,
                    customer: Customer { name, email, phone },
                    notes,
                })
                .context("Booking was not admitted")?;
            save(&config.data, desk.store())?;
            print_json(&booking)
        }
        Commands::Services { all } => print_json(&load(&config.data)?.list_services(all)?),
        Commands::Staff => print_json(&load(&config.data)?.list_staff()?),
        Commands::Hours { action } => {
            let Some(action) = action else {
                return print_json(&load(&config.data)?.list_opening_hours()?);
            };
            let _lock = lock_data(&config.data)?;
            let salon = load(&config.data)?;
            match action {
                HoursAction::Set {
                    weekday,
                    open,
                    close,
                } => {
                    let window = OpeningWindow::parse(weekday, &open, &close)
                        .context("Invalid opening hours")?;
                    salon.upsert_opening_hours(window)?;
                }
                HoursAction::Remove { weekday } => salon.remove_opening_hours(weekday)?,
            }
            save(&config.data, &salon)?;
            print_json(&salon.list_opening_hours()?)
        }
        Commands::Bookings { day, action } => {
            let Some(action) = action else {
                return print_json(&load(&config.data)?.list_bookings(day)?);
            };
            let _lock = lock_data(&config.data)?;
            let salon = load(&config.data)?;
            let changed = match action {
                BookingsAction::Cancel { id } => {
                    Some(set_status(&salon, id, BookingStatus::Cancelled)?)
                }
                BookingsAction::Status { id, status } => Some(set_status(&salon, id, status)?),
                BookingsAction::Delete { id } => {
                    salon.delete_booking(BookingId(id))?;
                    None
                }
            };
            save(&config.data, &salon)?;
            match changed {
                Some(booking) => print_json(&booking),
                None => Ok(()),
            }
        }
    }
}

/// Build a window for `date`'s weekday from `HH:MM` strings.
fn opening_for(date: NaiveDate, open: &str, close: &str) -> Result<OpeningWindow> {
    OpeningWindow::parse(salon_engine::window::weekday_index(date), open, close)
        .context("Invalid opening hours")
}

fn parse_booked(raw: &str) -> std::result::Result<BookedInterval, String> {
    let (start, end) = raw
        .split_once('/')
        .ok_or_else(|| format!("expected START/END, got '{}'", raw))?;
    let starts_at: DateTime<Utc> = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start '{}': {}", start, e))?;
    let ends_at: DateTime<Utc> = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end '{}': {}", end, e))?;
    Ok(BookedInterval { starts_at, ends_at })
}

fn set_status(
    salon: &InMemorySalon,
    id: u32,
    status: BookingStatus,
) -> Result<salon_engine::Booking> {
    let booking = salon.update_booking(
        BookingId(id),
        BookingPatch {
            status: Some(status),
            notes: None,
        },
    )?;
    info!(booking_id = id, ?status, "booking status changed");
    Ok(booking)
}

fn open_desk(config: &Config) -> Result<BookingDesk<InMemorySalon>> {
    let salon = load(&config.data)?;
    Ok(BookingDesk::new(Arc::new(salon))
        .with_policy(config.policy()?)
        .with_notifier(Arc::new(TracingNotifier), config.email_from.clone()))
}

/// Load the data file; a missing file is an empty salon.
fn load(path: &Path) -> Result<InMemorySalon> {
    if !path.exists() {
        debug!(path = %path.display(), "data file missing, starting empty");
        return Ok(InMemorySalon::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    let snapshot = SalonSnapshot::from_json(&json)
        .with_context(|| format!("Failed to parse data file: {}", path.display()))?;
    InMemorySalon::from_snapshot(snapshot)
        .with_context(|| format!("Inconsistent data file: {}", path.display()))
}

/// Replace the data file atomically: readers see the old or the new
/// contents, never a partial write.
fn save(path: &Path, salon: &InMemorySalon) -> Result<()> {
    let json = salon.snapshot()?.to_json_pretty()?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("Failed to write data file: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace data file: {}", path.display()))?;
    Ok(())
}

/// Exclusive advisory lock on `<data>.lock`, held from load to save by every
/// command that writes. Released when the returned file is dropped.
///
/// The lock lives in a sidecar because `save` swaps the data file's inode.
fn lock_data(path: &Path) -> Result<File> {
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    let lock_path = PathBuf::from(lock_path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock data file: {}", path.display()))?;
    debug!(path = %lock_path.display(), "data file locked");
    Ok(file)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Distinct exit codes so scripts can tell a lost slot from a typo.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SalonError>() {
        Some(SalonError::Validation(_)) => 2,
        Some(SalonError::NotFound(_)) => 3,
        Some(SalonError::InvalidSelection { .. }) => 4,
        Some(SalonError::Conflict { .. }) => 5,
        _ => 1,
    }
}
