//! Command-line boundary for the slotbook engine.
//!
//! Opens a [`DirStorage`]-backed studio, translates arguments into
//! engine operations, and prints plain-text results. All scheduling
//! decisions live in the library; this binary only gates commands by
//! role and formats output.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use slotbook::{
    AppointmentId, AppointmentPatch, AppointmentStatus, BookingRequest, ClientId, DirStorage,
    MasterId, NotificationId, Role, ServiceId, Studio, StudioConfig, SystemClock, TransactionKind,
    UserId, UuidSource,
};

#[derive(Parser)]
#[command(name = "slotbook", version, about = "Booking engine for small service studios")]
struct Cli {
    /// Directory holding the studio's collection files.
    #[arg(long, default_value = ".slotbook")]
    data_dir: PathBuf,

    /// Caller role: `admin`, `guest`, or `master:<master-id>`.
    #[arg(long, default_value = "admin")]
    role: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the store, seeding the default catalog on a cold start.
    Seed,
    /// List masters.
    Masters,
    /// List the service catalog.
    Services,
    /// Book a slot.
    Book {
        #[arg(long)]
        client: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        master: String,
        #[arg(long)]
        date: NaiveDate,
        /// Start wall time, HH:MM.
        #[arg(long)]
        time: String,
        /// Service ids; repeatable.
        #[arg(long = "service", required = true)]
        services: Vec<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Move an appointment to a new master and/or time on its date.
    Move {
        #[arg(long)]
        id: String,
        #[arg(long)]
        master: String,
        #[arg(long)]
        time: String,
    },
    /// Cancel an appointment (keeps it on record, frees the slot).
    Cancel {
        #[arg(long)]
        id: String,
    },
    /// Show a day's calendar.
    Day {
        #[arg(long)]
        date: NaiveDate,
        /// Print raw JSON instead of the table.
        #[arg(long)]
        json: bool,
    },
    /// Record a cash transaction.
    Cash {
        #[arg(long, value_parser = parse_kind)]
        kind: TransactionKind,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show income for a calendar day.
    Revenue {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show a client's analytics and recommendations.
    Client {
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List notifications; optionally mark one read or clear read ones.
    Notifications {
        #[arg(long)]
        mark_read: Option<String>,
        #[arg(long)]
        clear_read: bool,
    },
}

fn parse_kind(s: &str) -> std::result::Result<TransactionKind, String> {
    match s {
        "income" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        _ => Err(format!("unknown kind '{s}', expected income|expense")),
    }
}

fn parse_role(s: &str) -> Result<Role> {
    match s {
        "admin" => Ok(Role::Admin),
        "guest" => Ok(Role::Guest),
        other => match other.strip_prefix("master:") {
            Some(id) if !id.is_empty() => Ok(Role::Master {
                master_id: MasterId::from(id),
            }),
            _ => Err(anyhow!("unknown role '{other}', expected admin|guest|master:<id>")),
        },
    }
}

fn caller_id(role: &Role) -> UserId {
    match role {
        Role::Admin => UserId::from("user-admin"),
        Role::Guest => UserId::from("user-guest"),
        Role::Master { master_id } => UserId::from(format!("user-{master_id}").as_str()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let role = parse_role(&cli.role)?;

    let studio = Studio::open(
        StudioConfig::default(),
        Box::new(DirStorage::new(&cli.data_dir)),
        Box::new(SystemClock),
        Box::new(UuidSource),
    )
    .with_context(|| format!("open studio data in {}", cli.data_dir.display()))?;

    match cli.command {
        Command::Seed => {
            println!(
                "studio ready: {} masters, {} services, {} appointments",
                studio.masters().len(),
                studio.services().len(),
                studio.appointments().len()
            );
        }
        Command::Masters => {
            for master in studio.masters() {
                let state = if master.active { "active" } else { "inactive" };
                println!("{}  {}  {}", master.id, master.name, state);
            }
        }
        Command::Services => {
            for service in studio.services() {
                println!(
                    "{}  {}  {} min  {:.0}",
                    service.id, service.name, service.duration_minutes, service.price
                );
            }
        }
        Command::Book {
            client,
            phone,
            master,
            date,
            time,
            services,
            notes,
        } => {
            require_editor(&role)?;
            let appointment = studio.create_appointment(BookingRequest {
                client_name: client,
                client_phone: phone,
                master_id: MasterId::from(master.as_str()),
                services: services.iter().map(|s| ServiceId::from(s.as_str())).collect(),
                date,
                start_time: time,
                notes,
                created_by: caller_id(&role),
            })?;
            println!(
                "booked {}: {} - {}",
                appointment.id,
                appointment.start.format("%Y-%m-%d %H:%M"),
                appointment.end.format("%H:%M")
            );
        }
        Command::Move { id, master, time } => {
            require_editor(&role)?;
            let moved = studio.move_appointment(
                &AppointmentId::from(id.as_str()),
                &MasterId::from(master.as_str()),
                &time,
            )?;
            if moved {
                println!("moved {id} to {master} at {time}");
            } else {
                bail!("slot at {time} is taken, {id} not moved");
            }
        }
        Command::Cancel { id } => {
            require_editor(&role)?;
            let cancelled = studio.update_appointment(
                &AppointmentId::from(id.as_str()),
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    ..Default::default()
                },
            )?;
            if cancelled {
                println!("cancelled {id}");
            } else {
                bail!("appointment {id} not found");
            }
        }
        Command::Day { date, json } => {
            let day = studio.appointments_for_date(date);
            if json {
                println!("{}", serde_json::to_string_pretty(&day)?);
            } else if day.is_empty() {
                println!("no appointments on {date}");
            } else {
                for a in day {
                    println!(
                        "{}  {} - {}  {}  {}  ({:?})",
                        a.id,
                        a.start.format("%H:%M"),
                        a.end.format("%H:%M"),
                        a.master_id,
                        a.client_name,
                        a.status
                    );
                }
            }
        }
        Command::Cash {
            kind,
            amount,
            description,
        } => {
            require_admin(&role)?;
            let transaction = studio.add_transaction(kind, amount, description);
            println!("recorded {} ({:.2})", transaction.id, transaction.amount);
        }
        Command::Revenue { date } => {
            require_admin(&role)?;
            println!("{:.2}", studio.daily_revenue(date));
        }
        Command::Client { id, json } => {
            let client_id = ClientId::from(id.as_str());
            let Some(analytics) = studio.client_analytics(&client_id) else {
                bail!("client {id} not found");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                println!(
                    "visits: {}  spent: {:.0}  average: {:.0}",
                    analytics.total_visits, analytics.total_spent, analytics.average_check
                );
                for favorite in &analytics.favorite_services {
                    println!("favorite: {} x{}", favorite.service_name, favorite.count);
                }
                for service in studio.recommended_services(&client_id) {
                    println!("recommended: {}", service.name);
                }
            }
        }
        Command::Notifications {
            mark_read,
            clear_read,
        } => {
            if let Some(id) = mark_read {
                if !studio.mark_notification_read(&NotificationId::from(id.as_str())) {
                    bail!("notification {id} not found");
                }
            }
            if clear_read {
                studio.clear_read_notifications();
            }
            println!("unread: {}", studio.unread_notification_count());
            for n in studio.notifications() {
                let flag = if n.read { "read  " } else { "unread" };
                println!("{}  {}  {}  {}", n.id, flag, n.title, n.message);
            }
        }
    }

    Ok(())
}

fn require_editor(role: &Role) -> Result<()> {
    if role.can_edit_appointments() {
        Ok(())
    } else {
        Err(anyhow!("role cannot edit appointments"))
    }
}

fn require_admin(role: &Role) -> Result<()> {
    if role.can_manage_settings() {
        Ok(())
    } else {
        Err(anyhow!("role cannot manage the cash ledger"))
    }
}
