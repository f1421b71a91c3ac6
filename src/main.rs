use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use agent_dashboard::api::{ApiClient, ReplyRequest};
use agent_dashboard::config::{load_config, resolve_poll_interval, resolve_ws_url};
use agent_dashboard::driver::notifier::Notifier;
use agent_dashboard::driver::{DriverConfig, run_driver};
use agent_dashboard::listener::{Listener, ListenerConfig};
use agent_dashboard::mailbox::Mailbox;
use agent_dashboard::stream::ws::WsEventSource;

#[derive(Parser)]
#[command(name = "agent_dashboard")]
#[command(about = "Operator dashboard for the email-processing agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the live event stream (listener + polling fold loop)
    Watch {
        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,

        /// Disable desktop notifications
        #[arg(long, default_value_t = false)]
        no_toast: bool,
    },

    /// Probe the agent's status endpoint
    Status,

    /// Print processing stats
    Stats,

    /// List emails waiting for manual review
    Review,

    /// Send a manual reply to a reviewed email
    Reply {
        #[arg(long)]
        recipient: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        body: String,

        #[arg(long)]
        message_id: String,

        #[arg(long, default_value = "low")]
        priority: String,
    },

    /// Clear the agent's processed-email history
    Reset,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    match cli.cmd {
        Command::Watch { interval, no_toast } => {
            let mailbox = Arc::new(Mailbox::new());
            let source = Box::new(WsEventSource::new(resolve_ws_url(&cfg)));
            let listener = Listener::spawn(source, mailbox.clone(), ListenerConfig::default())?;

            let running = Arc::new(AtomicBool::new(true));
            let r2 = running.clone();
            ctrlc::set_handler(move || {
                r2.store(false, Ordering::SeqCst);
            })?;

            let tick = interval
                .map(Duration::from_millis)
                .unwrap_or_else(|| resolve_poll_interval(&cfg));
            let notifier = Notifier::new(!no_toast);
            let snapshot = run_driver(&mailbox, &notifier, &DriverConfig { tick }, &running);

            listener.stop();
            println!(
                "final state: connection={} processed={} replies={} manual={} errors={}",
                snapshot.connection,
                snapshot.stats.total_processed,
                snapshot.stats.successful_replies,
                snapshot.stats.manual_reviews,
                snapshot.stats.errors
            );
            Ok(())
        }

        Command::Status => {
            let api = ApiClient::new(&cfg.api_base_url)?;
            match api.get_status() {
                Ok(s) => println!("agent {} (version {}, at {})", s.status, s.version, s.timestamp),
                Err(e) => eprintln!("Error communicating with the backend: {e}"),
            }
            Ok(())
        }

        Command::Stats => {
            let api = ApiClient::new(&cfg.api_base_url)?;
            match api.get_stats() {
                Ok(s) => {
                    let p = s.processing_stats;
                    println!("Total processed:    {}", p.total_processed);
                    println!("Successful replies: {}", p.successful_replies);
                    println!("Manual reviews:     {}", p.manual_reviews);
                    println!("Errors:             {}", p.errors);
                }
                Err(e) => eprintln!("Error communicating with the backend: {e}"),
            }
            Ok(())
        }

        Command::Review => {
            let api = ApiClient::new(&cfg.api_base_url)?;
            match api.get_manual_review_emails() {
                Ok(emails) if emails.is_empty() => {
                    println!("No emails currently require manual review.");
                }
                Ok(emails) => {
                    println!("{} email(s) require manual review:", emails.len());
                    for m in emails {
                        println!(
                            "[{}] {} - from {} (id {})",
                            m.priority, m.subject, m.sender, m.message_id
                        );
                    }
                }
                Err(e) => eprintln!("Error communicating with the backend: {e}"),
            }
            Ok(())
        }

        Command::Reply {
            recipient,
            subject,
            body,
            message_id,
            priority,
        } => {
            let api = ApiClient::new(&cfg.api_base_url)?;
            let reply = ReplyRequest {
                recipient,
                subject,
                body,
                message_id,
                priority,
            };
            match api.send_manual_reply(&reply) {
                Ok(outcome) if outcome.success && outcome.confirmed => {
                    println!("Reply sent: {}", outcome.message);
                }
                Ok(outcome) if outcome.success => {
                    // Unconfirmed: likely sent, do not re-send blindly.
                    println!("Reply likely sent: {}", outcome.message);
                }
                Ok(outcome) => eprintln!("Reply rejected: {}", outcome.message),
                Err(e) => eprintln!("Error sending reply: {e}"),
            }
            Ok(())
        }

        Command::Reset => {
            let api = ApiClient::new(&cfg.api_base_url)?;
            match api.reset_processed() {
                Ok(outcome) => println!("History reset: {}", outcome.message),
                Err(e) => eprintln!("Error resetting history: {e}"),
            }
            Ok(())
        }
    }
}
