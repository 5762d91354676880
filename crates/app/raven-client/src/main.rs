use std::{env, time::Duration};

use anyhow::{Context, Result, bail};
use dotenv::dotenv;
use raven_client::{
    Bootstrap, CallbackQueue, ClientCore, GatePresenter, HostAction, HostEvent, HostFrame, Screen,
    UpdateNotifier, logging,
};
use raven_license::{GateState, SessionIdentity};
use raven_settings::ClientSettings;
use raven_updater::{DownloadOutcome, UpdateSnapshot, UpdateStatus};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info};

const TICK: Duration = Duration::from_millis(50);

const USAGE: &str = "usage: raven-client [--key <KEY>] [--download] [--forget-license]";

#[derive(Debug, Default)]
struct Args {
    key: Option<String>,
    download: bool,
    forget_license: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--key" => {
                    parsed.key = Some(args.next().context("--key needs a value")?);
                }
                "--download" => parsed.download = true,
                "--forget-license" => parsed.forget_license = true,
                "-h" | "--help" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                other => bail!("unknown argument '{other}'\n{USAGE}"),
            }
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse(env::args().skip(1))?;

    let settings =
        ClientSettings::load_from_default_path_creating().context("Failed to load settings")?;
    let data_dir = settings
        .paths
        .resolve_data_dir()
        .context("Failed to resolve the data directory")?;
    let _logging = logging::init(Some(&data_dir.join("logs")));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the Tokio runtime")?
        .block_on(run(args, settings))
}

/// Stand-in for the game: a main menu, a text prompt on stdin for the license
/// screen, and a world the player "joins" once the gate opens.
async fn run(args: Args, settings: ClientSettings) -> Result<()> {
    let mut queue = CallbackQueue::new();
    let session = SessionIdentity::new(
        env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "Player".to_string()),
    );
    let notify_delay = settings.updater.notify_delay_ticks;
    let auto_check = settings.updater.auto_check;

    let core = Bootstrap::new(settings)
        .start(session, queue.sender())
        .context("Failed to start the client")?;

    let report = core.applied_update();
    if let Some(installed) = &report.installed {
        println!("Applied update: {}", installed.display());
    }

    if args.forget_license && core.gate().forget_stored_key()? {
        println!("Stored license key removed.");
    }
    if let Some(key) = &args.key {
        core.submit_key(key.clone());
    }

    let mut lines = stdin_lines();
    let mut presenter = GatePresenter::new();
    let mut notifier = UpdateNotifier::new(notify_delay);
    let mut frame = HostFrame {
        screen: Screen::MainMenu,
        in_world: false,
    };
    let mut awaiting_license = args.key.is_some();
    let mut download_pending = false;
    let mut stdin_open = true;

    presenter.on_screen_opened(frame.screen, core.gate().is_validated());
    let mut ticker = tokio::time::interval(TICK);

    loop {
        ticker.tick().await;

        for event in queue.drain() {
            match event {
                HostEvent::NoStoredLicense => debug!("no stored license key"),
                HostEvent::LicenseResolved(Ok(grant)) => {
                    awaiting_license = false;
                    println!(
                        "License valid. Welcome, {}!",
                        grant.username.as_deref().unwrap_or("player")
                    );
                }
                HostEvent::LicenseResolved(Err(err)) => {
                    awaiting_license = false;
                    println!("License rejected: {err}");
                }
                HostEvent::UpdateChecked(Err(err)) => println!("Update check failed: {err}"),
                HostEvent::UpdateChecked(Ok(_)) => {}
                HostEvent::DownloadFinished(outcome) => {
                    download_pending = false;
                    match outcome {
                        Ok(DownloadOutcome::Staged(staged)) => println!(
                            "Update {} downloaded. Restart to apply.",
                            staged.version
                        ),
                        Ok(other) => debug!(?other, "download request ignored"),
                        Err(err) => println!("Update download failed: {err}"),
                    }
                }
            }
        }

        let validated = core.gate().is_validated();
        if validated && !frame.in_world {
            info!("License gate open, entering world");
            frame = HostFrame {
                screen: Screen::None,
                in_world: true,
            };
        }

        if frame.screen == Screen::LicensePrompt && !awaiting_license {
            if !stdin_open {
                bail!("License not validated and no more input");
            }
            match lines.try_recv() {
                Ok(line) => {
                    awaiting_license = true;
                    frame.screen = Screen::None;
                    core.submit_key(line);
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
                Err(mpsc::error::TryRecvError::Disconnected) => stdin_open = false,
            }
        }

        let busy = awaiting_license || core.gate().state() == GateState::Validating;
        if let Some(HostAction::ShowLicensePrompt) = presenter.on_tick(frame, validated || busy) {
            frame.screen = Screen::LicensePrompt;
            if let Some(reason) = core.gate().rejection_reason() {
                println!("{reason}");
            }
            println!("Enter license key:");
        }

        let update = core.updater().snapshot();
        if let Some(HostAction::ShowUpdateNotification { version, notes }) =
            notifier.on_tick(frame.in_world, &update)
        {
            println!(
                "Update available: {} -> {version}",
                core.updater().current_version()
            );
            if let Some(notes) = notes {
                println!("{notes}");
            }
            if args.download {
                download_pending = true;
                core.approve_download();
            } else {
                println!("Run with --download to install it.");
            }
        }

        let settled = update_settled(
            &update,
            &core,
            auto_check,
            notifier.has_shown(),
            download_pending,
        );
        if validated && settled {
            return Ok(());
        }
    }
}

fn update_settled(
    update: &UpdateSnapshot,
    core: &ClientCore,
    auto_check: bool,
    notified: bool,
    download_pending: bool,
) -> bool {
    if download_pending {
        return false;
    }
    match update.status {
        UpdateStatus::Checking | UpdateStatus::Downloading => false,
        UpdateStatus::UpdateAvailable | UpdateStatus::DownloadFailed => notified,
        UpdateStatus::UpToDate | UpdateStatus::Staged => true,
        UpdateStatus::Idle => !auto_check || core.updater().is_check_complete(),
    }
}

/// Lines typed on stdin, trimmed, read on a background task.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line.trim().to_string()).is_err() {
                break;
            }
        }
    });
    rx
}
