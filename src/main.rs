//! `hostwatch` binary.
//!
//! ```text
//! hostwatch local                       # one pass over CPU, memory, disks, processes
//! hostwatch http --url http://10.0.0.1/ # probe a target with bounded retry
//! hostwatch watch --interval 60         # repeat the local pass
//! ```
//!
//! Exit codes: 0 = OK, 1 = WARNING, 2 = DOWN or CRITICAL (including setup
//! errors such as an unwritable report destination).

use anyhow::Context;
use clap::{Parser, Subcommand};
use hostwatch::configuration::{get_configuration, Settings};
use hostwatch::health::{
    CheckPolicy, HealthReport, HttpChecker, LocalChecker, ReqwestProbe, RetryPolicy, Sampler,
    Schedule, SystemSource,
};
use hostwatch::notify::MailCommandNotifier;
use hostwatch::publish::{publish, ReportLog};
use hostwatch::telemetry::{get_subscriber, init_subscriber};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const SETUP_ERROR_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "hostwatch",
    version,
    about = "Poll host metrics and an HTTP endpoint against fixed thresholds"
)]
struct Cli {
    /// Configuration file (default: ./configuration.yaml if present)
    #[arg(long, short, global = true, env = "HOSTWATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Append report lines to this file instead of the configured one
    #[arg(long, global = true, value_name = "FILE")]
    report: Option<PathBuf>,
    /// Alert recipient (overrides alert.recipient)
    #[arg(long, global = true, value_name = "ADDRESS")]
    recipient: Option<String>,
    /// Print the report as JSON instead of text lines
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one local health check cycle
    Local,
    /// Probe an HTTP target with bounded retry
    Http {
        /// Target URL (overrides http.url)
        #[arg(long)]
        url: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Extra attempts after the first one
        #[arg(long)]
        retries: Option<u32>,
        /// Delay between attempts in seconds
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,
    },
    /// Repeat the local health check cycle
    Watch {
        /// Seconds between the end of one cycle and the start of the next
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Stop after this many cycles (default: run forever)
        #[arg(long)]
        cycles: Option<u64>,
    },
}

fn main() -> ExitCode {
    let subscriber = get_subscriber("hostwatch".into(), "info".into(), std::io::stderr);
    init_subscriber(subscriber);

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("hostwatch: {:#}", err);
            ExitCode::from(SETUP_ERROR_EXIT)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut settings =
        get_configuration(cli.config.as_deref()).context("Failed to read configuration")?;
    if let Some(report) = cli.report {
        settings.report.path = report;
    }
    if let Some(recipient) = cli.recipient {
        settings.alert.recipient = Some(recipient);
    }

    let output = Output::new(&settings, cli.json);

    match cli.command {
        Commands::Local => {
            let mut checker = LocalChecker::new(Sampler::new(SystemSource::new()), &settings);
            let report = checker.run_cycle();
            Ok(output.emit(&report))
        }
        Commands::Http {
            url,
            timeout,
            retries,
            delay,
        } => {
            if let Some(url) = url {
                settings.http.url = url;
            }
            if let Some(timeout) = timeout {
                settings.http.timeout_secs = timeout;
            }
            if let Some(retries) = retries {
                settings.http.retries = retries;
            }
            if let Some(delay) = delay {
                settings.http.retry_delay_secs = delay;
            }
            settings.validate().context("Invalid HTTP settings")?;

            let report = match ReqwestProbe::new(settings.http.timeout()) {
                Ok(probe) => {
                    let policy =
                        RetryPolicy::new(settings.http.retries, settings.http.retry_delay());
                    HttpChecker::new(probe, settings.http.url.clone(), policy).run()
                }
                Err(e) => {
                    let mut report = HealthReport::new(CheckPolicy::Http);
                    report.abort(e);
                    report
                }
            };
            Ok(output.emit(&report))
        }
        Commands::Watch { interval, cycles } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| settings.schedule.interval());
            let cycles = cycles.or(settings.schedule.cycles);

            let mut checker = LocalChecker::new(Sampler::new(SystemSource::new()), &settings);
            let mut exit = 0;
            let last = Schedule::new(interval, cycles).run(|_| {
                let report = checker.run_cycle();
                exit = output.emit(&report);
                report
            });

            if last.is_none() {
                tracing::warn!("watch finished without running a cycle");
            }
            Ok(exit)
        }
    }
}

/// Process boundary: prints the report, hands it to the collaborators and
/// decides the exit code.
struct Output {
    log: ReportLog,
    notifier: MailCommandNotifier,
    subject_prefix: String,
    json: bool,
}

impl Output {
    fn new(settings: &Settings, json: bool) -> Self {
        Self {
            log: ReportLog::new(settings.report.path.clone()),
            notifier: MailCommandNotifier::from_settings(&settings.alert),
            subject_prefix: settings.alert.subject_prefix.clone(),
            json,
        }
    }

    fn emit(&self, report: &HealthReport) -> u8 {
        if self.json {
            match serde_json::to_string_pretty(report) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to serialize report: {}", e),
            }
        } else {
            for line in report.lines() {
                println!("{}", line);
            }
        }

        match publish(report, &self.log, &self.notifier, &self.subject_prefix) {
            Ok(()) => report.exit_code(),
            Err(e) => {
                eprintln!("hostwatch: {}", e);
                SETUP_ERROR_EXIT
            }
        }
    }
}
