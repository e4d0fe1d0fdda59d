/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use eyre::WrapErr as _;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use cache_fault_harness::restart::BootRecorder;
use cache_fault_harness::CacheFaultHarness;
use cfh_config::load_config;
use cfh_config::CFHConfig;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long)]
    config_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints registered tests as JSON lines.
    List,
    /// Runs one stage of a test, the persisted stage marker is used if no stage is provided.
    Run {
        test_name: String,
        #[arg(long)]
        stage: Option<usize>,
    },
    /// Prints why the current boot happened.
    RestartReason,
}

fn main() -> eyre::Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(args.config_path.as_str())?;

    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .with_default_directive(Directive::from(config.logs.log_level))
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting global tracing subscriber failed")?;
    tracing_log::LogTracer::init()?;

    std::fs::create_dir_all(&config.state_dir)
        .wrap_err_with(|| format!("failed to create state dir {:?}", config.state_dir))?;
    check_writable_dir(&config.state_dir)
        .wrap_err("state.path value in a config should be a writeable directory path")?;

    let tokio_cores = config
        .harness
        .utility_cores
        .iter()
        .copied()
        .collect::<Vec<_>>();
    let next_core = Arc::new(AtomicUsize::new(0));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .on_thread_start(move || {
            if tokio_cores.is_empty() {
                return;
            }

            let slot = next_core.fetch_add(1, Ordering::Relaxed) % tokio_cores.len();
            let core_id = tokio_cores[slot];
            let tid = std::thread::current().id();
            tracing::info!("Pinning tokio thread {tid:?} to core {core_id}");
            if !cpu_utils::pinning::pin_current_thread_to(core_id) {
                tracing::error!("Tokio thread pinning failed");
            }
        })
        .build()
        .wrap_err("failed to build tokio runtime")?;

    runtime.block_on(async_main(config, args.command))
}

async fn async_main(config: CFHConfig, command: Command) -> eyre::Result<ExitCode> {
    tracing::debug!("creating harness with config {config:?}");
    // only a run takes the pending restart record, other commands must leave it for the
    // verifying relaunch
    let recorder = BootRecorder::new(config.state_dir.clone());
    let boot = match command {
        Command::Run { .. } => recorder.on_boot().await,
        Command::List | Command::RestartReason => recorder.inspect().await,
    }
    .wrap_err("failed to classify the last restart")?;

    let harness =
        CacheFaultHarness::from_config(config, boot).wrap_err("failed to create the harness")?;

    match command {
        Command::List => {
            for case in harness.registry().cases() {
                println!("{}", serde_json::to_string(&case.summary())?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { test_name, stage } => {
            let outcome = harness.run_test(&test_name, stage).await?;
            println!("{test_name}: {outcome}");

            if outcome.is_failed() {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::RestartReason => {
            println!("{}", serde_json::to_string(harness.last_restart())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

// Preliminary check that is useful on early diagnostics.
fn check_writable_dir(path: &Path) -> eyre::Result<()> {
    if !path.is_dir() {
        eyre::bail!("{path:?} is not a directory");
    }

    let meta = std::fs::metadata(path)?;
    let permissions = meta.permissions();
    if permissions.readonly() {
        eyre::bail!("{path:?} is not writable");
    }

    Ok(())
}
