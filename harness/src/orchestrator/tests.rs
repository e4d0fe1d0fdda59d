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

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cfh_cache_control::simulated::SimulationConfig;
use cfh_cache_control::FaultKind;
use cfh_config::TargetExpectation;
use cfh_shared::RestartCause;
use cfh_shared::RestartOracle;
use cfh_shared::TestTags;
use cfh_test_utils::test_values::generate_core;
use cfh_test_utils::CacheEvent;
use cfh_test_utils::CacheOp;
use cfh_test_utils::FixedRestartOracle;
use cfh_test_utils::HaltingFaultHandler;
use cfh_test_utils::RecordingCacheControl;
use cpu_utils::priority::WorkerPriority;
use cpu_utils::CPUTopology;
use itertools::Itertools;
use nonempty::NonEmpty;
use parking_lot::Mutex;

use test_log::test;

use super::*;
use crate::launcher::WorkerLauncher;
use crate::stage::CacheStateStage;
use crate::stage::CoreSlot;
use crate::stage::FaultVariant;
use crate::stage::RestartVerificationStage;
use crate::stage::Stage;
use crate::stage::StageResult;
use crate::CheckMode;
use crate::LogicalCoreId;
use crate::Platform;
use crate::TargetId;
use crate::TestRegistry;

const CACHE_FAULT_TEST: &str = "invalid_access_to_cache_raises_panic_on_first_core";
const BUS_GATE_TEST: &str = "invalid_access_through_closed_bus_gates";

fn available_cores(max: usize) -> Vec<LogicalCoreId> {
    let topology = CPUTopology::new().unwrap();
    let cores = topology
        .logical_cores()
        .iter()
        .take(max)
        .copied()
        .collect::<Vec<_>>();

    if cores.len() < max {
        log::warn!(
            "host has {} logical cores, cross-core checks run on {cores:?} instead of {max} cores",
            cores.len()
        );
    }
    cores
}

fn expectation() -> TargetExpectation {
    TargetExpectation::new("Cache disabled,SW_RESET")
}

fn context(
    platform: Platform,
    cores: Vec<LogicalCoreId>,
    oracle: impl RestartOracle + 'static,
) -> StageContext {
    StageContext {
        platform,
        launcher: WorkerLauncher::new(CPUTopology::new().unwrap()),
        oracle: Box::new(oracle),
        cores: NonEmpty::from_vec(cores).unwrap(),
        target: TargetId::new("esp32"),
        expectation: expectation(),
        report_timeout: Duration::from_millis(200),
        fault_grace_period: Duration::from_millis(300),
        worker_stack_size: 64 * 1024,
        worker_priority: WorkerPriority::Normal,
    }
}

fn orchestrator(context: StageContext, state_dir: &Path) -> StageOrchestrator {
    StageOrchestrator::new(context, StageMarkerStorage::new(state_dir.to_path_buf()))
}

fn mock_platform(cache: Arc<RecordingCacheControl>) -> Platform {
    Platform::new(cache, None, None)
}

fn cache_state_case() -> TestCase {
    TestCase::single_stage(
        "cache_state",
        TestTags::new(&["spi_flash"]).requires(Capabilities::CACHE_QUERY),
        Arc::new(CacheStateStage),
    )
}

/// Stage returning normally and remembering the marker it saw while running.
struct ScriptedStage {
    completion: StageCompletion,
    test_name: &'static str,
    markers: StageMarkerStorage,
    seen_markers: Arc<Mutex<Vec<Option<usize>>>>,
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        "scripted"
    }

    fn completion(&self) -> StageCompletion {
        self.completion
    }

    async fn run(&self, _context: &StageContext) -> StageResult {
        let marker = self.markers.load(self.test_name).await.unwrap();
        self.seen_markers.lock().push(marker);
        Ok(())
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn cache_state_is_observed_on_every_core() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(2);
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache.clone()), cores.clone(), FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&cache_state_case(), None).await;
    assert!(matches!(outcome, TestOutcome::Passed), "{outcome}");

    let covered = cache
        .events()
        .iter()
        .map(|event| event.core_id)
        .unique()
        .count();
    log::info!("cache state observed on {covered} cores");
    assert_eq!(covered, cores.len());

    let expected_events = cores
        .iter()
        .flat_map(|&core_id| {
            [CacheOp::Query, CacheOp::Disable, CacheOp::Query, CacheOp::Enable]
                .into_iter()
                .map(move |op| CacheEvent {
                    op,
                    core_id,
                    thread_core: Some(core_id),
                })
        })
        .collect::<Vec<_>>();
    assert_eq!(cache.events(), expected_events);
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn disable_ignored_by_core_is_state_mismatch() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    // the last core diverges, on multicore hosts the first one passes before it
    let cores = available_cores(2);
    let core_id = *cores.last().unwrap();
    let cache = Arc::new(RecordingCacheControl::new().ignoring_disable_on(core_id));
    let orchestrator = orchestrator(
        context(mock_platform(cache.clone()), cores, FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&cache_state_case(), None).await;
    match outcome {
        TestOutcome::Failed(TestFailure::StateMismatch {
            core_id: failed_core,
            mode,
            expected,
            observed,
        }) => {
            assert_eq!(failed_core, core_id);
            assert_eq!(mode, CheckMode::DisableThenCheck);
            assert!(!expected);
            assert!(observed);
        }
        outcome => panic!("unexpected outcome: {outcome}"),
    }

    // the bracket is still closed on the same core
    let last = cache.events().last().copied().unwrap();
    assert_eq!(last.op, CacheOp::Enable);
    assert_eq!(last.thread_core, Some(core_id));
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn silent_worker_is_timeout() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let cache = Arc::new(
        RecordingCacheControl::new().stalling_query_on(cores[0], Duration::from_secs(1)),
    );
    let orchestrator = orchestrator(
        context(mock_platform(cache), cores.clone(), FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&cache_state_case(), None).await;
    match outcome {
        TestOutcome::Failed(TestFailure::WorkerTimeout {
            core_id,
            mode,
            timeout,
        }) => {
            assert_eq!(core_id, cores[0]);
            assert_eq!(mode, CheckMode::CheckOnly);
            assert_eq!(timeout, Duration::from_millis(200));
        }
        outcome => panic!("unexpected outcome: {outcome}"),
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn failed_enable_is_worker_failure() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let cache = Arc::new(RecordingCacheControl::new().failing_enable_on(cores[0]));
    let orchestrator = orchestrator(
        context(mock_platform(cache), cores, FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&cache_state_case(), None).await;
    assert!(
        matches!(outcome, TestOutcome::Failed(TestFailure::WorkerFailed { .. })),
        "{outcome}"
    );
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn missing_capability_is_skipped() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache.clone()), available_cores(1), FixedRestartOracle::power_on()),
        dir.path(),
    );

    let registry = TestRegistry::builtin(&expectation());
    let outcome = orchestrator
        .run(registry.get(CACHE_FAULT_TEST).unwrap(), None)
        .await;

    assert!(matches!(outcome, TestOutcome::Skipped(_)), "{outcome}");
    assert!(cache.events().is_empty());
    assert!(!dir.path().join("stage.json").exists());
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn excluded_target_and_core_count_are_skipped() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cache =
        Arc::new(RecordingCacheControl::new().with_capabilities(Capabilities::all()));
    let mut context = context(
        mock_platform(cache),
        vec![generate_core(0)],
        FixedRestartOracle::power_on(),
    );
    context.target = TargetId::new("ESP32S2");
    let orchestrator = orchestrator(context, dir.path());

    let excluded = TestCase::single_stage(
        "excluded",
        TestTags::new(&["mspi"]).exclude_target("esp32s2"),
        Arc::new(CacheStateStage),
    );
    let outcome = orchestrator.run(&excluded, None).await;
    assert!(matches!(outcome, TestOutcome::Skipped(_)), "{outcome}");

    let two_cores = TestCase::single_stage(
        "two_cores",
        TestTags::new(&["mspi"]).min_cores(2),
        Arc::new(CacheStateStage),
    );
    let outcome = orchestrator.run(&two_cores, None).await;
    assert!(matches!(outcome, TestOutcome::Skipped(_)), "{outcome}");
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn returning_fault_stage_is_missing_fault() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let markers = StageMarkerStorage::new(dir.path().to_path_buf());
    let seen_markers = Arc::new(Mutex::new(Vec::new()));
    let stage = ScriptedStage {
        completion: StageCompletion::Restarts,
        test_name: "scripted_fault",
        markers: markers.clone(),
        seen_markers: seen_markers.clone(),
    };
    let test = TestCase::multi_stage(
        "scripted_fault",
        TestTags::new(&["mspi"]),
        vec![
            Arc::new(stage),
            Arc::new(RestartVerificationStage::new(
                FaultVariant::CacheDisabled,
                CoreSlot(0),
            )),
        ],
    );
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache), available_cores(1), FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&test, None).await;
    assert!(
        matches!(outcome, TestOutcome::Failed(TestFailure::MissingFault { .. })),
        "{outcome}"
    );
    // the marker pointed to the verification stage while the fault stage ran
    assert_eq!(*seen_markers.lock(), vec![Some(1)]);
    assert_eq!(markers.load("scripted_fault").await.unwrap(), None);
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn persisted_marker_resumes_at_verification() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let markers = StageMarkerStorage::new(dir.path().to_path_buf());
    markers
        .save(&StageMarker::new(CACHE_FAULT_TEST, 1))
        .await
        .unwrap();

    let cores = available_cores(1);
    let oracle = FixedRestartOracle::after_fault(RestartCause::Panic, Some(cores[0]));
    let platform = Platform::simulated(
        SimulationConfig::default(),
        Arc::new(HaltingFaultHandler::new()),
    )
    .unwrap();
    let orchestrator = orchestrator(context(platform, cores, oracle), dir.path());

    let registry = TestRegistry::builtin(&expectation());
    let outcome = orchestrator
        .run(registry.get(CACHE_FAULT_TEST).unwrap(), None)
        .await;

    assert!(matches!(outcome, TestOutcome::Passed), "{outcome}");
    assert_eq!(markers.load(CACHE_FAULT_TEST).await.unwrap(), None);
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn wrong_restart_cause_reports_both_causes() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let oracle = FixedRestartOracle::after_fault(RestartCause::Watchdog, Some(cores[0]));
    let cache = Arc::new(RecordingCacheControl::new().with_capabilities(Capabilities::all()));
    let orchestrator = orchestrator(context(mock_platform(cache), cores, oracle), dir.path());

    let test = TestCase::multi_stage(
        "verification_only",
        TestTags::new(&["mspi"]),
        vec![
            Arc::new(CacheStateStage),
            Arc::new(RestartVerificationStage::new(
                FaultVariant::CacheDisabled,
                CoreSlot(0),
            )),
        ],
    );
    let outcome = orchestrator.run(&test, Some(1)).await;

    match outcome {
        TestOutcome::Failed(TestFailure::WrongRestartCause { expected, actual }) => {
            assert_eq!(expected, RestartCause::Panic);
            assert_eq!(actual, RestartCause::Watchdog);
        }
        outcome => panic!("unexpected outcome: {outcome}"),
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn restart_on_another_core_is_wrong_origin() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let oracle = FixedRestartOracle::after_fault(RestartCause::Panic, Some(generate_core(4242)));
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache), cores.clone(), oracle),
        dir.path(),
    );

    let test = TestCase::single_stage(
        "verification_only",
        TestTags::new(&["mspi"]),
        Arc::new(RestartVerificationStage::new(
            FaultVariant::CacheDisabled,
            CoreSlot(0),
        )),
    );
    let outcome = orchestrator.run(&test, None).await;

    match outcome {
        TestOutcome::Failed(TestFailure::WrongOriginCore { expected, actual }) => {
            assert_eq!(expected, cores[0]);
            assert_eq!(actual, generate_core(4242));
        }
        outcome => panic!("unexpected outcome: {outcome}"),
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn restart_without_origin_core_checks_cause_only() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let oracle = FixedRestartOracle::after_fault(RestartCause::Panic, None);
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache), available_cores(1), oracle),
        dir.path(),
    );

    let test = TestCase::single_stage(
        "verification_only",
        TestTags::new(&["mspi"]),
        Arc::new(RestartVerificationStage::new(
            FaultVariant::CacheDisabled,
            CoreSlot(0),
        )),
    );
    let outcome = orchestrator.run(&test, None).await;

    assert!(matches!(outcome, TestOutcome::Passed), "{outcome}");
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn stage_beyond_list_is_unknown() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cache = Arc::new(RecordingCacheControl::new());
    let orchestrator = orchestrator(
        context(mock_platform(cache), available_cores(1), FixedRestartOracle::power_on()),
        dir.path(),
    );

    let outcome = orchestrator.run(&cache_state_case(), Some(5)).await;
    assert!(
        matches!(
            outcome,
            TestOutcome::Failed(TestFailure::UnknownStage {
                index: 5,
                stages_count: 1,
                ..
            })
        ),
        "{outcome}"
    );
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn cache_fault_is_raised_on_pinned_core_and_verified_after_restart() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let handler = HaltingFaultHandler::new();
    let platform =
        Platform::simulated(SimulationConfig::default(), Arc::new(handler.clone())).unwrap();
    let registry = TestRegistry::builtin(&expectation());
    let test = registry.get(CACHE_FAULT_TEST).unwrap();

    let first_launch = orchestrator(
        context(platform.clone(), cores.clone(), FixedRestartOracle::power_on()),
        dir.path(),
    );
    // the process can't restart here, so the first stage ends as a missing fault
    let outcome = first_launch.run(test, None).await;
    assert!(
        matches!(outcome, TestOutcome::Failed(TestFailure::MissingFault { .. })),
        "{outcome}"
    );

    let faults = handler.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::CacheDisabledAccess);
    assert_eq!(faults[0].core_id, Some(cores[0]));

    let oracle = FixedRestartOracle::new(faults[0].restart_record());
    let relaunch = orchestrator(context(platform, cores, oracle), dir.path());
    let outcome = relaunch.run(test, Some(1)).await;
    assert!(matches!(outcome, TestOutcome::Passed), "{outcome}");
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn bus_gate_fault_is_verified_with_its_own_cause() {
    let dir = tempdir::TempDir::new("orchestrator").unwrap();
    let cores = available_cores(1);
    let handler = HaltingFaultHandler::new();
    let config = SimulationConfig {
        watchdog_timeout: Duration::from_millis(50),
        ..SimulationConfig::default()
    };
    let platform = Platform::simulated(config, Arc::new(handler.clone())).unwrap();
    let registry = TestRegistry::builtin(&expectation());

    let first_launch = orchestrator(
        context(platform.clone(), cores.clone(), FixedRestartOracle::power_on()),
        dir.path(),
    );
    let outcome = first_launch
        .run(registry.get(BUS_GATE_TEST).unwrap(), None)
        .await;
    assert!(
        matches!(outcome, TestOutcome::Failed(TestFailure::MissingFault { .. })),
        "{outcome}"
    );

    let faults = handler.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::BusStall);
    let record = faults[0].restart_record();
    assert_eq!(record.cause, RestartCause::Watchdog);

    let relaunch = orchestrator(
        context(platform.clone(), cores.clone(), FixedRestartOracle::new(record.clone())),
        dir.path(),
    );
    let outcome = relaunch
        .run(registry.get(BUS_GATE_TEST).unwrap(), Some(1))
        .await;
    assert!(matches!(outcome, TestOutcome::Passed), "{outcome}");

    // the same restart doesn't satisfy the cache variant
    let relaunch = orchestrator(
        context(platform, cores, FixedRestartOracle::new(record)),
        dir.path(),
    );
    let outcome = relaunch
        .run(registry.get(CACHE_FAULT_TEST).unwrap(), Some(1))
        .await;
    assert!(
        matches!(
            outcome,
            TestOutcome::Failed(TestFailure::WrongRestartCause { .. })
        ),
        "{outcome}"
    );
}

#[test]
fn progress_starts_from_launch_stage() {
    assert_eq!(StageProgress::on_launch(0), StageProgress::NotStarted);
    assert_eq!(
        StageProgress::on_launch(1),
        StageProgress::ProcessRestarted { next_stage: 1 }
    );
}
