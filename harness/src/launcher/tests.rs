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

use std::time::Duration;

use cpu_utils::pinning;
use cpu_utils::priority::WorkerPriority;
use cpu_utils::CPUTopology;
use cpu_utils::LogicalCoreId;

use test_log::test;

use super::*;
use crate::channel;

fn params(core_id: LogicalCoreId) -> LaunchParams {
    LaunchParams {
        core_id,
        priority: WorkerPriority::Normal,
        stack_size: 64 * 1024,
        name: format!("test-worker-{core_id}"),
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn worker_runs_on_requested_core() {
    let topology = CPUTopology::new().unwrap();
    let launcher = WorkerLauncher::new(topology.clone());

    for &core_id in topology.logical_cores().iter() {
        let (inlet, mut outlet) = channel::channel();
        let worker = launcher
            .launch(params(core_id), move |pinned_to| {
                inlet.send((pinned_to, pinning::current_core())).unwrap();
            })
            .await
            .unwrap();

        assert_eq!(worker.core_id(), core_id);
        let (pinned_to, observed) = outlet.receive(Duration::from_secs(5)).await.unwrap();
        assert_eq!(pinned_to, core_id);
        assert_eq!(observed, Some(core_id));
        worker.join().await.unwrap();
    }
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn unknown_core_is_rejected() {
    let topology = CPUTopology::new().unwrap();
    let launcher = WorkerLauncher::new(topology);

    let result = launcher
        .launch(params(LogicalCoreId::new(u32::MAX)), |_| {})
        .await;
    assert!(matches!(result, Err(LaunchError::CoreNotAvailable(_))));
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn panicked_worker_is_reported_on_join() {
    let topology = CPUTopology::new().unwrap();
    let core_id = *topology.logical_cores().first();
    let launcher = WorkerLauncher::new(topology);

    let worker = launcher
        .launch(params(core_id), |_| panic!("worker panicked on purpose"))
        .await
        .unwrap();

    let result = worker.join().await;
    assert!(matches!(result, Err(LaunchError::WorkerDied { .. })));
}
