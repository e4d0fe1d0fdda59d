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
use std::time::Instant;

use super::*;

const SCHEDULING_SLACK: Duration = Duration::from_millis(500);

#[tokio::test]
async fn value_is_delivered() {
    let (inlet, mut outlet) = channel();

    inlet.send(true).unwrap();
    let value = outlet.receive(Duration::from_secs(1)).await.unwrap();
    assert!(value);
}

#[tokio::test]
async fn second_send_before_drain_fails() {
    let (inlet, mut outlet) = channel();

    inlet.send(1u32).unwrap();
    assert_eq!(inlet.send(2u32), Err(ChannelError::Full));

    assert_eq!(outlet.receive(Duration::from_secs(1)).await, Ok(1));
    // the slot is free again after the value was drained
    inlet.send(3u32).unwrap();
    assert_eq!(outlet.receive(Duration::from_secs(1)).await, Ok(3));
}

#[tokio::test]
async fn receive_is_bounded() {
    let (_inlet, mut outlet) = channel::<bool>();
    let timeout = Duration::from_millis(50);

    let started = Instant::now();
    let result = outlet.receive(timeout).await;
    let elapsed = started.elapsed();

    assert_eq!(result, Err(ChannelError::timeout(timeout)));
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + SCHEDULING_SLACK, "waited {elapsed:?}");
}

#[tokio::test]
async fn dropped_worker_is_distinct_from_timeout() {
    let (inlet, mut outlet) = channel::<bool>();
    drop(inlet);

    let result = outlet.receive(Duration::from_secs(1)).await;
    assert_eq!(result, Err(ChannelError::WorkerGone));
}

#[tokio::test]
async fn send_from_plain_thread() {
    let (inlet, mut outlet) = channel();

    std::thread::spawn(move || inlet.send(false).unwrap());

    let value = outlet.receive(Duration::from_secs(1)).await.unwrap();
    assert!(!value);
}

#[tokio::test]
async fn send_after_orchestrator_left_fails() {
    let (inlet, outlet) = channel();
    drop(outlet);

    assert_eq!(inlet.send(true), Err(ChannelError::Closed));
}
