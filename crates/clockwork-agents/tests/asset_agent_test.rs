// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use clockwork_agents::asset_agent::{AssetAgent, MemoryLocator};
use clockwork_agents::AgentConfig;
use clockwork_core::asset::{Asset, AssetKey, AssetLoader};
use clockwork_data::{CacheConfig, CachePolicy};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// --- Test Setup: Dummy Asset and a gated, counting Loader ---
#[derive(Debug, PartialEq)]
struct Heightmap {
    samples: Vec<u8>,
}
impl Asset for Heightmap {}

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.signal.notify_all();
    }

    fn pass(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.signal.wait(open).unwrap();
        }
    }
}

struct HeightmapLoader {
    calls: Arc<AtomicUsize>,
    gate: Arc<Gate>,
    fail: bool,
}

impl AssetLoader<Heightmap> for HeightmapLoader {
    fn load(
        &self,
        _key: &AssetKey,
        bytes: &[u8],
    ) -> Result<Heightmap, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass();
        if self.fail {
            return Err("heightmap header is damaged".into());
        }
        Ok(Heightmap {
            samples: bytes.to_vec(),
        })
    }
}
// ---

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn agent_with(fail: bool) -> (Arc<AssetAgent>, Arc<AtomicUsize>, Arc<Gate>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Gate::default());
    let locator = MemoryLocator::new();
    locator.insert("terrain/valley.hmap", vec![1, 2, 3, 4]);

    let mut agent = AssetAgent::new(CacheConfig::default().build().unwrap());
    agent.register_locator(locator);
    agent.register_loader(
        "hmap",
        HeightmapLoader {
            calls: calls.clone(),
            gate: gate.clone(),
            fail,
        },
    );
    (Arc::new(agent), calls, gate)
}

/// Opens the gate once every other thread is waiting on the in-flight load.
fn release_when_coalesced(agent: &AssetAgent, gate: &Gate, followers: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while agent.stats().coalesced < followers {
        assert!(Instant::now() < deadline, "followers never joined the load");
        thread::sleep(Duration::from_millis(1));
    }
    gate.open();
}

const THREADS: usize = 8;

#[test]
fn test_concurrent_misses_populate_once() -> Result<()> {
    init_logging();
    let (agent, calls, gate) = agent_with(false);
    let key = AssetKey::new("terrain/valley.hmap");

    let handles = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| agent.load_shared::<Heightmap>(&key)))
            .collect();
        release_when_coalesced(&agent, &gate, THREADS as u64 - 1);
        workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .collect::<Result<Vec<_>>>()
    })?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|h| h.ptr_eq(&handles[0])));
    assert_eq!(handles[0].samples, vec![1, 2, 3, 4]);

    let stats = agent.stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.misses, THREADS as u64);
    assert_eq!(stats.coalesced, THREADS as u64 - 1);

    // Later requests are plain hits.
    let again = agent.load_shared::<Heightmap>(&key)?;
    assert!(again.ptr_eq(&handles[0]));
    assert_eq!(agent.stats().hits, 1);
    assert!(agent.check_consistency().is_empty());
    Ok(())
}

#[test]
fn test_failed_population_is_shared_with_every_waiter() {
    init_logging();
    let (agent, calls, gate) = agent_with(true);
    let key = AssetKey::new("terrain/valley.hmap");

    let results = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| agent.load_shared::<Heightmap>(&key)))
            .collect();
        release_when_coalesced(&agent, &gate, THREADS as u64 - 1);
        workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("heightmap header is damaged"), "{message}");
    }
    assert_eq!(agent.stats().failures, 1);
    assert!(agent.cache().is_empty());
}

#[test]
fn test_missing_asset_and_missing_loader_are_errors() {
    init_logging();
    let (agent, _calls, gate) = agent_with(false);
    gate.open();

    let err = agent
        .load_shared::<Heightmap>(&AssetKey::new("terrain/ridge.hmap"))
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");

    let locator = MemoryLocator::new();
    locator.insert("terrain/ridge.png", vec![0]);
    let mut agent = AssetAgent::new(CacheConfig::default().build().unwrap());
    agent.register_locator(locator);
    let err = agent
        .load_shared::<Heightmap>(&AssetKey::new("terrain/ridge.png"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("No loader registered"), "{err:#}");
}

#[test]
fn test_from_config_reads_files_under_the_asset_root() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("terrain"))?;
    std::fs::write(dir.path().join("terrain/dunes.hmap"), [9u8, 8, 7])?;

    let config = AgentConfig {
        cache: CacheConfig {
            policy: CachePolicy::Lru { capacity: 4 },
            ..Default::default()
        },
        asset_root: Some(dir.path().to_path_buf()),
    };
    let mut agent = AssetAgent::from_config(&config)?;
    let gate = Arc::new(Gate::default());
    gate.open();
    agent.register_loader(
        "hmap",
        HeightmapLoader {
            calls: Arc::new(AtomicUsize::new(0)),
            gate,
            fail: false,
        },
    );

    let map = agent.load_shared::<Heightmap>(&AssetKey::new("terrain/dunes.hmap"))?;
    assert_eq!(map.samples, vec![9, 8, 7]);
    assert_eq!(agent.cache().policy_name(), "lru");
    Ok(())
}
