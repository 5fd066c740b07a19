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

//! At most one population per key: later callers wait for the first.

use clockwork_core::asset::AssetKey;
use clockwork_data::assets::CachedAsset;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// The shared result of one population. Errors travel as their rendered
/// message so every waiter can own a copy.
pub(crate) type FlightOutcome = Result<CachedAsset, Arc<str>>;

#[derive(Default)]
pub(crate) struct Flight {
    outcome: Mutex<Option<FlightOutcome>>,
    done: Condvar,
}

impl Flight {
    /// Blocks until the leader publishes its outcome.
    pub(crate) fn wait(&self) -> FlightOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn publish(&self, outcome: FlightOutcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.done.notify_all();
    }
}

/// The caller's part in a population.
pub(crate) enum Role<'a> {
    /// This caller loads and must complete the guard.
    Leader(FlightGuard<'a>),
    /// Another caller is loading; wait on the flight.
    Follower(Arc<Flight>),
}

/// Populations currently in progress, by key.
#[derive(Default)]
pub(crate) struct InFlight {
    flights: Mutex<HashMap<AssetKey, Arc<Flight>>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashMap<AssetKey, Arc<Flight>>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the population of `key`, leading it if none is running.
    pub(crate) fn join(&self, key: &AssetKey) -> Role<'_> {
        let mut flights = self.lock();
        if let Some(flight) = flights.get(key) {
            return Role::Follower(flight.clone());
        }
        let flight = Arc::new(Flight::default());
        flights.insert(key.clone(), flight.clone());
        Role::Leader(FlightGuard {
            owner: self,
            key: key.clone(),
            flight,
            completed: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Held by the leader. Publishing wakes every follower; dropping it
/// unpublished fails them instead of leaving them blocked.
pub(crate) struct FlightGuard<'a> {
    owner: &'a InFlight,
    key: AssetKey,
    flight: Arc<Flight>,
    completed: bool,
}

impl FlightGuard<'_> {
    pub(crate) fn complete(mut self, outcome: FlightOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: FlightOutcome) {
        self.completed = true;
        self.owner.lock().remove(&self.key);
        self.flight.publish(outcome);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let message = format!("population of '{}' was abandoned", self.key);
            self.finish(Err(message.into()));
        }
    }
}
