//! Energy quota: a daily-resetting budget that gates every costed AI action.
//!
//! The stored state carries the calendar day it belongs to. Every read
//! re-checks that day against the clock, so the budget becomes full again the
//! first time it is looked at after midnight rather than at midnight itself.
//! Premium profiles are never metered.
//!
//! `consume` is a compare-and-swap loop over the stored value, so two callers
//! sharing one store cannot both spend the same remaining budget.

pub mod costs;
pub mod handlers;
pub mod messages;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub use costs::Action;

use crate::clock::Clock;
use crate::models::{EnergyState, FULL_ENERGY};
use crate::storage::LocalRepository;

/// Bound on optimistic retries when another writer keeps winning the swap.
const MAX_SWAP_ATTEMPTS: u32 = 5;

/// Published whenever the stored budget changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnergyChanged {
    pub date: NaiveDate,
    pub current: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnergyReport {
    pub current: u32,
    pub max: u32,
    pub unlimited: bool,
    pub display: String,
}

pub struct QuotaLedger {
    local: Arc<LocalRepository>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<EnergyChanged>,
}

impl QuotaLedger {
    pub fn new(local: Arc<LocalRepository>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            local,
            clock,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnergyChanged> {
        self.events.subscribe()
    }

    /// Reads the privilege flag from the locally cached profile. An unreadable
    /// profile counts as not premium.
    pub async fn is_premium(&self) -> bool {
        match self.local.load_profile().await {
            Ok(profile) => profile.is_some_and(|p| p.is_premium),
            Err(e) => {
                debug!("Profile unreadable while checking premium: {e}");
                false
            }
        }
    }

    pub async fn get_energy(&self) -> u32 {
        if self.is_premium().await {
            return FULL_ENERGY;
        }
        self.metered_energy().await
    }

    pub async fn can_afford(&self, action: Action) -> bool {
        if self.is_premium().await {
            return true;
        }
        self.metered_energy().await >= action.cost()
    }

    /// Charges `action` against today's budget. Returns `false` without
    /// touching state when the budget is short.
    pub async fn consume(&self, action: Action) -> bool {
        if self.is_premium().await {
            return true;
        }

        let cost = action.cost();
        let today = self.clock.today();

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let snapshot = match self.local.energy_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!("Energy state unreadable, allowing {action}: {e}");
                    return true;
                }
            };

            let current = snapshot
                .state
                .map_or(FULL_ENERGY, |s| s.remaining_on(today));
            if current < cost {
                debug!("Denied {action}: cost {cost}, remaining {current}");
                return false;
            }

            let next = EnergyState {
                date: today,
                current: current.saturating_sub(cost),
            };
            match self.local.swap_energy(snapshot.raw.as_deref(), &next).await {
                Ok(true) => {
                    info!("Consumed {cost} energy for {action}, {} left", next.current);
                    self.notify(next);
                    return true;
                }
                Ok(false) => {
                    debug!("Energy changed concurrently (attempt {attempt}), retrying");
                }
                Err(e) => {
                    error!("Failed to persist energy for {action}, allowing: {e}");
                    return true;
                }
            }
        }

        warn!("Energy update for {action} lost {MAX_SWAP_ATTEMPTS} races, denying");
        false
    }

    /// Writes a full budget dated today.
    pub async fn reset_energy(&self) {
        let state = EnergyState::full(self.clock.today());
        match self.local.store_energy(&state).await {
            Ok(()) => self.notify(state),
            Err(e) => warn!("Failed to reset energy: {e}"),
        }
    }

    pub fn depleted_message(&self) -> &'static str {
        messages::random_depleted_message()
    }

    pub async fn report(&self) -> EnergyReport {
        if self.is_premium().await {
            return EnergyReport {
                current: FULL_ENERGY,
                max: FULL_ENERGY,
                unlimited: true,
                display: format!("{FULL_ENERGY}/∞"),
            };
        }
        let current = self.metered_energy().await;
        EnergyReport {
            current,
            max: FULL_ENERGY,
            unlimited: false,
            display: format!("{current}/{FULL_ENERGY}"),
        }
    }

    /// Remaining budget for a non-premium caller. Absent, corrupt or stale
    /// state is rewritten as a full budget before returning.
    async fn metered_energy(&self) -> u32 {
        let today = self.clock.today();
        match self.local.energy_snapshot().await {
            Ok(snapshot) => match snapshot.state {
                Some(state) if state.date == today => state.remaining_on(today),
                _ => {
                    self.reset_energy().await;
                    FULL_ENERGY
                }
            },
            Err(e) => {
                warn!("Energy state unreadable, treating as full: {e}");
                FULL_ENERGY
            }
        }
    }

    fn notify(&self, state: EnergyState) {
        // No subscribers is fine.
        let _ = self.events.send(EnergyChanged {
            date: state.date,
            current: state.current,
        });
    }
}
