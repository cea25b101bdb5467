//! Change notifications emitted by [`MachineSettings`](super::MachineSettings).
//!
//! Listeners are called synchronously, in subscription order, at the point of
//! mutation. A listener running during profile activation may observe the
//! tree half reset; only `SettingsLoaded` and the return of
//! `set_active_profile` guarantee a consistent tree.

use crate::settings::value::SettingValue;

/// Events emitted by a machine's settings tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEvent {
    /// A setting's effective value changed.
    SettingChanged(SettingChangedEvent),

    /// A definition finished loading. Emitted once per load, after all
    /// inheritance and override layering.
    SettingsLoaded,
}

/// Emitted when a setting's effective value changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChangedEvent {
    pub key: String,
    /// New effective value (`None` when the setting has no default).
    pub value: Option<SettingValue>,
}

/// Callback type for receiving settings events.
pub type EventCallback = Box<dyn FnMut(&SettingsEvent)>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of subscribed callbacks.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, EventCallback)>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cid, _)| *cid != id);
        self.callbacks.len() < before
    }

    pub(crate) fn emit(&mut self, event: &SettingsEvent) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<SettingsEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: SettingsEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SettingsEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only SettingChanged events.
    pub fn setting_changed(&self) -> Vec<&SettingChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SettingsEvent::SettingChanged(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Count SettingsLoaded events.
    pub fn loaded_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SettingsEvent::SettingsLoaded))
            .count()
    }
}
