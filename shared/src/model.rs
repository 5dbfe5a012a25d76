use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chat::ChatBook;
use crate::config::CoreConfig;
use crate::notifications::NotificationBus;
use crate::presence::PresenceStore;
use crate::session::SessionCoordinator;
use crate::sos::SosWorkflow;
use crate::tips::TipsWorkflow;
use crate::view::Screen;
use crate::UnixTimeMs;

/// All core state. Only [`crate::App::update`] mutates it.
#[derive(Debug)]
pub struct Model {
    pub config: CoreConfig,
    pub presence: PresenceStore,
    pub notifications: NotificationBus,
    pub sessions: SessionCoordinator,
    pub chats: ChatBook,
    pub sos: SosWorkflow,
    pub tips: TipsWorkflow,
    pub screen: Screen,
    pub started: bool,
    /// An `IncomingSimulationDue` timer is outstanding.
    pub simulation_pending: bool,
    pub now: UnixTimeMs,
    pub rng: StdRng,
}

impl Default for Model {
    fn default() -> Self {
        let now = UnixTimeMs::now();
        Self {
            config: CoreConfig::default(),
            presence: PresenceStore::default_roster(now),
            notifications: NotificationBus::default(),
            sessions: SessionCoordinator::default(),
            chats: ChatBook::default(),
            sos: SosWorkflow::default(),
            tips: TipsWorkflow::default(),
            screen: Screen::default(),
            started: false,
            simulation_pending: false,
            now,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Model {
    /// Advances the model clock. The clock never goes backwards.
    pub fn update_timestamp(&mut self) {
        self.now = self.now.max(UnixTimeMs::now());
    }

    pub fn apply_config(&mut self, config: CoreConfig) {
        if let Some(seed) = config.rng_seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.config = config;
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.sessions.is_busy()
    }

    /// Whether a simulated or signalled inbound session may be presented now.
    #[must_use]
    pub fn accepts_inbound(&self) -> bool {
        !self.sessions.is_busy() && !self.sos.is_active() && self.screen != Screen::Chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::MemberId;
    use rand::Rng;

    #[test]
    fn test_default_model() {
        let m = Model::default();
        assert!(!m.started);
        assert!(!m.is_busy());
        assert_eq!(m.screen, Screen::Dashboard);
        assert!(m.accepts_inbound());
    }

    #[test]
    fn test_seeded_config_is_deterministic() {
        let config = CoreConfig {
            rng_seed: Some(11),
            ..CoreConfig::default()
        };
        let mut a = Model::default();
        let mut b = Model::default();
        a.apply_config(config.clone());
        b.apply_config(config);
        assert_eq!(a.rng.gen::<u64>(), b.rng.gen::<u64>());
    }

    #[test]
    fn test_inbound_blocked_in_chat_or_busy() {
        let mut m = Model::default();
        m.screen = Screen::Chat;
        assert!(!m.accepts_inbound());

        let mut m = Model::default();
        m.sessions.start_call(MemberId(1)).unwrap();
        assert!(!m.accepts_inbound());
    }
}
