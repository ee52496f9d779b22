//! In-memory wiring of the payment and notification services
//!
//! Tests keep handles on the scripted collaborators to queue responses and
//! count calls after driving the services.

use std::sync::Arc;

use domain_notification::{
    InMemoryUserDirectory, NotificationService, RecipientProfile, RecordingPushSender,
};
use domain_payment::{
    CallbackVerifier, InMemoryIntentStore, OrchestratorConfig, PaymentIntent, PaymentOrchestrator,
    ScriptedGateway,
};

use crate::fixtures::SecretFixtures;

/// Orchestrator over an in-memory store and a scripted gateway
pub struct PaymentHarness {
    pub store: Arc<InMemoryIntentStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub orchestrator: Arc<PaymentOrchestrator>,
}

impl PaymentHarness {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self::assemble(InMemoryIntentStore::new(), ScriptedGateway::new(), config)
    }

    /// Harness whose store already holds `intents`
    pub async fn seeded(intents: Vec<PaymentIntent>) -> Self {
        Self::assemble(
            InMemoryIntentStore::with_intents(intents).await,
            ScriptedGateway::new(),
            OrchestratorConfig::default(),
        )
    }

    /// Harness with a caller-built gateway, e.g. one with a delay
    pub fn with_gateway(gateway: ScriptedGateway, config: OrchestratorConfig) -> Self {
        Self::assemble(InMemoryIntentStore::new(), gateway, config)
    }

    fn assemble(store: InMemoryIntentStore, gateway: ScriptedGateway, config: OrchestratorConfig) -> Self {
        let store = Arc::new(store);
        let gateway = Arc::new(gateway);
        let orchestrator = Arc::new(PaymentOrchestrator::new(store.clone(), gateway.clone(), config));
        Self {
            store,
            gateway,
            orchestrator,
        }
    }

    /// Callback verifier sharing this harness's orchestrator
    pub fn callback_verifier(&self) -> CallbackVerifier {
        CallbackVerifier::new(SecretFixtures::CALLBACK_SECRET, self.orchestrator.clone())
    }
}

impl Default for PaymentHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification service over an in-memory directory and a recording sender
pub struct NotificationHarness {
    pub directory: Arc<InMemoryUserDirectory>,
    pub sender: Arc<RecordingPushSender>,
    pub service: Arc<NotificationService>,
}

impl NotificationHarness {
    pub async fn with_profiles(profiles: Vec<RecipientProfile>) -> Self {
        Self::assemble(profiles, RecordingPushSender::new()).await
    }

    /// Harness whose every delivery fails with `reason`
    pub async fn failing(profiles: Vec<RecipientProfile>, reason: &str) -> Self {
        Self::assemble(profiles, RecordingPushSender::failing(reason)).await
    }

    async fn assemble(profiles: Vec<RecipientProfile>, sender: RecordingPushSender) -> Self {
        let directory = Arc::new(InMemoryUserDirectory::with_profiles(profiles).await);
        let sender = Arc::new(sender);
        let service = Arc::new(NotificationService::new(directory.clone(), sender.clone()));
        Self {
            directory,
            sender,
            service,
        }
    }
}
