pub mod books;
pub mod notifications;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use shelf_authz::{AuthContext, SessionStore};
use shelf_events::EventBus;
use shelf_kernel::settings::Settings;
use shelf_kernel::ModuleRegistry;

/// Domain events flowing over the in-process bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    UserRegistered { username: String, email: String },
}

/// The bus every module shares.
pub type SharedBus = Arc<EventBus<AppEvent>>;

/// Wire up the stores, auth context, and event bus, and register every
/// module with the registry.
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let bus: SharedBus = Arc::new(EventBus::new());
    let sessions = Arc::new(SessionStore::new());
    let auth = AuthContext::new(
        sessions,
        settings.auth.session_cookie.clone(),
        settings.auth.login_path.clone(),
    );

    let user_store = Arc::new(users::store::UserStore::new());
    let catalog = Arc::new(books::catalog::BookCatalog::new());
    let ledger = Arc::new(reviews::ReviewLedger::new());
    let mailer: Arc<dyn notifications::Mailer> = Arc::new(notifications::LogMailer);

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(users::UsersModule::new(
        user_store,
        auth.clone(),
        bus.clone(),
    )));
    registry.register(Arc::new(books::BooksModule::new(
        catalog,
        ledger,
        auth,
        settings.catalog.clone(),
    )));
    registry.register(Arc::new(notifications::NotificationsModule::new(
        bus,
        mailer,
        settings.mail.from_address.clone(),
    )));

    registry
}
