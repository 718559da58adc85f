use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use account_service::config::Config;
use account_service::config::MASTER_KEY_ENV;
use account_service::domain::principal::errors::NotificationError;
use account_service::domain::principal::errors::PrincipalError;
use account_service::domain::principal::models::EmailAddress;
use account_service::domain::principal::models::Principal;
use account_service::domain::principal::models::PrincipalId;
use account_service::domain::principal::models::Role;
use account_service::domain::principal::models::Username;
use account_service::domain::principal::notifications::Notification;
use account_service::domain::principal::ports::CredentialStore;
use account_service::domain::principal::ports::NotificationSender;
use account_service::domain::principal::ports::PrincipalLookup;
use account_service::domain::principal::service::CredentialService;
use account_service::inbound::http::context::AccessDenied;
use account_service::inbound::http::context::SecurityContext;
use account_service::inbound::http::middleware::with_authentication;
use account_service::inbound::http::middleware::AuthenticationInterceptor;
use async_trait::async_trait;
use axum::body::Body;
use axum::body::{self};
use axum::extract::Request;
use axum::http::header;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use config::FileFormat;
use credentials::Authenticator;
use credentials::SecretCipher;
use tower::ServiceExt;

pub const MASTER_KEY: &str = "integration master key";
pub const JWT_SECRET: &str = "integration_secret_key_of_32_bytes!";
pub const PASSWORD: &str = "Tr0ub4dor&3xqz";

/// Principals and password hashes held in memory.
#[derive(Default)]
pub struct InMemoryAccounts {
    principals: RwLock<HashMap<String, Principal>>,
    hashes: RwLock<HashMap<PrincipalId, String>>,
}

impl InMemoryAccounts {
    pub fn insert(&self, principal: Principal, password_hash: String) {
        self.hashes
            .write()
            .unwrap()
            .insert(principal.id, password_hash);
        self.principals
            .write()
            .unwrap()
            .insert(principal.username.as_str().to_string(), principal);
    }

    pub fn principal(&self, username: &str) -> Principal {
        self.principals.read().unwrap()[username].clone()
    }
}

#[async_trait]
impl PrincipalLookup for InMemoryAccounts {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Principal>, PrincipalError> {
        Ok(self.principals.read().unwrap().get(subject).cloned())
    }
}

#[async_trait]
impl CredentialStore for InMemoryAccounts {
    async fn create(
        &self,
        principal: Principal,
        password_hash: String,
    ) -> Result<Principal, PrincipalError> {
        if self
            .principals
            .read()
            .unwrap()
            .contains_key(principal.username.as_str())
        {
            return Err(PrincipalError::AlreadyExists(principal.username.to_string()));
        }

        self.insert(principal.clone(), password_hash);
        Ok(principal)
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Principal>, PrincipalError> {
        Ok(self
            .principals
            .read()
            .unwrap()
            .values()
            .find(|principal| principal.email == *email)
            .cloned())
    }

    async fn find_password_hash(&self, id: &PrincipalId) -> Result<Option<String>, PrincipalError> {
        Ok(self.hashes.read().unwrap().get(id).cloned())
    }

    async fn update_password_hash(
        &self,
        id: &PrincipalId,
        password_hash: String,
    ) -> Result<(), PrincipalError> {
        match self.hashes.write().unwrap().get_mut(id) {
            Some(stored) => {
                *stored = password_hash;
                Ok(())
            }
            None => Err(PrincipalError::NotFound(id.to_string())),
        }
    }
}

/// Records every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RwLock<Vec<Notification>>,
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.write().unwrap().push(notification.clone());
        Ok(())
    }
}

pub type Service = CredentialService<InMemoryAccounts, InMemoryAccounts, RecordingNotifier>;

/// Fully wired application over in-memory adapters.
pub struct TestApp {
    pub config: Config,
    pub accounts: Arc<InMemoryAccounts>,
    pub notifier: Arc<RecordingNotifier>,
    pub authenticator: Arc<Authenticator>,
    pub service: Service,
    pub router: Router,
}

impl TestApp {
    /// Build the app from configuration whose signing secret is stored encrypted.
    pub fn spawn() -> Self {
        let sealed = SecretCipher::new()
            .seal(JWT_SECRET, MASTER_KEY)
            .expect("Failed to seal secret");
        let toml = format!("[jwt]\nsecret = \"{}\"\nissuer = \"accounts\"\n", sealed);

        let configuration = config::Config::builder()
            .add_source(config::File::from_str(&toml, FileFormat::Toml))
            .build()
            .expect("Failed to build configuration");
        let config = temp_env::with_var(MASTER_KEY_ENV, Some(MASTER_KEY), || {
            Config::from_configuration(configuration)
        })
        .expect("Failed to resolve configuration");

        let authenticator = Arc::new(config.authenticator().expect("Invalid signing secret"));
        let accounts = Arc::new(InMemoryAccounts::default());
        let notifier = Arc::new(RecordingNotifier::default());

        accounts.insert(
            principal("alice", vec![Role::user()]),
            authenticator.hash_password(PASSWORD).unwrap(),
        );
        accounts.insert(
            principal("root", vec![Role::user(), Role::admin()]),
            authenticator.hash_password(PASSWORD).unwrap(),
        );

        let service = CredentialService::new(
            Arc::clone(&accounts),
            Arc::clone(&accounts),
            Arc::clone(&notifier),
            Arc::clone(&authenticator),
        );

        let interceptor =
            AuthenticationInterceptor::new(Arc::clone(&authenticator), Arc::clone(&accounts));
        let routes = Router::new()
            .route("/me", get(me))
            .route("/admin", get(admin));
        let router = with_authentication(routes, interceptor);

        Self {
            config,
            accounts,
            notifier,
            authenticator,
            service,
            router,
        }
    }

    /// GET `path`, returning status and body text.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .expect("Failed to execute request");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

pub fn principal(username: &str, roles: Vec<Role>) -> Principal {
    Principal {
        id: PrincipalId::new(),
        username: Username::new(username.to_string()).unwrap(),
        email: EmailAddress::new(format!("{}@example.com", username)).unwrap(),
        roles,
        created_at: Utc::now(),
    }
}

async fn me(context: SecurityContext) -> Result<String, AccessDenied> {
    Ok(context.require_principal()?.username.to_string())
}

async fn admin(context: SecurityContext) -> Result<&'static str, AccessDenied> {
    context.require_role("ADMIN")?;
    Ok("welcome")
}
