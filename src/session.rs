//! Session state machine.
//!
//! anonymous -> authenticating -> authenticated(role) -> anonymous.
//!
//! Sign-in resolves the role from the user directory record; an identity
//! with no record fails with `NoRoleRecord` and no default role is ever
//! assumed. Registration creates the user record first, then behaves as a
//! sign-in success. Sign-out returns to anonymous and is pushed to every
//! auth observer, so a mounted dashboard tears its feeds down even when
//! something other than its own surface ended the session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Role, UserRecord};
use crate::remote::{IdentityProvider, Subscription, UserCollection};

/// Callback receiving the resolved identity on every auth-state change:
/// `Some` on a successful sign-in or registration, `None` on sign-out.
pub type AuthObserver = Arc<dyn Fn(Option<&SessionUser>) + Send + Sync>;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolved identity of the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub admin: bool,
}

impl SessionUser {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            role: record.role,
            admin: record.admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(SessionUser),
}

/// Authentication session over the identity provider and user directory.
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserCollection>,
    state: SessionState,
    observers: Arc<Mutex<HashMap<Uuid, AuthObserver>>>,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UserCollection>) -> Self {
        Self {
            provider,
            users,
            state: SessionState::Anonymous,
            observers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Watch auth-state changes. The observer receives the current state
    /// immediately and again on every later sign-in or sign-out.
    pub fn subscribe(&self, observer: AuthObserver) -> Subscription {
        let token = Uuid::new_v4();
        guard(&self.observers).insert(token, Arc::clone(&observer));
        observer(self.current());

        let weak: Weak<Mutex<HashMap<Uuid, AuthObserver>>> = Arc::downgrade(&self.observers);
        Subscription::new(move || {
            if let Some(observers) = weak.upgrade() {
                guard(&observers).remove(&token);
            }
        })
    }

    fn notify(&self, user: Option<&SessionUser>) {
        let observers: Vec<AuthObserver> = guard(&self.observers).values().cloned().collect();
        for observer in observers {
            observer(user);
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&SessionUser> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Authenticate and resolve the role record. On any failure the
    /// session falls back to anonymous.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<SessionUser> {
        self.state = SessionState::Authenticating;

        let id = match self.provider.sign_in(email, password) {
            Ok(id) => id,
            Err(err) => {
                self.state = SessionState::Anonymous;
                return Err(err);
            }
        };

        self.resolve(&id)
    }

    /// Create the identity and its directory record, then behave as a
    /// sign-in success.
    pub fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        admin: bool,
    ) -> Result<SessionUser> {
        self.state = SessionState::Authenticating;

        let id = match self.provider.register(email, password) {
            Ok(id) => id,
            Err(err) => {
                self.state = SessionState::Anonymous;
                return Err(err);
            }
        };

        let record = UserRecord {
            id: id.clone(),
            name: name.to_string(),
            email: Some(email.to_string()),
            role,
            admin,
        };
        if let Err(err) = self.users.create(record) {
            self.state = SessionState::Anonymous;
            return Err(err);
        }

        self.resolve(&id)
    }

    fn resolve(&mut self, id: &str) -> Result<SessionUser> {
        match self.users.get(id) {
            Ok(Some(record)) => {
                let user = SessionUser::from_record(&record);
                self.state = SessionState::Authenticated(user.clone());
                self.notify(Some(&user));
                Ok(user)
            }
            Ok(None) => {
                // Unrecoverable for this session: no default role.
                self.state = SessionState::Anonymous;
                Err(Error::NoRoleRecord(id.to_string()))
            }
            Err(err) => {
                self.state = SessionState::Anonymous;
                Err(err)
            }
        }
    }

    /// Tear down the session and broadcast the signed-out state; dashboards
    /// subscribed to this session release their feeds on that delivery.
    pub fn sign_out(&mut self) {
        self.provider.sign_out();
        self.state = SessionState::Anonymous;
        self.notify(None);
    }

    pub fn change_password(&self, new_password: &str) -> Result<()> {
        if self.current().is_none() {
            return Err(Error::NotSignedIn);
        }
        self.provider.change_password(new_password)
    }
}
