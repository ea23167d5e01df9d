//! Capability asking the shell's identity provider for a fresh bearer
//! token. The core never refreshes tokens itself; the shell either has a
//! valid one (refreshing if it must) or reports that the user is signed
//! out.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::IdToken;

#[derive(Clone)]
pub struct Auth<E> {
    context: CapabilityContext<AuthOperation, E>,
}

impl<Ev> Capability<Ev> for Auth<Ev> {
    type Operation = AuthOperation;
    type MappedSelf<MappedEv> = Auth<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Auth::new(self.context.map_event(f))
    }
}

impl<E> Auth<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<AuthOperation, E>) -> Self {
        Self { context }
    }

    pub fn get_valid_id_token<F>(&self, callback: F)
    where
        F: FnOnce(AuthResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(AuthOperation::GetValidIdToken)
                .await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthOperation {
    GetValidIdToken,
}

impl Operation for AuthOperation {
    type Output = AuthResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthOutput {
    Token(IdToken),
    /// No signed-in user, or the provider could not mint a token.
    Unavailable,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthError {
    #[error("identity provider unavailable: {reason}")]
    Provider { reason: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type AuthResult = Result<AuthOutput, AuthError>;
