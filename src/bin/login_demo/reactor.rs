//! Login screen reactor.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::StreamExt;

use flowreactor::{mutations, MutateContext, MutationStream, Reactor, Routed};

use crate::contacts::ContactService;

const ACCOUNT_KIND: &str = "flowreactor.login_demo";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    EnterScreen,
    UsernameChanged(String),
    PasswordChanged(String),
    Login,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetUsername(String),
    SetPassword(String),
    SetBusy(bool),
    SetAutoCompleteEmails(Vec<String>),
    EmitEffect(Effect),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowError(String),
    LoggedIn { account: Account },
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub username: String,
    pub password: String,
    pub is_username_valid: bool,
    pub is_password_valid: bool,
    pub is_busy: bool,
    pub auto_complete_emails: Option<Vec<String>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            is_username_valid: true,
            is_password_valid: true,
            is_busy: false,
            auto_complete_emails: None,
        }
    }
}

impl State {
    pub fn login_enabled(&self) -> bool {
        self.is_username_valid
            && !self.username.is_empty()
            && self.is_password_valid
            && !self.password.is_empty()
            && !self.is_busy
    }

    pub fn username_enabled(&self) -> bool {
        !self.is_busy
    }

    pub fn password_enabled(&self) -> bool {
        !self.is_busy
    }
}

pub struct LoginReactor {
    contacts: Arc<dyn ContactService>,
    login_delay: Duration,
}

impl LoginReactor {
    pub fn new(contacts: Arc<dyn ContactService>, login_delay: Duration) -> Self {
        Self {
            contacts,
            login_delay,
        }
    }
}

impl Reactor for LoginReactor {
    type Action = Action;
    type Mutation = Mutation;
    type State = State;
    type Effect = Effect;

    fn mutate(&self, ctx: MutateContext<State>, action: Action) -> anyhow::Result<MutationStream<Mutation>> {
        match action {
            Action::EnterScreen => {
                let contacts = Arc::clone(&self.contacts);
                Ok(mutations::try_from_stream(stream::once(async move {
                    contacts
                        .load_emails()
                        .await
                        .map(Mutation::SetAutoCompleteEmails)
                })))
            }
            Action::UsernameChanged(username) => Ok(mutations::just(Mutation::SetUsername(username))),
            Action::PasswordChanged(password) => Ok(mutations::just(Mutation::SetPassword(password))),
            Action::Login => {
                let contacts = Arc::clone(&self.contacts);
                let delay = self.login_delay;
                Ok(mutations::from_stream(async_stream::stream! {
                    yield Mutation::SetBusy(true);
                    let state = ctx.current_state();
                    let attempt = authenticate(contacts.as_ref(), &state.username, &state.password, delay);
                    match ctx.run_until_cancelled(attempt).await {
                        Some(Ok(account)) => {
                            yield Mutation::EmitEffect(Effect::LoggedIn { account });
                        }
                        Some(Err(err)) => {
                            yield Mutation::EmitEffect(Effect::ShowError(err.to_string()));
                        }
                        None => tracing::debug!("Login attempt superseded"),
                    }
                    yield Mutation::SetBusy(false);
                }))
            }
        }
    }

    fn reduce(&self, state: &State, mutation: Mutation) -> anyhow::Result<State> {
        let mut next = state.clone();
        match mutation {
            Mutation::SetUsername(username) => {
                next.is_username_valid = !username.trim().is_empty();
                next.username = username;
            }
            Mutation::SetPassword(password) => {
                next.is_password_valid = !password.trim().is_empty();
                next.password = password;
            }
            Mutation::SetBusy(busy) => next.is_busy = busy,
            Mutation::SetAutoCompleteEmails(emails) => next.auto_complete_emails = Some(emails),
            Mutation::EmitEffect(_) => {}
        }
        Ok(next)
    }

    fn route(&self, mutation: Mutation) -> Routed<Mutation, Effect> {
        match mutation {
            Mutation::EmitEffect(effect) => Routed::Effect(effect),
            other => Routed::Fold(other),
        }
    }

    fn transform_states(&self, states: BoxStream<'static, State>) -> BoxStream<'static, State> {
        states
            .inspect(|state| {
                tracing::debug!(
                    username = %state.username,
                    busy = state.is_busy,
                    login_enabled = state.login_enabled(),
                    "State transformed"
                );
            })
            .boxed()
    }
}

async fn authenticate(
    contacts: &dyn ContactService,
    username: &str,
    password: &str,
    delay: Duration,
) -> anyhow::Result<Account> {
    tracing::info!(username = %username, delay = ?delay, "Logging in");
    tokio::time::sleep(delay).await;

    if password.trim().is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let known = contacts.load_emails().await?;
    if !known.iter().any(|email| email == username) {
        anyhow::bail!("unknown account {username}");
    }

    Ok(Account {
        name: username.to_string(),
        kind: ACCOUNT_KIND.to_string(),
    })
}
