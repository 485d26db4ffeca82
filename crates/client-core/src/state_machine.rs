use crate::{
    error::ClientError,
    types::{ClientCommand, ClientEvent, SessionState},
};

/// Session lifecycle state machine gating runtime commands.
///
/// Reads (channel list, history, pagination) are public and allowed in any
/// state; sending requires an authenticated session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }
}

impl SessionStateMachine {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn apply(&mut self, command: &ClientCommand) -> Result<Vec<ClientEvent>, ClientError> {
        use ClientCommand::*;

        match command {
            Login { .. } => self.transition_from_any_of(
                &[SessionState::Idle, SessionState::LoggedOut],
                SessionState::Authenticating,
                "login",
            ),
            Logout => self.transition_from_any_of(
                &[SessionState::Authenticating, SessionState::Authenticated],
                SessionState::LoggedOut,
                "logout",
            ),
            SendText { .. } | CreateChat { .. } => {
                if self.state == SessionState::Authenticated {
                    Ok(Vec::new())
                } else {
                    Err(ClientError::invalid_state(self.state, "send command"))
                }
            }
            ListChats | OpenChat { .. } | LoadOlder { .. } => Ok(Vec::new()),
        }
    }

    pub fn on_auth_result(&mut self, success: bool) -> Result<ClientEvent, ClientError> {
        if self.state != SessionState::Authenticating {
            return Err(ClientError::invalid_state(self.state, "on_auth_result"));
        }

        let next = if success {
            SessionState::Authenticated
        } else {
            SessionState::Idle
        };

        self.state = next;
        Ok(ClientEvent::StateChanged { state: next })
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[SessionState],
        next: SessionState,
        action: &str,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if !expected.contains(&self.state) {
            return Err(ClientError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(vec![ClientEvent::StateChanged { state: next }])
    }
}
