//! The diagnostic probe sequence
//!
//! Probes run one after another. A failed probe never stops the run; the only
//! dependency is that user-token probes need the test user to be registered.

use auth::AuthError;

use crate::client::{AdminClient, Credentials, ProbeFailure};
use crate::commands::{
    CreateRoom, GetRoomOccupants, GetRoomOptions, MessageType, MucOnlineRooms, Register,
    SendMessage, Status,
};
use crate::config::ProbeConfig;
use crate::outcome::{Expectation, ProbeOutcome, ProbeReport};

/// Probe names, in execution order
pub mod names {
    pub const API_ROOT: &str = "api root";
    pub const ADMIN_PAGE: &str = "admin interface";
    pub const STATUS_ANONYMOUS: &str = "status (no credentials)";
    pub const STATUS_BASIC: &str = "status (basic auth)";
    pub const STATUS_BEARER: &str = "status (bearer token)";
    pub const STATUS_TAMPERED: &str = "status (tampered token)";
    pub const REGISTER: &str = "register";
    pub const CREATE_ROOM: &str = "create_room";
    pub const ONLINE_ROOMS: &str = "muc_online_rooms";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const ROOM_OPTIONS: &str = "get_room_options";
    pub const ROOM_OCCUPANTS: &str = "get_room_occupants";
}

const MESSAGE_BODY: &str = "JWT probe message";

/// Runs the probe sequence against one deployment
pub struct ProbeSuite<'a> {
    config: &'a ProbeConfig,
    client: AdminClient,
    token: String,
    user_jid: String,
}

impl<'a> ProbeSuite<'a> {
    pub fn new(
        config: &'a ProbeConfig,
        client: AdminClient,
        token: impl Into<String>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            config,
            client,
            token: token.into(),
            user_jid: config.user_jid()?.into(),
        })
    }

    fn admin_credentials(&self) -> Option<Credentials> {
        self.config
            .admin_password
            .as_ref()
            .map(|password| Credentials::basic(self.config.admin_user(), password.clone()))
    }

    fn bearer(&self) -> Credentials {
        Credentials::bearer(self.token.clone())
    }

    /// Run every probe.
    pub async fn run(&self) -> ProbeReport {
        self.run_with(|_| {}).await
    }

    /// Run every probe, handing each outcome to `observe` as soon as it is known.
    pub async fn run_with<F>(&self, mut observe: F) -> ProbeReport
    where
        F: FnMut(&ProbeOutcome),
    {
        let mut report = ProbeReport::new();
        let mut record = |outcome: ProbeOutcome| {
            tracing::info!("Probe {} -> {}", outcome.name, outcome.verdict());
            observe(&outcome);
            report.push(outcome);
        };

        record(self.api_root().await);
        record(self.admin_page().await);
        record(self.status_anonymous().await);
        record(self.status_basic().await);
        record(self.status_bearer().await);
        record(self.status_tampered().await);

        let registration = self.register_user().await;
        let registered = registration.passed();
        record(registration);

        record(self.create_room().await);
        record(self.online_rooms().await);

        if registered {
            record(self.send_room_message().await);
        } else {
            record(ProbeOutcome::skipped(
                names::SEND_MESSAGE,
                Expectation::Success,
                "test user is not registered",
            ));
        }

        record(self.room_options().await);

        if registered {
            record(self.room_occupants().await);
        } else {
            record(ProbeOutcome::skipped(
                names::ROOM_OCCUPANTS,
                Expectation::Success,
                "test user is not registered",
            ));
        }

        report
    }

    pub async fn api_root(&self) -> ProbeOutcome {
        let result = self.client.get("/api/", &Credentials::None).await;
        ProbeOutcome::completed(names::API_ROOT, Expectation::Reachable, result)
    }

    pub async fn admin_page(&self) -> ProbeOutcome {
        let result = self.client.get("/admin/", &Credentials::None).await;
        let note = match &result {
            Ok(_) => Some("accessible without authentication"),
            Err(ProbeFailure::Status { status, body })
                if *status == 401 || body.contains("Unauthorized") =>
            {
                Some("requires authentication")
            }
            Err(_) => None,
        };
        let outcome = ProbeOutcome::completed(names::ADMIN_PAGE, Expectation::Reachable, result);
        match note {
            Some(note) => outcome.with_note(note),
            None => outcome,
        }
    }

    pub async fn status_anonymous(&self) -> ProbeOutcome {
        let result = self.client.command(&Status {}, &Credentials::None).await;
        ProbeOutcome::completed(names::STATUS_ANONYMOUS, Expectation::Rejected, result)
    }

    pub async fn status_basic(&self) -> ProbeOutcome {
        let Some(credentials) = self.admin_credentials() else {
            return ProbeOutcome::skipped(
                names::STATUS_BASIC,
                Expectation::Success,
                "EJABBERD_ADMIN_PASSWORD not set",
            );
        };
        let result = self.client.command(&Status {}, &credentials).await;
        ProbeOutcome::completed(names::STATUS_BASIC, Expectation::Success, result)
    }

    pub async fn status_bearer(&self) -> ProbeOutcome {
        let result = self.client.command(&Status {}, &self.bearer()).await;
        ProbeOutcome::completed(names::STATUS_BEARER, Expectation::Success, result)
    }

    pub async fn status_tampered(&self) -> ProbeOutcome {
        let credentials = Credentials::bearer(tamper_signature(&self.token));
        let result = self.client.command(&Status {}, &credentials).await;
        ProbeOutcome::completed(names::STATUS_TAMPERED, Expectation::Rejected, result)
    }

    pub async fn register_user(&self) -> ProbeOutcome {
        let Some(credentials) = self.admin_credentials() else {
            return ProbeOutcome::skipped(
                names::REGISTER,
                Expectation::Idempotent,
                "EJABBERD_ADMIN_PASSWORD not set",
            );
        };
        let Some(password) = self.config.user_password.clone() else {
            return ProbeOutcome::skipped(
                names::REGISTER,
                Expectation::Idempotent,
                "EJABBERD_USER_PASSWORD not set",
            );
        };

        let command = Register {
            user: self.config.user.clone(),
            host: self.config.domain.clone(),
            password,
        };
        let result = self.client.command(&command, &credentials).await;
        ProbeOutcome::completed(names::REGISTER, Expectation::Idempotent, result)
            .with_note(self.user_jid.clone())
    }

    pub async fn create_room(&self) -> ProbeOutcome {
        let Some(credentials) = self.admin_credentials() else {
            return ProbeOutcome::skipped(
                names::CREATE_ROOM,
                Expectation::Idempotent,
                "EJABBERD_ADMIN_PASSWORD not set",
            );
        };
        let command = CreateRoom {
            name: self.config.room.clone(),
            service: self.config.muc_service(),
            host: self.config.domain.clone(),
        };
        let result = self.client.command(&command, &credentials).await;
        ProbeOutcome::completed(names::CREATE_ROOM, Expectation::Idempotent, result)
    }

    pub async fn online_rooms(&self) -> ProbeOutcome {
        let Some(credentials) = self.admin_credentials() else {
            return ProbeOutcome::skipped(
                names::ONLINE_ROOMS,
                Expectation::Success,
                "EJABBERD_ADMIN_PASSWORD not set",
            );
        };
        let command = MucOnlineRooms {
            service: self.config.muc_service(),
        };
        let result = self.client.command(&command, &credentials).await;

        let room_jid = self.config.room_jid();
        let note = result
            .as_ref()
            .ok()
            .and_then(|response| response.json::<Vec<String>>().ok())
            .map(|rooms| {
                if rooms.contains(&room_jid) {
                    format!("{} listed", room_jid)
                } else {
                    format!("{} not listed among {} rooms", room_jid, rooms.len())
                }
            });

        let outcome = ProbeOutcome::completed(names::ONLINE_ROOMS, Expectation::Success, result);
        match note {
            Some(note) => outcome.with_note(note),
            None => outcome,
        }
    }

    pub async fn send_room_message(&self) -> ProbeOutcome {
        let command = SendMessage {
            kind: MessageType::Groupchat,
            from: self.user_jid.clone(),
            to: self.config.room_jid(),
            subject: String::new(),
            body: MESSAGE_BODY.to_string(),
        };
        let result = self.client.command(&command, &self.bearer()).await;
        ProbeOutcome::completed(names::SEND_MESSAGE, Expectation::Success, result)
    }

    pub async fn room_options(&self) -> ProbeOutcome {
        let Some(credentials) = self.admin_credentials() else {
            return ProbeOutcome::skipped(
                names::ROOM_OPTIONS,
                Expectation::Success,
                "EJABBERD_ADMIN_PASSWORD not set",
            );
        };
        let command = GetRoomOptions {
            name: self.config.room.clone(),
            service: self.config.muc_service(),
        };
        let result = self.client.command(&command, &credentials).await;
        ProbeOutcome::completed(names::ROOM_OPTIONS, Expectation::Success, result)
    }

    pub async fn room_occupants(&self) -> ProbeOutcome {
        let command = GetRoomOccupants {
            name: self.config.room.clone(),
            service: self.config.muc_service(),
        };
        let result = self.client.command(&command, &self.bearer()).await;

        let note = result
            .as_ref()
            .ok()
            .and_then(|response| response.json::<Vec<serde_json::Value>>().ok())
            .map(|occupants| format!("{} occupant(s)", occupants.len()));

        let outcome = ProbeOutcome::completed(names::ROOM_OCCUPANTS, Expectation::Success, result);
        match note {
            Some(note) => outcome.with_note(note),
            None => outcome,
        }
    }
}

/// Corrupt the first character of the signature segment.
pub fn tamper_signature(token: &str) -> String {
    match token.rfind('.') {
        Some(dot) if dot + 1 < token.len() => {
            let (head, signature) = token.split_at(dot + 1);
            let mut chars = signature.chars();
            let first = chars.next().unwrap_or('A');
            let replacement = if first == 'A' { 'B' } else { 'A' };
            format!("{}{}{}", head, replacement, chars.as_str())
        }
        _ => format!("{}.AAAA", token),
    }
}
