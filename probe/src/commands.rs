//! Request bodies for the mod_http_api commands the probes use.

use serde::Serialize;

/// A mod_http_api command: `POST /api/<NAME>` with `self` as the JSON body.
pub trait ApiCommand: Serialize {
    const NAME: &'static str;
}

/// `status`: node status, no arguments
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoom {
    pub name: String,
    pub service: String,
    pub host: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MucOnlineRooms {
    /// MUC service, or `global` for every service
    pub service: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Register {
    pub user: String,
    pub host: String,
    pub password: String,
}

/// XMPP message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Normal,
    Chat,
    Groupchat,
    Headline,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetRoomOptions {
    pub name: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetRoomOccupants {
    pub name: String,
    pub service: String,
}

impl ApiCommand for Status {
    const NAME: &'static str = "status";
}

impl ApiCommand for CreateRoom {
    const NAME: &'static str = "create_room";
}

impl ApiCommand for MucOnlineRooms {
    const NAME: &'static str = "muc_online_rooms";
}

impl ApiCommand for Register {
    const NAME: &'static str = "register";
}

impl ApiCommand for SendMessage {
    const NAME: &'static str = "send_message";
}

impl ApiCommand for GetRoomOptions {
    const NAME: &'static str = "get_room_options";
}

impl ApiCommand for GetRoomOccupants {
    const NAME: &'static str = "get_room_occupants";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_body_is_empty_object() {
        assert_eq!(serde_json::to_value(Status {}).unwrap(), json!({}));
    }

    #[test]
    fn test_send_message_body() {
        let msg = SendMessage {
            kind: MessageType::Groupchat,
            from: "test@ejabberd.local".to_string(),
            to: "testroom@conference.ejabberd.local".to_string(),
            subject: String::new(),
            body: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "groupchat",
                "from": "test@ejabberd.local",
                "to": "testroom@conference.ejabberd.local",
                "subject": "",
                "body": "hello"
            })
        );
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Status::NAME, "status");
        assert_eq!(CreateRoom::NAME, "create_room");
        assert_eq!(MucOnlineRooms::NAME, "muc_online_rooms");
        assert_eq!(Register::NAME, "register");
        assert_eq!(SendMessage::NAME, "send_message");
        assert_eq!(GetRoomOptions::NAME, "get_room_options");
        assert_eq!(GetRoomOccupants::NAME, "get_room_occupants");
    }
}
