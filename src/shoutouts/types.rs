//! Request and response types for the shout-outs REST API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type ShoutoutId = u64;

// ---------- Users ----------

/// A user as returned by `GET /users`.
///
/// Only `id` matters to the stores; fields we do not model are kept in
/// `extra` so nothing the server sends is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserEntity {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            admin: false,
            extra: serde_json::Map::new(),
        }
    }
}

/// Users keyed by id, rebuilt wholesale from the user list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsersMap(HashMap<UserId, UserEntity>);

impl UsersMap {
    pub fn get(&self, id: UserId) -> Option<&UserEntity> {
        self.0.get(&id)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserEntity)> {
        self.0.iter()
    }

    /// Display name for a user id, if known.
    pub fn name_of(&self, id: UserId) -> Option<&str> {
        self.get(id).map(|u| u.name.as_str())
    }
}

impl FromIterator<UserEntity> for UsersMap {
    fn from_iter<I: IntoIterator<Item = UserEntity>>(iter: I) -> Self {
        Self(iter.into_iter().map(|u| (u.id, u)).collect())
    }
}

// ---------- Shout-outs ----------

/// A posted shout-out (from `GET /shoutouts`).
///
/// The recipient and author are each either a known user id or a free-text
/// write-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shoutout {
    pub id: ShoutoutId,
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    #[serde(default)]
    pub recipient_writein: Option<String>,
    pub message: String,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub created_by_writein: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Shoutout {
    /// Recipient's display name, resolved through `users` when possible.
    pub fn recipient_name<'a>(&'a self, users: &'a UsersMap) -> Option<&'a str> {
        self.recipient_id
            .and_then(|id| users.name_of(id))
            .or(self.recipient_writein.as_deref())
    }

    /// Author's display name; `None` for anonymous shout-outs.
    pub fn author_name<'a>(&'a self, users: &'a UsersMap) -> Option<&'a str> {
        if self.anonymous {
            return None;
        }
        self.created_by
            .and_then(|id| users.name_of(id))
            .or(self.created_by_writein.as_deref())
    }
}

/// Request body for `POST /shoutouts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewShoutout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_writein: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_writein: Option<String>,
    pub anonymous: bool,
}

impl NewShoutout {
    /// Shout-out to a known user.
    pub fn to_user(recipient: UserId, message: impl Into<String>) -> Self {
        Self {
            recipient_id: Some(recipient),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Shout-out to someone without an account.
    pub fn to_writein(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient_writein: Some(recipient.into()),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn from_user(mut self, author: UserId) -> Self {
        self.created_by = Some(author);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_keeps_unknown_fields() {
        let user: UserEntity = serde_json::from_value(json!({
            "id": 7,
            "name": "Grace",
            "admin": true,
            "email": "grace@example.com"
        }))
        .unwrap();

        assert!(user.admin);
        assert_eq!(user.extra.get("email"), Some(&json!("grace@example.com")));
    }

    #[test]
    fn users_map_lookup() {
        let map: UsersMap = vec![UserEntity::new(1, "A"), UserEntity::new(2, "B")]
            .into_iter()
            .collect();

        assert_eq!(map.get(1).map(|u| u.name.as_str()), Some("A"));
        assert!(map.get(3).is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn shoutout_names_resolve_through_users() {
        let users: UsersMap = vec![UserEntity::new(1, "Ada")].into_iter().collect();
        let shoutout: Shoutout = serde_json::from_value(json!({
            "id": 3,
            "recipient_id": 1,
            "message": "thanks!",
            "created_by_writein": "Visitor",
            "anonymous": false,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(shoutout.recipient_name(&users), Some("Ada"));
        assert_eq!(shoutout.author_name(&users), Some("Visitor"));

        let hidden = Shoutout {
            anonymous: true,
            ..shoutout
        };
        assert_eq!(hidden.author_name(&users), None);
    }

    #[test]
    fn new_shoutout_skips_unset_fields() {
        let body = serde_json::to_value(NewShoutout::to_writein("Sam", "great demo").anonymous())
            .unwrap();
        assert_eq!(
            body,
            json!({"recipient_writein": "Sam", "message": "great demo", "anonymous": true})
        );
    }
}
