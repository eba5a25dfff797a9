//! The persisted session record.

use crate::SessionKeys;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Permission sets granted inside an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPerms {
    #[serde(default)]
    pub admin: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
    #[serde(default)]
    pub dev: Vec<String>,
}

impl UserPerms {
    /// True when no permission set has any entry.
    pub fn is_empty(&self) -> bool {
        self.admin.is_empty() && self.readonly.is_empty() && self.dev.is_empty()
    }
}

/// Tenant context stored under `orgId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgContext {
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "userPerms", default)]
    pub user_perms: UserPerms,
    #[serde(rename = "userType", default)]
    pub user_type: String,
}

/// Flat session record, serialized as one JSON object in the `session` cookie.
///
/// Every field is optional until populated. Keys this type does not know
/// about, and known keys whose stored value has an unexpected JSON type, are
/// carried in `extra` so a typed read-modify-write never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usercid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usermail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coguser: Option<String>,

    #[serde(
        rename = "userType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_type: Option<String>,

    #[serde(
        rename = "isSuperAdmin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_super_admin: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_org: Option<String>,

    #[serde(rename = "orgId", default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgContext>,

    #[serde(
        rename = "appUserLoggedin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub app_user_logged_in: Option<bool>,

    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip)]
    pub extra: Map<String, Value>,
}

/// Move `map[key]` into `slot` when it has the field's type.
///
/// `null` reads as unset. Any other mismatch leaves the raw value in `map`.
fn take_field<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
    slot: &mut Option<T>,
) {
    let Some(value) = map.get(key) else {
        return;
    };
    if value.is_null() {
        map.remove(key);
        return;
    }
    match T::deserialize(value) {
        Ok(parsed) => {
            *slot = Some(parsed);
            map.remove(key);
        }
        Err(e) => debug!(key, error = %e, "Session field has unexpected type, keeping raw value"),
    }
}

impl SessionRecord {
    /// Serialize into the flat JSON object stored in the cookie.
    ///
    /// A populated typed field wins over a raw value kept under the same key.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                warn!(error = %e, "Failed to serialize session record");
                Map::new()
            }
        };
        for (key, value) in &self.extra {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Build a record from the raw cookie object, field by field.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let mut record = Self::default();
        take_field(&mut map, SessionKeys::ACCESS_TOKEN, &mut record.access_token);
        take_field(&mut map, SessionKeys::ID_TOKEN, &mut record.id_token);
        take_field(&mut map, SessionKeys::REFRESH_TOKEN, &mut record.refresh_token);
        take_field(&mut map, SessionKeys::USER_CID, &mut record.usercid);
        take_field(&mut map, SessionKeys::USERNAME, &mut record.username);
        take_field(&mut map, SessionKeys::USER_MAIL, &mut record.usermail);
        take_field(&mut map, SessionKeys::COGNITO_USER, &mut record.coguser);
        take_field(&mut map, SessionKeys::USER_TYPE, &mut record.user_type);
        take_field(&mut map, SessionKeys::IS_SUPER_ADMIN, &mut record.is_super_admin);
        take_field(&mut map, SessionKeys::PRIMARY_ORG, &mut record.primary_org);
        take_field(&mut map, SessionKeys::ORG_ID, &mut record.org);
        take_field(&mut map, SessionKeys::APP_USER_LOGGED_IN, &mut record.app_user_logged_in);
        take_field(&mut map, SessionKeys::IMAGE_URL, &mut record.image_url);
        record.extra = map;
        record
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Both tokens needed for a silent resume are present.
    pub fn can_resume(&self) -> bool {
        self.id_token.is_some() && self.refresh_token.is_some()
    }

    /// Whether the coarse logged-in flag is set.
    pub fn is_logged_in_flag(&self) -> bool {
        self.app_user_logged_in == Some(true)
    }

    /// Organization domain, if an org context is stored.
    pub fn org_domain(&self) -> Option<&str> {
        self.org.as_ref().map(|o| o.domain.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_record_serializes_to_empty_object() {
        assert_eq!(SessionRecord::default().to_map(), Map::new());
        assert!(SessionRecord::default().is_empty());
    }

    #[test]
    fn test_record_parses_cookie_shape() {
        let raw = json!({
            "id_token": "a.b.c",
            "refresh_token": "r",
            "userType": "Superadmin",
            "isSuperAdmin": true,
            "orgId": {
                "domain": "acme.io",
                "userPerms": {"admin": ["bots"], "readonly": [], "dev": []},
                "userType": "Superadmin"
            },
            "appUserLoggedin": true,
            "theme": "dark"
        });
        let Value::Object(map) = raw else {
            unreachable!()
        };

        let record = SessionRecord::from_map(map.clone());
        assert!(record.can_resume());
        assert!(record.is_logged_in_flag());
        assert_eq!(record.is_super_admin, Some(true));
        assert_eq!(record.org_domain(), Some("acme.io"));
        assert_eq!(
            record.org.as_ref().unwrap().user_perms.admin,
            vec!["bots".to_string()]
        );
        assert_eq!(record.extra.get("theme"), Some(&json!("dark")));

        // Unknown keys survive a typed round trip.
        assert_eq!(record.to_map(), map);
    }

    #[test]
    fn test_wrong_field_type_is_kept_raw() {
        let Value::Object(map) = json!({
            "usercid": "abc",
            "refresh_token": "r-1",
            "isSuperAdmin": "yes",
            "orgId": "acme.io"
        }) else {
            unreachable!()
        };

        let record = SessionRecord::from_map(map.clone());
        assert_eq!(record.usercid.as_deref(), Some("abc"));
        assert_eq!(record.refresh_token.as_deref(), Some("r-1"));
        assert_eq!(record.is_super_admin, None);
        assert_eq!(record.org, None);
        assert_eq!(record.extra.get("orgId"), Some(&json!("acme.io")));
        assert!(!record.is_empty());
        assert_eq!(record.to_map(), map);
    }

    #[test]
    fn test_typed_value_replaces_raw_one() {
        let mut map = Map::new();
        map.insert("isSuperAdmin".to_string(), json!("true"));

        let mut record = SessionRecord::from_map(map);
        record.is_super_admin = Some(true);
        assert_eq!(record.to_map().get("isSuperAdmin"), Some(&json!(true)));
    }

    #[test]
    fn test_null_field_reads_as_unset() {
        let mut map = Map::new();
        map.insert("id_token".to_string(), Value::Null);
        assert!(SessionRecord::from_map(map).is_empty());
    }

    #[test]
    fn test_can_resume_needs_both_tokens() {
        let record = SessionRecord {
            id_token: Some("a.b.c".to_string()),
            ..Default::default()
        };
        assert!(!record.can_resume());
    }

    #[test]
    fn test_org_context_defaults_missing_parts() {
        let org: OrgContext = serde_json::from_value(json!({"domain": "acme.io"})).unwrap();
        assert_eq!(org.domain, "acme.io");
        assert!(org.user_perms.is_empty());
        assert_eq!(org.user_type, "");
    }
}
