//! One place where inconsistent backend response shapes become one type.
//!
//! List endpoints answer with a bare array, a Spring-style page
//! (`{"content": [...]}`) or a wrapper (`{"data": [...]}`). Auth endpoints put
//! the token and principal at the top level or under `data`, and call the
//! principal `user` or `admin`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MwanamamaError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Page { content: Vec<T> },
    Wrapped { data: Vec<T> },
}

/// Normalize a list response body into `Vec<T>`.
pub fn normalize_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, MwanamamaError> {
    match serde_json::from_str::<ListEnvelope<T>>(body) {
        Ok(ListEnvelope::Bare(items))
        | Ok(ListEnvelope::Page { content: items })
        | Ok(ListEnvelope::Wrapped { data: items }) => Ok(items),
        Err(_) => {
            // Re-parse to report a useful error instead of serde's untagged
            // "did not match any variant".
            let value: Value = serde_json::from_str(body)?;
            let inner = value
                .get("content")
                .or_else(|| value.get("data"))
                .cloned()
                .unwrap_or(value);
            Ok(serde_json::from_value(inner)?)
        }
    }
}

/// Normalize a single-object response that may be wrapped in `{"data": {...}}`,
/// with or without sibling keys such as `success` or `message`.
pub fn normalize_one<T: DeserializeOwned>(body: &str) -> Result<T, MwanamamaError> {
    let mut value: Value = serde_json::from_str(body)?;
    if let Some(data) = value.get_mut("data").filter(|d| d.is_object()) {
        let data = data.take();
        return Ok(serde_json::from_value(data)?);
    }
    Ok(serde_json::from_value(value)?)
}

/// Which side of the storefront a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Customer,
    Admin,
}

/// Canonical result of any login/verify/register call.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub principal: Value,
    pub role: SessionRole,
}

/// Normalize an auth response body into an [`AuthSession`].
pub fn normalize_auth(body: &str) -> Result<AuthSession, MwanamamaError> {
    let value: Value = serde_json::from_str(body)?;
    normalize_auth_value(&value)
}

pub fn normalize_auth_value(value: &Value) -> Result<AuthSession, MwanamamaError> {
    let root = match value.get("data") {
        Some(data) if data.is_object() => data,
        _ => value,
    };

    let token = ["token", "accessToken", "jwt"]
        .iter()
        .find_map(|k| root.get(*k).and_then(Value::as_str))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MwanamamaError::Api {
            status: 200,
            message: "authentication response did not contain a token".into(),
        })?;

    let (principal, role) = if let Some(admin) = root.get("admin") {
        (admin.clone(), SessionRole::Admin)
    } else if let Some(user) = root.get("user") {
        let is_admin = user
            .get("role")
            .and_then(Value::as_str)
            .is_some_and(|r| r.eq_ignore_ascii_case("admin"));
        let role = if is_admin {
            SessionRole::Admin
        } else {
            SessionRole::Customer
        };
        (user.clone(), role)
    } else {
        (Value::Null, SessionRole::Customer)
    };

    Ok(AuthSession {
        token: token.to_string(),
        principal,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_list_accepts_all_three_shapes() {
        let expected = vec![Item { id: 1 }, Item { id: 2 }];
        assert_eq!(normalize_list::<Item>(r#"[{"id":1},{"id":2}]"#).unwrap(), expected);
        assert_eq!(
            normalize_list::<Item>(r#"{"content":[{"id":1},{"id":2}],"totalPages":1}"#).unwrap(),
            expected
        );
        assert_eq!(
            normalize_list::<Item>(r#"{"data":[{"id":1},{"id":2}],"status":"ok"}"#).unwrap(),
            expected
        );
    }

    #[test]
    fn test_list_reports_inner_error() {
        let err = normalize_list::<Item>(r#"{"data":[{"id":"x"}]}"#).unwrap_err();
        assert!(matches!(err, MwanamamaError::Serialize(_)));
    }

    #[test]
    fn test_one_unwraps_data() {
        assert_eq!(normalize_one::<Item>(r#"{"data":{"id":3}}"#).unwrap(), Item { id: 3 });
        assert_eq!(normalize_one::<Item>(r#"{"id":4}"#).unwrap(), Item { id: 4 });
    }

    #[test]
    fn test_one_unwraps_data_beside_status_keys() {
        assert_eq!(
            normalize_one::<Item>(r#"{"success":true,"message":"Order placed","data":{"id":77}}"#).unwrap(),
            Item { id: 77 }
        );
    }

    #[test]
    fn test_one_leaves_non_object_data_alone() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Blob {
            id: u32,
            data: String,
        }
        assert_eq!(
            normalize_one::<Blob>(r#"{"id":5,"data":"raw"}"#).unwrap(),
            Blob {
                id: 5,
                data: "raw".into()
            }
        );
    }

    #[test]
    fn test_auth_shapes() {
        let s = normalize_auth(r#"{"token":"t1","user":{"id":1,"name":"Amina"}}"#).unwrap();
        assert_eq!(s.token, "t1");
        assert_eq!(s.role, SessionRole::Customer);
        assert_eq!(s.principal["name"], "Amina");

        let s = normalize_auth(r#"{"data":{"token":"t2","admin":{"id":9}}}"#).unwrap();
        assert_eq!(s.token, "t2");
        assert_eq!(s.role, SessionRole::Admin);

        let s = normalize_auth(r#"{"accessToken":"t3","user":{"role":"ADMIN"}}"#).unwrap();
        assert_eq!(s.role, SessionRole::Admin);
    }

    #[test]
    fn test_auth_without_token_is_error() {
        assert!(normalize_auth(r#"{"user":{"id":1}}"#).is_err());
        assert!(normalize_auth(r#"{"token":""}"#).is_err());
    }
}
