use serde::Deserialize;
use uuid::Uuid;

use crate::authz::resource::Method;

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
    pub method: Method,
    pub description: Option<String>,
}

fn default_can_access() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub role_id: Uuid,
    pub resource_id: Uuid,
    #[serde(default = "default_can_access")]
    pub can_access: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_deserializes_from_wire_strings() {
        let req: CreateResourceRequest =
            serde_json::from_str(r#"{"name": "project_list", "method": "GET"}"#).unwrap();
        assert_eq!(req.method, Method::Get);

        let req: CreateResourceRequest =
            serde_json::from_str(r#"{"name": "everything", "method": "*"}"#).unwrap();
        assert_eq!(req.method, Method::Any);
    }

    #[test]
    fn can_access_defaults_to_true() {
        let json = format!(
            r#"{{"role_id": "{}", "resource_id": "{}"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let req: CreatePermissionRequest = serde_json::from_str(&json).unwrap();
        assert!(req.can_access);
    }
}
