//! CDP wire-format types
//!
//! JSON-RPC shapes exchanged over the DevTools WebSocket, plus typed
//! parameter structs for the commands the engine issues.

use serde::{Deserialize, Serialize};

/// Outgoing CDP command
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    /// Method name (e.g. "Page.navigate")
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Incoming command response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    pub id: u64,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// Incoming event
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

/// Error payload of a failed command
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page.navigate parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Runtime.evaluate parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

/// Input.dispatchMouseEvent parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEventParams {
    /// "mouseMoved", "mousePressed" or "mouseReleased"
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
}

/// Input.dispatchKeyEvent parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    /// "keyDown", "keyUp" or "char"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Result wrapper of Runtime.evaluate
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    #[serde(default)]
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = CdpRequest {
            id: 7,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({ "url": "https://example.com" })),
            session_id: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_request_omits_empty_params() {
        let request = CdpRequest {
            id: 1,
            method: "Page.enable".to_string(),
            params: None,
            session_id: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_mouse_event_params_use_cdp_field_names() {
        let params = MouseEventParams {
            kind: "mousePressed".to_string(),
            x: 10.0,
            y: 20.0,
            button: Some("left".to_string()),
            click_count: Some(1),
        };

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["type"], "mousePressed");
        assert_eq!(json["clickCount"], 1);
    }

    #[test]
    fn test_notification_deserialization() {
        let text = r#"{"method":"Page.frameNavigated","params":{"frame":{"url":"https://a.example"}}}"#;
        let event: CdpNotification = serde_json::from_str(text).unwrap();
        assert_eq!(event.method, "Page.frameNavigated");
        assert!(event.session_id.is_none());
    }
}
