use crate::core::face::detector::{BoundingBox, HeadPose};
use crate::core::face::scorer::LightingQuality;
use serde::{Deserialize, Serialize};

/// 设备信息，由宿主应用提供
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_model: String,
    #[serde(rename = "androidVersion")]
    pub os_version: String,
    pub camera_resolution: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_model: "unknown".to_string(),
            os_version: "unknown".to_string(),
            camera_resolution: "320x240".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetric {
    pub frame_index: u32,
    pub timestamp_ms: u64,
    pub face_confidence: f32,
    pub face_bounds: BoundingBox,
    pub head_pose: HeadPose,
    pub eyes_open: bool,
    pub is_blurry: bool,
    pub compression_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub session_id: String,
    pub user_id: String,
    pub timestamp: i64,
    pub capture_completed_at: i64,
    pub total_capture_time_ms: i64,
    pub original_frame_count: usize,
    pub selected_frame_count: usize,
    pub frame_selection_criteria: String,
    pub average_face_confidence: f32,
    pub min_face_confidence: f32,
    pub max_face_confidence: f32,
    pub average_face_size: f32,
    pub lighting_quality: LightingQuality,
    #[serde(flatten)]
    pub device: DeviceInfo,
    pub orientation_changes: u32,
    pub frame_metrics: Vec<FrameMetric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerificationRequest {
    pub session_id: String,
    pub metadata: CaptureMetadata,
    /// base64 JPEG
    pub frames_base64: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerificationResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub verification_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_names() {
        let metadata = CaptureMetadata {
            session_id: "s-1".to_string(),
            user_id: "u-1".to_string(),
            timestamp: 1_000,
            capture_completed_at: 1_500,
            total_capture_time_ms: 500,
            original_frame_count: 3,
            selected_frame_count: 1,
            frame_selection_criteria: "confidence_and_quality_based".to_string(),
            average_face_confidence: 0.8,
            min_face_confidence: 0.7,
            max_face_confidence: 0.9,
            average_face_size: 0.02,
            lighting_quality: LightingQuality::Good,
            device: DeviceInfo::default(),
            orientation_changes: 0,
            frame_metrics: vec![],
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["totalCaptureTimeMs"], 500);
        assert_eq!(json["lightingQuality"], "good");
        assert_eq!(json["androidVersion"], "unknown");
        assert_eq!(json["cameraResolution"], "320x240");
        assert!(json.get("device").is_none());
    }

    #[test]
    fn test_response_without_verification_id() {
        let response: FaceVerificationResponse =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.verification_id, None);
    }
}
