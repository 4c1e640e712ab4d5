use serde::{Deserialize, Serialize};

/// 人脸注册 / 删除接口的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAuthResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

fn default_success() -> bool {
    true
}

/// 人脸模型训练状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceStatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub message: String,
    pub frames_uploaded: usize,
    pub status: Option<String>,
}
