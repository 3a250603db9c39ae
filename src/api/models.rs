use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
}

impl<T> SearchResponse<T> {
    pub fn ok(data: Vec<T>) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}
