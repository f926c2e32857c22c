use serde::Serialize;

/// Envelope for every JSON body the API returns:
///
/// ```json
/// { "success": true, "data": { "id": 7, "capacity": 12 }, "message": "Session scheduled" }
/// ```
///
/// Failures set `success` to `false`; `data` is `{}` unless the error carries
/// structured detail such as seat or usage counts.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response whose `data` is `T::default()`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }

    /// Error response carrying a payload, e.g. the counts behind a conflict.
    pub fn error_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
        }
    }
}
