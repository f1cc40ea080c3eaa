#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::IntoStaticStr,
    strum::FromRepr,
    strum::EnumCount,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    BadRequest,
    InternalServerError,
    // Operation preparation
    OperationParsingError,
    // Field execution
    FieldError,
    InvalidNull,
    InvalidArgument,
    Unauthorized,
    ListResultFailed,
    UnresolvedType,
}

impl ErrorCode {
    /// Whether the error was raised before any field was executed, in which case the response
    /// carries no data at all.
    pub fn is_request_error(self) -> bool {
        matches!(self, ErrorCode::BadRequest | ErrorCode::OperationParsingError)
    }
}
