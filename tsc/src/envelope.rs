//! JSON envelope shared by every stage's output:
//! `{"ok":true,"data":...}` or `{"ok":false,"phase":...,"code":...,"msg":...}`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CompileError, ErrorCode, Phase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    // Err идёт первым: у успешного ответа нет phase/code/msg
    Err(ApiErr),
    Ok(ApiOk<T>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiOk<T> {
    pub ok: OkFlag<true>,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErr {
    pub ok: OkFlag<false>,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
    pub code: ErrorCode,
    pub msg: String,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok(ApiOk { ok: OkFlag, data })
    }

    pub fn from_result(result: Result<T, CompileError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::Err(ApiErr::from(&err)),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// The `ok` field, pinned to one value per variant so that `{"ok":false,"data":..}`
/// decodes as neither a success nor an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OkFlag<const OK: bool>;

impl<const OK: bool> Serialize for OkFlag<OK> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(OK)
    }
}

impl<'de, const OK: bool> Deserialize<'de> for OkFlag<OK> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? == OK {
            Ok(OkFlag)
        } else {
            Err(serde::de::Error::custom(format!("expected \"ok\": {}", OK)))
        }
    }
}

impl From<&CompileError> for ApiErr {
    fn from(err: &CompileError) -> Self {
        Self {
            ok: OkFlag,
            phase: err.phase(),
            line: err.line(),
            col: err.col(),
            code: err.code(),
            msg: err.message().to_string(),
        }
    }
}
