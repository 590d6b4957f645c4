use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Named slot where raw content is spliced into the converted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludePoint {
    InHeader,
    BeforeBody,
    AfterBody,
}

impl IncludePoint {
    pub const ALL: [IncludePoint; 3] = [
        IncludePoint::InHeader,
        IncludePoint::BeforeBody,
        IncludePoint::AfterBody,
    ];

    pub fn key(self) -> &'static str {
        match self {
            IncludePoint::InHeader => "include-in-header",
            IncludePoint::BeforeBody => "include-before-body",
            IncludePoint::AfterBody => "include-after-body",
        }
    }
}

/// Include entries per injection point.
///
/// Before freezing each entry is a file path; inside a frozen record each
/// entry is the verbatim file content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Includes {
    #[serde(
        rename = "include-in-header",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub in_header: Option<Vec<String>>,
    #[serde(
        rename = "include-before-body",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub before_body: Option<Vec<String>>,
    #[serde(
        rename = "include-after-body",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub after_body: Option<Vec<String>>,
}

impl Includes {
    pub fn get(&self, point: IncludePoint) -> Option<&Vec<String>> {
        match point {
            IncludePoint::InHeader => self.in_header.as_ref(),
            IncludePoint::BeforeBody => self.before_body.as_ref(),
            IncludePoint::AfterBody => self.after_body.as_ref(),
        }
    }

    pub fn get_mut(&mut self, point: IncludePoint) -> Option<&mut Vec<String>> {
        match point {
            IncludePoint::InHeader => self.in_header.as_mut(),
            IncludePoint::BeforeBody => self.before_body.as_mut(),
            IncludePoint::AfterBody => self.after_body.as_mut(),
        }
    }
}

/// Output of a computation engine run over one input.
///
/// Fields this crate does not interpret are carried in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    #[serde(default)]
    pub supporting: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Persisted unit: the input hash at freeze time plus a portable result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenRecord {
    pub hash: String,
    pub result: ComputationResult,
}
