/// Outcome of a container operation, as returned by the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimpleResult {
    pub result: bool,
    #[serde(rename = "description")]
    pub desc: String,
}

impl SimpleResult {
    pub fn success(desc: impl Into<String>) -> Self {
        Self {
            result: true,
            desc: desc.into(),
        }
    }

    pub fn failure(desc: impl Into<String>) -> Self {
        Self {
            result: false,
            desc: desc.into(),
        }
    }
}
