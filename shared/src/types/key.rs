//! Composite identity of a compute-unit execution record

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of one compute-unit execution record.
///
/// Field order is the ordering used for deterministic iteration. `cu_name`
/// may be unknown when the runtime first reports the execution; it is filled
/// in at most once, when a compute-unit name report arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputeUnitKey {
    pub device_name: String,
    pub kernel_name: String,
    pub global_size: String,
    pub local_size: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub cu_name: Option<String>,
    pub object_id: u64,
}

impl ComputeUnitKey {
    /// Create a key whose compute unit is not known yet
    pub fn provisional(
        device_name: impl Into<String>,
        kernel_name: impl Into<String>,
        global_size: impl Into<String>,
        local_size: impl Into<String>,
        object_id: u64,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            kernel_name: kernel_name.into(),
            global_size: global_size.into(),
            local_size: local_size.into(),
            cu_name: None,
            object_id,
        }
    }

    /// Builder-style setter for the compute unit name. A blank name leaves
    /// the key provisional.
    pub fn with_cu(mut self, cu_name: impl Into<String>) -> Self {
        let cu_name = cu_name.into();
        self.cu_name = if cu_name.is_empty() { None } else { Some(cu_name) };
        self
    }

    /// True while the compute unit name is still unknown
    pub fn is_provisional(&self) -> bool {
        self.cu_name().is_none()
    }

    pub fn cu_name(&self) -> Option<&str> {
        self.cu_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Row label for summaries: `device|kernel|global|local|cu`.
    ///
    /// The object id only disambiguates records and is not part of the label.
    pub fn summary_name(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.device_name,
            self.kernel_name,
            self.global_size,
            self.local_size,
            self.cu_name().unwrap_or("")
        )
    }
}

/// Producers send `""` for an unknown compute unit
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let name: Option<String> = Option::deserialize(deserializer)?;
    Ok(name.filter(|name| !name.is_empty()))
}
