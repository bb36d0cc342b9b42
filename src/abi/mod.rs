// Contract ABI metadata consumed by an external event decoder
//
// Only the JSON layout of event ABIs is modelled here; decoding log data is
// left to the decoder.

pub mod odos;

use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};

/// One parameter of an event, possibly a tuple with components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "internalType", default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Canonical type as used in signatures: tuples are expanded
    ///
    /// `tuple[]` with components (address, uint256) becomes `(address,uint256)[]`.
    pub fn canonical_type(&self) -> String {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> = self.components.iter().map(|c| c.canonical_type()).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAbi {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub anonymous: bool,
    pub inputs: Vec<AbiParam>,
}

impl EventAbi {
    pub fn parse(json: &str) -> Result<Self> {
        let abi: EventAbi = serde_json::from_str(json)
            .map_err(|e| ImportError::Deserialization(format!("Invalid event ABI: {}", e)))?;

        if abi.kind != "event" {
            return Err(ImportError::Deserialization(format!(
                "ABI entry {} is a {}, not an event",
                abi.name, abi.kind
            )));
        }

        Ok(abi)
    }

    /// Event signature, e.g. `Transfer(address,address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.canonical_type()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn input(&self, name: &str) -> Option<&AbiParam> {
        self.inputs.iter().find(|p| p.name == name)
    }
}
