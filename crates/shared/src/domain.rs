use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PodId);
id_newtype!(DomainId);
id_newtype!(ZoneId);
id_newtype!(PoolId);
id_newtype!(MachineId);

pub const CAPABILITY_COMPOSABLE: &str = "composable";
pub const CAPABILITY_ISCSI_STORAGE: &str = "iscsi_storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub id: PodId,
    pub name: String,
    #[serde(rename = "type")]
    pub pod_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub default_pool: PoolId,
    #[serde(default)]
    pub architectures: Vec<String>,
}

impl Pod {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub id: PoolId,
    pub name: String,
}

/// A power driver known to the connected rack controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerType {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMachine {
    pub system_id: String,
    pub machine_id: MachineId,
    pub pod_id: PodId,
    pub hostname: String,
}
