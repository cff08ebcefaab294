use serde::{Deserialize, Serialize};

/// Named capability a caller may hold, directly or through a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "cms.pages.manage")]
    CmsPagesManage,
    #[serde(rename = "rbac.manage")]
    RbacManage,
    #[serde(rename = "orders.manage")]
    OrdersManage,
    #[serde(rename = "coupons.manage")]
    CouponsManage,
    #[serde(rename = "commissions.manage")]
    CommissionsManage,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::CmsPagesManage,
        Capability::RbacManage,
        Capability::OrdersManage,
        Capability::CouponsManage,
        Capability::CommissionsManage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::CmsPagesManage => "cms.pages.manage",
            Capability::RbacManage => "rbac.manage",
            Capability::OrdersManage => "orders.manage",
            Capability::CouponsManage => "coupons.manage",
            Capability::CommissionsManage => "commissions.manage",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cms.pages.manage" => Ok(Capability::CmsPagesManage),
            "rbac.manage" => Ok(Capability::RbacManage),
            "orders.manage" => Ok(Capability::OrdersManage),
            "coupons.manage" => Ok(Capability::CouponsManage),
            "commissions.manage" => Ok(Capability::CommissionsManage),
            _ => Err(()),
        }
    }
}
