use serde::Serialize;

/// What a principal must be for an operation to be allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Anyone,
    Authenticated,
    Elevated,
}

/// Catalog and order operations guarded by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// List/search the catalog.
    ViewCatalog,
    /// Open a single product's detail.
    ViewProduct,
    /// Create, update or delete products.
    ManageCatalog,
    /// List or open the principal's own orders.
    ViewOwnOrders,
    /// List or open every customer's orders.
    ViewAllOrders,
    /// Update or delete order headers.
    ManageOrders,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ViewCatalog,
        Operation::ViewProduct,
        Operation::ManageCatalog,
        Operation::ViewOwnOrders,
        Operation::ViewAllOrders,
        Operation::ManageOrders,
    ];

    pub fn requirement(self) -> Requirement {
        match self {
            Operation::ViewCatalog => Requirement::Anyone,
            Operation::ViewProduct | Operation::ViewOwnOrders => Requirement::Authenticated,
            Operation::ManageCatalog | Operation::ViewAllOrders | Operation::ManageOrders => {
                Requirement::Elevated
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ViewCatalog => "catalog.view",
            Operation::ViewProduct => "catalog.view_detail",
            Operation::ManageCatalog => "catalog.manage",
            Operation::ViewOwnOrders => "orders.view_own",
            Operation::ViewAllOrders => "orders.view_all",
            Operation::ManageOrders => "orders.manage",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
